//! Table mappings for the collection adapters.
//!
//! Each adapter is generic over its element types and learns where its rows
//! live from one of these mappings: table and column names, validated once,
//! with the parameterized statements rendered up front.

use rowstore_core::{StoreError, StoreResult, Value};

/// Check that `name` can be spliced into SQL as a bare identifier.
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(StoreError::invalid("identifier must not be empty")),
        Some(c) if c.is_ascii_digit() => {
            return Err(StoreError::invalid(format!(
                "identifier {name:?} must not start with a digit"
            )))
        }
        _ => {}
    }
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "identifier {name:?} may only contain ASCII letters, digits and '_'"
        )))
    }
}

/// Equality filter on `column`, using `IS NULL` for null values.
///
/// Returns the predicate text and the parameter it needs, if any.
pub(crate) fn value_filter(column: &str, value: &Value) -> (String, Option<Value>) {
    if value.is_null() {
        (format!("{column} IS NULL"), None)
    } else {
        (format!("{column} = ?"), Some(value.clone()))
    }
}

/// Direction of a bounded key search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    /// Greatest key strictly below
    Lower,
    /// Greatest key at or below
    Floor,
    /// Least key at or above
    Ceiling,
    /// Least key strictly above
    Higher,
}

impl Nav {
    pub(crate) fn comparison(&self) -> &'static str {
        match self {
            Nav::Lower => "<",
            Nav::Floor => "<=",
            Nav::Ceiling => ">=",
            Nav::Higher => ">",
        }
    }

    pub(crate) fn order(&self) -> &'static str {
        match self {
            Nav::Lower | Nav::Floor => "DESC",
            Nav::Ceiling | Nav::Higher => "ASC",
        }
    }
}

// ---------------------------------------------------------------------------
// Partitioned sequence table: (partition, index, value)
// ---------------------------------------------------------------------------

/// Mapping for a partitioned sequence table.
#[derive(Debug, Clone)]
pub struct ListTable {
    table: String,
    partition: String,
    index: String,
    value: String,
    pub(crate) sql: ListSql,
}

#[derive(Debug, Clone)]
pub(crate) struct ListSql {
    pub max_index: String,
    pub get: String,
    pub exists: String,
    pub update: String,
    pub insert: String,
    pub delete_at: String,
    pub delete_range: String,
    pub park_down: String,
    pub park_from: String,
    pub unpark: String,
    pub select_all: String,
    pub clear: String,
    pub distinct_values: String,
}

impl ListTable {
    pub fn new(table: &str, partition: &str, index: &str, value: &str) -> StoreResult<Self> {
        for name in [table, partition, index, value] {
            validate_identifier(name)?;
        }
        let (t, p, i, v) = (table, partition, index, value);
        let sql = ListSql {
            max_index: format!("SELECT MAX({i}) FROM {t} WHERE {p} = ?"),
            get: format!("SELECT {v} FROM {t} WHERE {p} = ? AND {i} = ?"),
            exists: format!("SELECT 1 FROM {t} WHERE {p} = ? AND {i} = ? LIMIT 1"),
            update: format!("UPDATE {t} SET {v} = ? WHERE {p} = ? AND {i} = ?"),
            insert: format!("INSERT INTO {t} ({p}, {i}, {v}) VALUES (?, ?, ?)"),
            delete_at: format!("DELETE FROM {t} WHERE {p} = ? AND {i} = ?"),
            delete_range: format!("DELETE FROM {t} WHERE {p} = ? AND {i} >= ? AND {i} < ?"),
            // Shifts go through negative indices so no two rows ever share an
            // index, even mid-statement: idx -> -(idx +/- by) - 1 -> idx +/- by
            park_from: format!("UPDATE {t} SET {i} = -({i} + ?) - 1 WHERE {p} = ? AND {i} >= ?"),
            park_down: format!("UPDATE {t} SET {i} = -({i} - ?) - 1 WHERE {p} = ? AND {i} >= ?"),
            unpark: format!("UPDATE {t} SET {i} = -{i} - 1 WHERE {p} = ? AND {i} < 0"),
            select_all: format!("SELECT {v} FROM {t} WHERE {p} = ? ORDER BY {i} ASC"),
            clear: format!("DELETE FROM {t} WHERE {p} = ?"),
            distinct_values: format!("SELECT DISTINCT {v} FROM {t} WHERE {v} IS NOT NULL"),
        };
        Ok(Self {
            table: t.to_string(),
            partition: p.to_string(),
            index: i.to_string(),
            value: v.to_string(),
            sql,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn partition_column(&self) -> &str {
        &self.partition
    }

    pub fn index_column(&self) -> &str {
        &self.index
    }

    pub fn value_column(&self) -> &str {
        &self.value
    }

    /// First (or last) index holding `value` in one partition.
    pub(crate) fn index_of_sql(&self, value: &Value, from_end: bool) -> (String, Option<Value>) {
        let (filter, param) = value_filter(&self.value, value);
        let order = if from_end { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {i} FROM {t} WHERE {p} = ? AND {filter} ORDER BY {i} {order} LIMIT 1",
            i = self.index,
            t = self.table,
            p = self.partition,
        );
        (sql, param)
    }
}

// ---------------------------------------------------------------------------
// Key-value table: (key, value)
// ---------------------------------------------------------------------------

/// Mapping for a key-value table.
#[derive(Debug, Clone)]
pub struct MapTable {
    table: String,
    key: String,
    value: String,
    pub(crate) sql: MapSql,
}

#[derive(Debug, Clone)]
pub(crate) struct MapSql {
    pub get: String,
    pub contains: String,
    pub update: String,
    pub insert: String,
    pub insert_value: String,
    pub delete: String,
    pub count: String,
    pub select_all: String,
    pub select_keys: String,
    pub clear: String,
    pub first_key: String,
    pub last_key: String,
    pub dedupe: String,
}

impl MapTable {
    pub fn new(table: &str, key: &str, value: &str) -> StoreResult<Self> {
        for name in [table, key, value] {
            validate_identifier(name)?;
        }
        let (t, k, v) = (table, key, value);
        let sql = MapSql {
            get: format!("SELECT {v} FROM {t} WHERE {k} = ?"),
            contains: format!("SELECT 1 FROM {t} WHERE {k} = ? LIMIT 1"),
            update: format!("UPDATE {t} SET {v} = ? WHERE {k} = ?"),
            insert: format!("INSERT INTO {t} ({k}, {v}) VALUES (?, ?)"),
            insert_value: format!("INSERT INTO {t} ({v}) VALUES (?)"),
            delete: format!("DELETE FROM {t} WHERE {k} = ?"),
            count: format!("SELECT COUNT(*) FROM {t}"),
            select_all: format!("SELECT {k}, {v} FROM {t} ORDER BY {k} ASC"),
            select_keys: format!("SELECT {k} FROM {t} ORDER BY {k} ASC"),
            clear: format!("DELETE FROM {t}"),
            first_key: format!("SELECT {k} FROM {t} ORDER BY {k} ASC LIMIT 1"),
            last_key: format!("SELECT {k} FROM {t} ORDER BY {k} DESC LIMIT 1"),
            // NULL values group together, matching the IS NULL filter used
            // by the per-value navigation.
            dedupe: format!(
                "DELETE FROM {t} WHERE {k} NOT IN (SELECT MIN({k}) FROM {t} GROUP BY {v})"
            ),
        };
        Ok(Self {
            table: t.to_string(),
            key: k.to_string(),
            value: v.to_string(),
            sql,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key
    }

    pub fn value_column(&self) -> &str {
        &self.value
    }

    /// Bounded key search over the whole table.
    pub(crate) fn nav_sql(&self, nav: Nav) -> String {
        format!(
            "SELECT {k} FROM {t} WHERE {k} {cmp} ? ORDER BY {k} {order} LIMIT 1",
            k = self.key,
            t = self.table,
            cmp = nav.comparison(),
            order = nav.order(),
        )
    }

    /// Lowest (or highest) key mapped to `value`.
    pub(crate) fn edge_key_for_sql(&self, value: &Value, last: bool) -> (String, Option<Value>) {
        let (filter, param) = value_filter(&self.value, value);
        let order = if last { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {k} FROM {t} WHERE {filter} ORDER BY {k} {order} LIMIT 1",
            k = self.key,
            t = self.table,
        );
        (sql, param)
    }

    /// Bounded key search restricted to keys mapped to `value`.
    ///
    /// Parameters bind as: value (when not null), then the bounding key.
    pub(crate) fn nav_key_for_sql(&self, nav: Nav, value: &Value) -> (String, Option<Value>) {
        let (filter, param) = value_filter(&self.value, value);
        let sql = format!(
            "SELECT {k} FROM {t} WHERE {filter} AND {k} {cmp} ? ORDER BY {k} {order} LIMIT 1",
            k = self.key,
            t = self.table,
            cmp = nav.comparison(),
            order = nav.order(),
        );
        (sql, param)
    }

    /// Number of keys mapped to `value`.
    pub(crate) fn count_for_sql(&self, value: &Value) -> (String, Option<Value>) {
        let (filter, param) = value_filter(&self.value, value);
        (format!("SELECT COUNT(*) FROM {} WHERE {filter}", self.table), param)
    }
}
