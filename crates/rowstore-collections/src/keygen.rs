//! Maps whose keys are generated for values rather than supplied by callers.
//!
//! A [`RowKeyMap`] hands out a fresh key per stored value and can walk all
//! keys mapped to one value in key order, which is how duplicate values are
//! enumerated when a table permits them. [`IdMap`] is the table-backed
//! implementation with store-assigned integer keys.

use std::collections::BTreeSet;
use std::sync::Arc;

use rowstore_core::{batched, ColumnValue, RowStore, StoreError, StoreResult, Value};

use crate::map::RowMap;
use crate::table::{MapTable, Nav};

/// Source of keys that are still referenced from elsewhere.
///
/// A key map cannot tell on its own whether a row is in use; whoever holds
/// the references answers for it.
pub trait KeyUsage {
    fn used_keys(&self) -> StoreResult<BTreeSet<i64>>;
}

/// Generated-key contract with per-value key navigation.
///
/// `add_if_absent` checks then inserts in two steps and is only safe with a
/// single writer.
pub trait RowKeyMap<V> {
    type Key: Clone + Ord;

    /// Store `value` under a key not currently present and return the key.
    fn add(&self, value: &V) -> StoreResult<Self::Key>;

    /// Lowest key mapped to `value`.
    fn first_key_for(&self, value: &V) -> StoreResult<Option<Self::Key>>;

    /// Highest key mapped to `value`.
    fn last_key_for(&self, value: &V) -> StoreResult<Option<Self::Key>>;

    fn lower_key_for(&self, key: &Self::Key, value: &V) -> StoreResult<Option<Self::Key>>;

    fn floor_key_for(&self, key: &Self::Key, value: &V) -> StoreResult<Option<Self::Key>>;

    fn ceiling_key_for(&self, key: &Self::Key, value: &V) -> StoreResult<Option<Self::Key>>;

    fn higher_key_for(&self, key: &Self::Key, value: &V) -> StoreResult<Option<Self::Key>>;

    /// Delete the row for `key`, reporting whether one existed.
    fn remove_key(&self, key: &Self::Key) -> StoreResult<bool>;

    /// Existing key for `value`, or a new one.
    fn add_if_absent(&self, value: &V) -> StoreResult<Self::Key> {
        match self.first_key_for(value)? {
            Some(key) => Ok(key),
            None => self.add(value),
        }
    }

    /// Whether `key` is currently mapped to `value`.
    fn key_maps_to(&self, key: &Self::Key, value: &V) -> StoreResult<bool> {
        Ok(self.ceiling_key_for(key, value)?.as_ref() == Some(key))
    }

    /// Number of keys mapped to `value`.
    fn count_for(&self, value: &V) -> StoreResult<usize> {
        let mut count = 0;
        let mut next = self.first_key_for(value)?;
        while let Some(key) = next {
            count += 1;
            next = self.higher_key_for(&key, value)?;
        }
        Ok(count)
    }

    /// Live view of the keys mapped to `value`.
    fn key_set_for(&self, value: V) -> KeySetFor<'_, Self, V>
    where
        Self: Sized,
    {
        KeySetFor { map: self, value }
    }

    /// Collapse rows holding the same value down to the lowest key.
    fn remove_duplicate_rows(&self) -> StoreResult<usize> {
        Err(StoreError::Unsupported { operation: "remove_duplicate_rows" })
    }

    /// Delete rows nothing refers to any more.
    fn remove_unused_rows(&self) -> StoreResult<usize> {
        Err(StoreError::Unsupported { operation: "remove_unused_rows" })
    }
}

// ---------------------------------------------------------------------------
// Per-value key view
// ---------------------------------------------------------------------------

/// Keys mapped to one value, read live from the map on every call.
///
/// Supports removal (which deletes the underlying row) but not insertion:
/// keys are generated, never chosen.
pub struct KeySetFor<'a, M, V> {
    map: &'a M,
    value: V,
}

impl<'a, M, V> KeySetFor<'a, M, V>
where
    M: RowKeyMap<V>,
{
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn contains(&self, key: &M::Key) -> StoreResult<bool> {
        self.map.key_maps_to(key, &self.value)
    }

    pub fn first(&self) -> StoreResult<Option<M::Key>> {
        self.map.first_key_for(&self.value)
    }

    pub fn last(&self) -> StoreResult<Option<M::Key>> {
        self.map.last_key_for(&self.value)
    }

    pub fn lower(&self, key: &M::Key) -> StoreResult<Option<M::Key>> {
        self.map.lower_key_for(key, &self.value)
    }

    pub fn floor(&self, key: &M::Key) -> StoreResult<Option<M::Key>> {
        self.map.floor_key_for(key, &self.value)
    }

    pub fn ceiling(&self, key: &M::Key) -> StoreResult<Option<M::Key>> {
        self.map.ceiling_key_for(key, &self.value)
    }

    pub fn higher(&self, key: &M::Key) -> StoreResult<Option<M::Key>> {
        self.map.higher_key_for(key, &self.value)
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.map.count_for(&self.value)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.first()?.is_none())
    }

    /// Walk the keys in ascending order, one query per step.
    pub fn iter(&self) -> KeySetIter<'_, M, V> {
        KeySetIter { view: self, last: None, done: false }
    }

    pub fn to_vec(&self) -> StoreResult<Vec<M::Key>> {
        self.iter().collect()
    }

    /// Remove `key` from the view, deleting its row if it maps to this value.
    pub fn remove(&self, key: &M::Key) -> StoreResult<bool> {
        if !self.contains(key)? {
            return Ok(false);
        }
        self.map.remove_key(key)
    }

    pub fn insert(&self, _key: M::Key) -> StoreResult<bool> {
        Err(StoreError::Unsupported { operation: "insert into per-value key view" })
    }
}

/// Ascending walk over a [`KeySetFor`].
pub struct KeySetIter<'v, M: RowKeyMap<V>, V> {
    view: &'v KeySetFor<'v, M, V>,
    last: Option<M::Key>,
    done: bool,
}

impl<'v, M, V> Iterator for KeySetIter<'v, M, V>
where
    M: RowKeyMap<V>,
{
    type Item = StoreResult<M::Key>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = match &self.last {
            None => self.view.first(),
            Some(key) => self.view.higher(key),
        };
        match step {
            Ok(Some(key)) => {
                self.last = Some(key.clone());
                Some(Ok(key))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Table-backed implementation
// ---------------------------------------------------------------------------

/// Whether several keys may map to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    Allowed,
    Forbidden,
}

/// Key map with store-assigned `i64` keys.
///
/// The key column must be one the store assigns on insert (an SQLite
/// `INTEGER PRIMARY KEY`).
pub struct IdMap<S, V> {
    map: RowMap<S, i64, V>,
    duplicates: Duplicates,
    usage: Option<Box<dyn KeyUsage + Send + Sync>>,
}

impl<S, V> IdMap<S, V>
where
    S: RowStore,
    V: ColumnValue + Clone + PartialEq,
{
    pub fn new(store: Arc<S>, table: MapTable, duplicates: Duplicates) -> Self {
        Self {
            map: RowMap::new(store, table),
            duplicates,
            usage: None,
        }
    }

    /// Let `remove_unused_rows` consult `usage` for keys still referenced.
    pub fn with_usage<U>(mut self, usage: U) -> Self
    where
        U: KeyUsage + Send + Sync + 'static,
    {
        self.usage = Some(Box::new(usage));
        self
    }

    pub fn duplicates(&self) -> Duplicates {
        self.duplicates
    }

    /// The underlying map: get, contains_key, entries, navigation.
    pub fn as_map(&self) -> &RowMap<S, i64, V> {
        &self.map
    }

    pub fn get(&self, key: i64) -> StoreResult<Option<V>> {
        self.map.get(&key)
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.map.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.map.is_empty()
    }

    fn edge_key(&self, value: &V, last: bool) -> StoreResult<Option<i64>> {
        let (sql, param) = self.map.table().edge_key_for_sql(&value.to_value(), last);
        let params: Vec<Value> = param.into_iter().collect();
        self.map.store().query_scalar(&sql, &params)
    }

    fn nav_key(&self, nav: Nav, key: i64, value: &V) -> StoreResult<Option<i64>> {
        let (sql, param) = self.map.table().nav_key_for_sql(nav, &value.to_value());
        let mut params: Vec<Value> = param.into_iter().collect();
        params.push(Value::Integer(key));
        self.map.store().query_scalar(&sql, &params)
    }
}

impl<S, V> RowKeyMap<V> for IdMap<S, V>
where
    S: RowStore,
    V: ColumnValue + Clone + PartialEq,
{
    type Key = i64;

    fn add(&self, value: &V) -> StoreResult<i64> {
        if self.duplicates == Duplicates::Forbidden && self.first_key_for(value)?.is_some() {
            return Err(StoreError::constraint(
                format!("add to {}", self.map.table().table()),
                "value already present and duplicates are forbidden",
            ));
        }
        self.map
            .store()
            .insert(&self.map.table().sql.insert_value, &[value.to_value()])
    }

    fn first_key_for(&self, value: &V) -> StoreResult<Option<i64>> {
        self.edge_key(value, false)
    }

    fn last_key_for(&self, value: &V) -> StoreResult<Option<i64>> {
        self.edge_key(value, true)
    }

    fn lower_key_for(&self, key: &i64, value: &V) -> StoreResult<Option<i64>> {
        self.nav_key(Nav::Lower, *key, value)
    }

    fn floor_key_for(&self, key: &i64, value: &V) -> StoreResult<Option<i64>> {
        self.nav_key(Nav::Floor, *key, value)
    }

    fn ceiling_key_for(&self, key: &i64, value: &V) -> StoreResult<Option<i64>> {
        self.nav_key(Nav::Ceiling, *key, value)
    }

    fn higher_key_for(&self, key: &i64, value: &V) -> StoreResult<Option<i64>> {
        self.nav_key(Nav::Higher, *key, value)
    }

    fn remove_key(&self, key: &i64) -> StoreResult<bool> {
        self.map.remove_key(key)
    }

    fn count_for(&self, value: &V) -> StoreResult<usize> {
        let (sql, param) = self.map.table().count_for_sql(&value.to_value());
        let params: Vec<Value> = param.into_iter().collect();
        let count: Option<i64> = self.map.store().query_scalar(&sql, &params)?;
        Ok(count.unwrap_or(0) as usize)
    }

    fn remove_duplicate_rows(&self) -> StoreResult<usize> {
        if self.duplicates == Duplicates::Forbidden {
            return Err(StoreError::Unsupported {
                operation: "remove_duplicate_rows on a map that forbids duplicates",
            });
        }
        self.map.store().execute(&self.map.table().sql.dedupe, &[])
    }

    fn remove_unused_rows(&self) -> StoreResult<usize> {
        let usage = match &self.usage {
            Some(usage) => usage,
            None => {
                return Err(StoreError::Unsupported {
                    operation: "remove_unused_rows without a key usage source",
                })
            }
        };
        let used = usage.used_keys()?;
        let keys: Vec<i64> = self.map.keys()?.collect();
        batched(self.map.store(), || {
            let mut removed = 0;
            for key in keys.iter().filter(|key| !used.contains(*key)) {
                if self.map.remove_key(key)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }
}

impl<S, V> std::fmt::Debug for IdMap<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdMap")
            .field("map", &self.map)
            .field("duplicates", &self.duplicates)
            .field("usage", &self.usage.is_some())
            .finish()
    }
}
