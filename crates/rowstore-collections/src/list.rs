//! Ordered partition list: a resizable sequence stored as rows.
//!
//! Each element is a row `(partition, index, value)`. For one partition the
//! index column always holds exactly `0..len` with no gaps and no repeats.
//! Nothing in the schema enforces that; every mutation here preserves it:
//!
//! - **insert**: shift rows at or above the slot up, then write the slot
//! - **remove**: delete the slot, then shift the rows above it down by one
//! - **len**: `MAX(index) + 1`, which is only correct because of the invariant
//!
//! Both shifts run as two bulk statements through negative indices, so no
//! two rows share an index at any point, even mid-statement. SQLite checks
//! a `UNIQUE (partition, index)` constraint row by row, in no particular
//! order, so a single `index = index - 1` pass can trip it.
//!
//! Multi-statement mutations run inside a [`Batch`](rowstore_core::Batch).

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use rowstore_core::{batched, ColumnValue, RowStore, StoreError, StoreResult, Value};

use crate::keygen::KeyUsage;
use crate::table::ListTable;

type Check<V> = Box<dyn Fn(&V) -> StoreResult<()> + Send + Sync>;

/// Sequence of `V` stored under one partition key of a [`ListTable`].
pub struct RowList<S, V> {
    store: Arc<S>,
    table: ListTable,
    partition: Value,
    /// Reject values already present in the partition
    distinct: bool,
    checks: Vec<Check<V>>,
    _types: PhantomData<fn() -> V>,
}

impl<S, V> RowList<S, V>
where
    S: RowStore,
    V: ColumnValue + Clone + PartialEq,
{
    /// Bind a list to one partition of `table`.
    ///
    /// A null partition key is rejected: no `partition = ?` filter can match
    /// it, so its rows would be written but never found again.
    pub fn new<P: ColumnValue>(
        store: Arc<S>,
        table: ListTable,
        partition: P,
    ) -> StoreResult<Self> {
        let partition = partition.to_value();
        if partition.is_null() {
            return Err(StoreError::invalid(format!(
                "partition key of {} must not be null",
                table.table()
            )));
        }
        Ok(Self {
            store,
            table,
            partition,
            distinct: false,
            checks: Vec::new(),
            _types: PhantomData,
        })
    }

    /// Add a validation run on every value before it is written.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&V) -> StoreResult<()> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    /// Forbid a value from appearing twice in the partition.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn partition(&self) -> &Value {
        &self.partition
    }

    pub fn table(&self) -> &ListTable {
        &self.table
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Highest stored index plus one; 0 for an empty partition.
    pub fn len(&self) -> StoreResult<usize> {
        let max: Option<Option<i64>> = self
            .store
            .query_scalar(&self.table.sql.max_index, &[self.partition.clone()])?;
        Ok(match max.flatten() {
            Some(max) => max as usize + 1,
            None => 0,
        })
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> StoreResult<V> {
        let len = self.len()?;
        if index >= len {
            return Err(StoreError::OutOfBounds { index, len });
        }
        self.read_at(index)
    }

    pub fn first(&self) -> StoreResult<Option<V>> {
        if self.is_empty()? {
            return Ok(None);
        }
        self.read_at(0).map(Some)
    }

    pub fn last(&self) -> StoreResult<Option<V>> {
        match self.len()? {
            0 => Ok(None),
            len => self.read_at(len - 1).map(Some),
        }
    }

    fn read_at(&self, index: usize) -> StoreResult<V> {
        let row = self
            .store
            .query_one(&self.table.sql.get, &[self.partition.clone(), index.to_value()])?;
        match row {
            Some(row) => row.into_first(),
            None => Err(StoreError::invalid(format!(
                "no row at index {} of partition {:?}; index column is not dense",
                index, self.partition
            ))),
        }
    }

    /// Lowest index holding `value`.
    pub fn index_of(&self, value: &V) -> StoreResult<Option<usize>> {
        self.find(value, false)
    }

    /// Highest index holding `value`.
    pub fn last_index_of(&self, value: &V) -> StoreResult<Option<usize>> {
        self.find(value, true)
    }

    pub fn contains(&self, value: &V) -> StoreResult<bool> {
        Ok(self.index_of(value)?.is_some())
    }

    fn find(&self, value: &V, from_end: bool) -> StoreResult<Option<usize>> {
        let (sql, param) = self.table.index_of_sql(&value.to_value(), from_end);
        let mut params = vec![self.partition.clone()];
        params.extend(param);
        self.store.query_scalar(&sql, &params)
    }

    /// Whole partition in index order.
    pub fn to_vec(&self) -> StoreResult<Vec<V>> {
        self.store
            .query(&self.table.sql.select_all, &[self.partition.clone()])?
            .into_iter()
            .map(|row| row.into_first())
            .collect()
    }

    /// Iterate a snapshot of the partition.
    pub fn iter(&self) -> StoreResult<std::vec::IntoIter<V>> {
        Ok(self.to_vec()?.into_iter())
    }

    // -----------------------------------------------------------------------
    // Single-element writes
    // -----------------------------------------------------------------------

    /// Overwrite the element at `index`, returning the previous one.
    ///
    /// Writing an equal value is a no-op and skips validation.
    pub fn set(&self, index: usize, value: V) -> StoreResult<V> {
        let old = self.get(index)?;
        if old == value {
            return Ok(old);
        }
        self.validate(&value)?;
        self.replace_index(index, &value)?;
        Ok(old)
    }

    /// Insert `value` at `index`, shifting later elements up.
    pub fn insert(&self, index: usize, value: V) -> StoreResult<()> {
        let len = self.len()?;
        if index > len {
            return Err(StoreError::OutOfBounds { index, len });
        }
        self.insert_within(index, len, &value)
    }

    /// Append `value`.
    pub fn push(&self, value: V) -> StoreResult<()> {
        let len = self.len()?;
        self.insert_within(len, len, &value)
    }

    fn insert_within(&self, index: usize, len: usize, value: &V) -> StoreResult<()> {
        self.validate(value)?;
        batched(&*self.store, || {
            if index < len {
                self.shift_up(index, 1)?;
            }
            self.replace_index(index, value)
        })
    }

    /// Remove and return the element at `index`, shifting later ones down.
    pub fn remove(&self, index: usize) -> StoreResult<V> {
        let len = self.len()?;
        if index >= len {
            return Err(StoreError::OutOfBounds { index, len });
        }
        batched(&*self.store, || self.remove_at(index))
    }

    fn remove_at(&self, index: usize) -> StoreResult<V> {
        let old = self.read_at(index)?;
        let at = index.to_value();
        self.store
            .execute(&self.table.sql.delete_at, &[self.partition.clone(), at])?;
        self.shift_down(index + 1, 1)?;
        Ok(old)
    }

    /// Remove indices `from..to`, returning how many elements went.
    pub fn remove_range(&self, from: usize, to: usize) -> StoreResult<usize> {
        if from > to {
            return Err(StoreError::invalid(format!("range start {from} is after end {to}")));
        }
        let len = self.len()?;
        if to > len {
            return Err(StoreError::OutOfBounds { index: to, len });
        }
        if from == to {
            return Ok(0);
        }
        let width = to - from;
        batched(&*self.store, || {
            self.store.execute(
                &self.table.sql.delete_range,
                &[self.partition.clone(), from.to_value(), to.to_value()],
            )?;
            self.shift_down(to, width)?;
            Ok(width)
        })
    }

    /// Remove every element.
    pub fn clear(&self) -> StoreResult<()> {
        self.store.execute(&self.table.sql.clear, &[self.partition.clone()])?;
        Ok(())
    }

    /// Write `value` at `index`: update the row if one exists, else insert.
    ///
    /// The existence check and the write are separate statements; this is
    /// only safe with a single writer per partition.
    pub(crate) fn replace_index(&self, index: usize, value: &V) -> StoreResult<()> {
        let at = index.to_value();
        let exists = self
            .store
            .query_one(&self.table.sql.exists, &[self.partition.clone(), at.clone()])?
            .is_some();
        if exists {
            self.store.execute(
                &self.table.sql.update,
                &[value.to_value(), self.partition.clone(), at],
            )?;
        } else {
            self.store.execute(
                &self.table.sql.insert,
                &[self.partition.clone(), at, value.to_value()],
            )?;
        }
        Ok(())
    }

    /// Move every row at or above `from` up by `by` slots.
    fn shift_up(&self, from: usize, by: usize) -> StoreResult<()> {
        self.store.execute(
            &self.table.sql.park_from,
            &[by.to_value(), self.partition.clone(), from.to_value()],
        )?;
        self.store.execute(&self.table.sql.unpark, &[self.partition.clone()])?;
        Ok(())
    }

    /// Move every row at or above `from` down by `by` slots. The `by` slots
    /// below `from` must already be empty.
    fn shift_down(&self, from: usize, by: usize) -> StoreResult<()> {
        self.store.execute(
            &self.table.sql.park_down,
            &[by.to_value(), self.partition.clone(), from.to_value()],
        )?;
        self.store.execute(&self.table.sql.unpark, &[self.partition.clone()])?;
        Ok(())
    }

    fn validate(&self, value: &V) -> StoreResult<()> {
        for check in &self.checks {
            check(value)?;
        }
        if self.distinct && self.contains(value)? {
            return Err(StoreError::constraint(
                format!("write to partition {:?}", self.partition),
                "value already present in partition",
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk writes, one commit each
    // -----------------------------------------------------------------------

    /// Append every value.
    pub fn extend<I>(&self, values: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = V>,
    {
        batched(&*self.store, || {
            let mut len = self.len()?;
            for value in values {
                self.insert_within(len, len, &value)?;
                len += 1;
            }
            Ok(())
        })
    }

    /// Insert `values` starting at `index`, keeping their order.
    pub fn insert_all<I>(&self, index: usize, values: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = V>,
    {
        let values: Vec<V> = values.into_iter().collect();
        let len = self.len()?;
        if index > len {
            return Err(StoreError::OutOfBounds { index, len });
        }
        if values.is_empty() {
            return Ok(());
        }
        for (n, value) in values.iter().enumerate() {
            self.validate(value)?;
            if self.distinct && values[..n].contains(value) {
                return Err(StoreError::constraint(
                    format!("write to partition {:?}", self.partition),
                    "value repeated in inserted values",
                ));
            }
        }
        batched(&*self.store, || {
            if index < len {
                self.shift_up(index, values.len())?;
            }
            for (offset, value) in values.iter().enumerate() {
                self.replace_index(index + offset, value)?;
            }
            Ok(())
        })
    }

    /// Remove every element equal to one of `values`. Returns whether
    /// anything was removed.
    pub fn remove_all(&self, values: &[V]) -> StoreResult<bool> {
        self.remove_where(|v| values.contains(v))
    }

    /// Keep only elements equal to one of `values`. Returns whether
    /// anything was removed.
    pub fn retain_all(&self, values: &[V]) -> StoreResult<bool> {
        self.remove_where(|v| !values.contains(v))
    }

    fn remove_where<F>(&self, doomed: F) -> StoreResult<bool>
    where
        F: Fn(&V) -> bool,
    {
        let current = self.to_vec()?;
        batched(&*self.store, || {
            let mut changed = false;
            // Back to front: each removal only shifts indices already visited
            for (index, value) in current.iter().enumerate().rev() {
                if doomed(value) {
                    self.remove_at(index)?;
                    changed = true;
                }
            }
            Ok(changed)
        })
    }

    /// Sort the partition with `compare`, rewriting positions that changed.
    pub fn sort_by<F>(&self, compare: F) -> StoreResult<()>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let current = self.to_vec()?;
        let mut sorted = current.clone();
        sorted.sort_by(compare);
        batched(&*self.store, || {
            for (index, (before, after)) in current.iter().zip(&sorted).enumerate() {
                if before != after {
                    self.replace_index(index, after)?;
                }
            }
            Ok(())
        })
    }

    pub fn sort(&self) -> StoreResult<()>
    where
        V: Ord,
    {
        self.sort_by(V::cmp)
    }

    // -----------------------------------------------------------------------
    // Whole-partition comparison
    // -----------------------------------------------------------------------

    /// Compare against an in-memory sequence. Store failures count as unequal.
    pub fn content_eq(&self, other: &[V]) -> bool {
        crate::or_degrade("list content_eq", self.to_vec().map(|v| v == other), false)
    }

    /// Hash of the elements in order. Store failures hash to 0.
    pub fn content_hash(&self) -> u64
    where
        V: Hash,
    {
        let hashed = self.to_vec().map(|items| {
            let mut hasher = DefaultHasher::new();
            items.hash(&mut hasher);
            hasher.finish()
        });
        crate::or_degrade("list content_hash", hashed, 0)
    }
}

impl<S, V> PartialEq for RowList<S, V>
where
    S: RowStore,
    V: ColumnValue + Clone + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match other.to_vec() {
            Ok(theirs) => self.content_eq(&theirs),
            Err(err) => crate::or_degrade("list eq", Err(err), false),
        }
    }
}

impl<S, V> std::fmt::Debug for RowList<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowList")
            .field("table", &self.table.table())
            .field("partition", &self.partition)
            .field("distinct", &self.distinct)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// References held by list rows
// ---------------------------------------------------------------------------

/// Every distinct element value stored in a list table, across partitions.
///
/// Handed to an [`IdMap`](crate::IdMap) whose keys are stored as list
/// elements, so the map can tell which of its rows are still referenced.
pub struct ListReferences<S> {
    store: Arc<S>,
    table: ListTable,
}

impl<S: RowStore> ListReferences<S> {
    pub fn new(store: Arc<S>, table: ListTable) -> Self {
        Self { store, table }
    }
}

impl<S: RowStore> KeyUsage for ListReferences<S> {
    fn used_keys(&self) -> StoreResult<BTreeSet<i64>> {
        self.store
            .query(&self.table.sql.distinct_values, &[])?
            .into_iter()
            .map(|row| row.into_first::<i64>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowstore_core::{Batch, SqliteStore, StoreConfig};

    const SCHEMA: &str = "CREATE TABLE items (list_id INTEGER, pos INTEGER, val TEXT)";

    fn test_store() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory(StoreConfig::memory()).unwrap();
        store.execute_batch(SCHEMA).unwrap();
        Arc::new(store)
    }

    fn test_list(store: &Arc<SqliteStore>, partition: i64) -> RowList<SqliteStore, String> {
        let table = ListTable::new("items", "list_id", "pos", "val").unwrap();
        RowList::new(Arc::clone(store), table, partition).unwrap()
    }

    fn stored_indices(store: &SqliteStore, partition: i64) -> Vec<i64> {
        store
            .query(
                "SELECT pos FROM items WHERE list_id = ? ORDER BY pos",
                &[Value::Integer(partition)],
            )
            .unwrap()
            .into_iter()
            .map(|row| row.into_first().unwrap())
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_remove_scenario() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.insert(0, "a".into()).unwrap();
        list.insert(1, "b".into()).unwrap();
        list.insert(0, "c".into()).unwrap();
        assert_eq!(list.to_vec().unwrap(), strings(&["c", "a", "b"]));

        assert_eq!(list.remove(1).unwrap(), "a");
        assert_eq!(list.to_vec().unwrap(), strings(&["c", "b"]));
        assert_eq!(list.index_of(&"b".into()).unwrap(), Some(1));
        assert_eq!(stored_indices(&store, 1), vec![0, 1]);
    }

    #[test]
    fn test_bounds_checked() {
        let store = test_store();
        let list = test_list(&store, 1);
        assert!(matches!(list.get(0), Err(StoreError::OutOfBounds { index: 0, len: 0 })));
        assert!(matches!(list.insert(1, "x".into()), Err(StoreError::OutOfBounds { .. })));
        list.push("x".into()).unwrap();
        assert!(matches!(list.remove(1), Err(StoreError::OutOfBounds { index: 1, len: 1 })));
        assert!(matches!(list.set(3, "y".into()), Err(StoreError::OutOfBounds { .. })));
    }

    #[test]
    fn test_partitions_isolated() {
        let store = test_store();
        let a = test_list(&store, 1);
        let b = test_list(&store, 2);
        a.extend(strings(&["a1", "a2"])).unwrap();
        b.extend(strings(&["b1"])).unwrap();
        a.remove(0).unwrap();
        assert_eq!(a.to_vec().unwrap(), strings(&["a2"]));
        assert_eq!(b.to_vec().unwrap(), strings(&["b1"]));
        assert_eq!(stored_indices(&store, 2), vec![0]);
    }

    #[test]
    fn test_set_returns_old_value() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.extend(strings(&["a", "b"])).unwrap();
        assert_eq!(list.set(1, "z".into()).unwrap(), "b");
        assert_eq!(list.set(1, "z".into()).unwrap(), "z");
        assert_eq!(list.to_vec().unwrap(), strings(&["a", "z"]));
    }

    #[test]
    fn test_remove_range() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.extend(strings(&["a", "b", "c", "d", "e"])).unwrap();
        assert_eq!(list.remove_range(1, 3).unwrap(), 2);
        assert_eq!(list.to_vec().unwrap(), strings(&["a", "d", "e"]));
        assert_eq!(stored_indices(&store, 1), vec![0, 1, 2]);
        assert!(list.remove_range(2, 1).is_err());
        assert!(list.remove_range(0, 4).is_err());
        assert_eq!(list.remove_range(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_index_of_null_values() {
        let store = test_store();
        let table = ListTable::new("items", "list_id", "pos", "val").unwrap();
        let list: RowList<SqliteStore, Option<String>> =
            RowList::new(store, table, 9i64).unwrap();
        list.extend([Some("a".to_string()), None, Some("a".into()), None])
            .unwrap();
        assert_eq!(list.index_of(&None).unwrap(), Some(1));
        assert_eq!(list.last_index_of(&None).unwrap(), Some(3));
        assert_eq!(list.last_index_of(&Some("a".into())).unwrap(), Some(2));
        assert_eq!(list.index_of(&Some("q".into())).unwrap(), None);
    }

    #[test]
    fn test_insert_all_keeps_order() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.extend(strings(&["a", "d"])).unwrap();
        list.insert_all(1, strings(&["b", "c"])).unwrap();
        assert_eq!(list.to_vec().unwrap(), strings(&["a", "b", "c", "d"]));
        assert_eq!(stored_indices(&store, 1), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_all_checks_before_shifting() {
        let store = test_store();
        let list = test_list(&store, 1).with_check(|v: &String| {
            if v.is_empty() {
                Err(StoreError::invalid("empty values are not allowed"))
            } else {
                Ok(())
            }
        });
        list.extend(strings(&["a", "d"])).unwrap();

        // The caller's batch stays open, so nothing is rolled back for us.
        let outer = Batch::begin(&*store).unwrap();
        assert!(list.insert_all(1, strings(&["b", ""])).is_err());
        assert_eq!(stored_indices(&store, 1), vec![0, 1]);
        assert_eq!(list.to_vec().unwrap(), strings(&["a", "d"]));
        outer.finish().unwrap();

        let unique = test_list(&store, 2).distinct();
        let err = unique.insert_all(0, strings(&["x", "y", "x"])).unwrap_err();
        assert!(err.is_constraint());
        assert!(unique.is_empty().unwrap());
    }

    #[test]
    fn test_shifts_respect_unique_index() {
        for constraint in ["UNIQUE (list_id, pos)", "UNIQUE (pos, list_id)"] {
            let store = SqliteStore::open_in_memory(StoreConfig::memory()).unwrap();
            store
                .execute_batch(&format!(
                    "CREATE TABLE items (list_id INTEGER, pos INTEGER, val TEXT, {constraint})"
                ))
                .unwrap();
            let store = Arc::new(store);
            let list = test_list(&store, 1);
            let other = test_list(&store, 2);
            other.extend(strings(&["o1", "o2", "o3"])).unwrap();

            for n in 0..20 {
                list.insert(0, format!("v{n}")).unwrap();
            }
            assert_eq!(list.remove(0).unwrap(), "v19");
            assert_eq!(list.remove(5).unwrap(), "v13");
            assert_eq!(list.remove_range(0, 5).unwrap(), 5);
            list.insert(3, "mid".into()).unwrap();

            let mut expected: Vec<String> = (0..13).rev().map(|n| format!("v{n}")).collect();
            expected.insert(3, "mid".into());
            assert_eq!(list.to_vec().unwrap(), expected);
            assert_eq!(stored_indices(&store, 1), (0..14).collect::<Vec<i64>>());
            assert_eq!(other.to_vec().unwrap(), strings(&["o1", "o2", "o3"]));
        }
    }

    #[test]
    fn test_null_partition_rejected() {
        let store = test_store();
        let table = ListTable::new("items", "list_id", "pos", "val").unwrap();
        let result = RowList::<SqliteStore, String>::new(store, table, Option::<i64>::None);
        assert!(matches!(result, Err(StoreError::InvalidArgument { .. })));
    }

    #[test]
    fn test_remove_all_and_retain_all() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.extend(strings(&["a", "b", "a", "c", "b"])).unwrap();
        assert!(list.remove_all(&strings(&["a"])).unwrap());
        assert_eq!(list.to_vec().unwrap(), strings(&["b", "c", "b"]));
        assert!(!list.remove_all(&strings(&["zz"])).unwrap());

        assert!(list.retain_all(&strings(&["b"])).unwrap());
        assert_eq!(list.to_vec().unwrap(), strings(&["b", "b"]));
        assert_eq!(stored_indices(&store, 1), vec![0, 1]);
    }

    #[test]
    fn test_sort() {
        let store = test_store();
        let list = test_list(&store, 1);
        list.extend(strings(&["pear", "apple", "fig"])).unwrap();
        list.sort().unwrap();
        assert_eq!(list.to_vec().unwrap(), strings(&["apple", "fig", "pear"]));
        list.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b))).unwrap();
        assert_eq!(list.to_vec().unwrap(), strings(&["apple", "pear", "fig"]));
    }

    #[test]
    fn test_distinct_rejects_duplicates() {
        let store = test_store();
        let list = test_list(&store, 1).distinct();
        list.push("a".into()).unwrap();
        list.push("b".into()).unwrap();
        let err = list.push("a".into()).unwrap_err();
        assert!(err.is_constraint());
        assert!(list.set(1, "a".into()).unwrap_err().is_constraint());
        // Rewriting the same value in place is allowed
        assert_eq!(list.set(0, "a".into()).unwrap(), "a");
        assert_eq!(list.len().unwrap(), 2);
    }

    #[test]
    fn test_failed_bulk_rolls_back() {
        let store = test_store();
        let list = test_list(&store, 1).with_check(|v: &String| {
            if v.is_empty() {
                Err(StoreError::invalid("empty values are not allowed"))
            } else {
                Ok(())
            }
        });
        list.push("keep".into()).unwrap();
        let result = list.extend(strings(&["x", "", "y"]));
        assert!(result.is_err());
        assert!(store.auto_commit());
        assert_eq!(list.to_vec().unwrap(), strings(&["keep"]));
    }

    #[test]
    fn test_equality_and_hash() {
        let store = test_store();
        let a = test_list(&store, 1);
        let b = test_list(&store, 2);
        a.extend(strings(&["x", "y"])).unwrap();
        b.extend(strings(&["x", "y"])).unwrap();
        assert!(a == b);
        assert!(a.content_eq(&strings(&["x", "y"])));
        assert_eq!(a.content_hash(), b.content_hash());
        b.push("z".into()).unwrap();
        assert!(a != b);
    }

    #[test]
    fn test_first_last() {
        let store = test_store();
        let list = test_list(&store, 1);
        assert_eq!(list.first().unwrap(), None);
        list.extend(strings(&["a", "b", "c"])).unwrap();
        assert_eq!(list.first().unwrap(), Some("a".into()));
        assert_eq!(list.last().unwrap(), Some("c".into()));
        list.clear().unwrap();
        assert!(list.is_empty().unwrap());
    }

    #[test]
    fn test_list_references() {
        let store = Arc::new(SqliteStore::open_in_memory(StoreConfig::memory()).unwrap());
        store
            .execute_batch("CREATE TABLE refs (list_id INTEGER, pos INTEGER, key_id INTEGER)")
            .unwrap();
        let table = ListTable::new("refs", "list_id", "pos", "key_id").unwrap();
        let one: RowList<SqliteStore, i64> =
            RowList::new(Arc::clone(&store), table.clone(), 1i64).unwrap();
        let two: RowList<SqliteStore, i64> =
            RowList::new(Arc::clone(&store), table.clone(), 2i64).unwrap();
        one.extend([10, 11]).unwrap();
        two.extend([11, 12]).unwrap();

        let used = ListReferences::new(store, table).used_keys().unwrap();
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec![10, 11, 12]);
    }
}
