//! Key-value map adapter over a two-column table.
//!
//! Point operations translate to a single statement each. Enumeration goes
//! through a sorted snapshot of the table so iteration never holds a cursor
//! open on the store, while removal through the iterator still deletes the
//! live row (see [`SnapshotIter`]).

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use rowstore_core::{batched, ColumnValue, RowStore, StoreResult, Value};

use crate::snapshot::SnapshotIter;
use crate::table::{MapTable, Nav};

/// Map from `K` to `V` whose entries live in a [`MapTable`].
///
/// Key uniqueness is kept by the adapter: `put` updates an existing row
/// rather than inserting a second one.
pub struct RowMap<S, K, V> {
    store: Arc<S>,
    table: MapTable,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V> RowMap<S, K, V>
where
    S: RowStore,
    K: ColumnValue + Ord + Clone,
    V: ColumnValue + Clone + PartialEq,
{
    pub fn new(store: Arc<S>, table: MapTable) -> Self {
        Self { store, table, _types: PhantomData }
    }

    pub fn table(&self) -> &MapTable {
        &self.table
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub fn contains_key(&self, key: &K) -> StoreResult<bool> {
        let row = self.store.query_one(&self.table.sql.contains, &[key.to_value()])?;
        Ok(row.is_some())
    }

    pub fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.get_encoded(key.to_value())
    }

    /// `get` for a raw cell. A key that is not representable as `K` is
    /// simply absent.
    pub fn lookup(&self, key: &Value) -> StoreResult<Option<V>> {
        match K::from_value(key.clone()) {
            Ok(key) => self.get(&key),
            Err(_) => Ok(None),
        }
    }

    fn get_encoded(&self, key: Value) -> StoreResult<Option<V>> {
        match self.store.query_one(&self.table.sql.get, &[key])? {
            Some(row) => row.into_first().map(Some),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn put(&self, key: K, value: V) -> StoreResult<Option<V>> {
        let old = self.get(&key)?;
        match &old {
            Some(previous) if *previous == value => {}
            Some(_) => {
                self.store
                    .execute(&self.table.sql.update, &[value.to_value(), key.to_value()])?;
            }
            None => {
                self.store
                    .execute(&self.table.sql.insert, &[key.to_value(), value.to_value()])?;
            }
        }
        Ok(old)
    }

    /// Remove `key`, returning the value it held.
    pub fn remove(&self, key: &K) -> StoreResult<Option<V>> {
        let old = self.get(key)?;
        if old.is_some() {
            self.store.execute(&self.table.sql.delete, &[key.to_value()])?;
        }
        Ok(old)
    }

    /// Remove `key` and report whether a row was deleted.
    pub fn remove_key(&self, key: &K) -> StoreResult<bool> {
        let deleted = self.store.execute(&self.table.sql.delete, &[key.to_value()])?;
        Ok(deleted > 0)
    }

    pub fn len(&self) -> StoreResult<usize> {
        let count: Option<i64> = self.store.query_scalar(&self.table.sql.count, &[])?;
        Ok(count.unwrap_or(0) as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.first_key()?.is_none())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.execute(&self.table.sql.clear, &[])?;
        Ok(())
    }

    /// Insert every pair, committing once.
    pub fn put_all<I>(&self, entries: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        batched(&*self.store, || {
            for (key, value) in entries {
                self.put(key, value)?;
            }
            Ok(())
        })
    }

    /// Point-in-time copy of the whole table, ordered by key.
    pub fn to_btree(&self) -> StoreResult<BTreeMap<K, V>> {
        let rows = self.store.query(&self.table.sql.select_all, &[])?;
        let mut out = BTreeMap::new();
        for row in rows {
            out.insert(row.get::<K>(0)?, row.get::<V>(1)?);
        }
        Ok(out)
    }

    /// Ordered snapshot of entries; `remove()` deletes the live row.
    pub fn entries(&self) -> StoreResult<SnapshotIter<(K, V), impl FnMut(&(K, V)) -> StoreResult<()> + '_>> {
        let snapshot: Vec<(K, V)> = self.to_btree()?.into_iter().collect();
        Ok(SnapshotIter::new(snapshot, move |entry: &(K, V)| {
            self.remove_key(&entry.0).map(|_| ())
        }))
    }

    /// Ordered snapshot of keys; `remove()` deletes the live row.
    pub fn keys(&self) -> StoreResult<SnapshotIter<K, impl FnMut(&K) -> StoreResult<()> + '_>> {
        let rows = self.store.query(&self.table.sql.select_keys, &[])?;
        let snapshot = rows
            .into_iter()
            .map(|row| row.into_first::<K>())
            .collect::<StoreResult<Vec<K>>>()?;
        Ok(SnapshotIter::new(snapshot, move |key: &K| {
            self.remove_key(key).map(|_| ())
        }))
    }

    // -----------------------------------------------------------------------
    // Ordered key navigation
    // -----------------------------------------------------------------------

    pub fn first_key(&self) -> StoreResult<Option<K>> {
        self.store.query_scalar(&self.table.sql.first_key, &[])
    }

    pub fn last_key(&self) -> StoreResult<Option<K>> {
        self.store.query_scalar(&self.table.sql.last_key, &[])
    }

    pub fn lower_key(&self, key: &K) -> StoreResult<Option<K>> {
        self.nav_key(Nav::Lower, key)
    }

    pub fn floor_key(&self, key: &K) -> StoreResult<Option<K>> {
        self.nav_key(Nav::Floor, key)
    }

    pub fn ceiling_key(&self, key: &K) -> StoreResult<Option<K>> {
        self.nav_key(Nav::Ceiling, key)
    }

    pub fn higher_key(&self, key: &K) -> StoreResult<Option<K>> {
        self.nav_key(Nav::Higher, key)
    }

    fn nav_key(&self, nav: Nav, key: &K) -> StoreResult<Option<K>> {
        self.store.query_scalar(&self.table.nav_sql(nav), &[key.to_value()])
    }

    // -----------------------------------------------------------------------
    // Whole-map comparison
    // -----------------------------------------------------------------------

    /// Compare against an in-memory map. Store failures count as unequal.
    pub fn content_eq(&self, other: &BTreeMap<K, V>) -> bool {
        crate::or_degrade("map content_eq", self.to_btree().map(|m| m == *other), false)
    }

    /// Hash of the ordered entries. Store failures hash to 0.
    pub fn content_hash(&self) -> u64
    where
        K: Hash,
        V: Hash,
    {
        let hashed = self.to_btree().map(|m| {
            let mut hasher = DefaultHasher::new();
            m.hash(&mut hasher);
            hasher.finish()
        });
        crate::or_degrade("map content_hash", hashed, 0)
    }
}

impl<S, K, V> PartialEq for RowMap<S, K, V>
where
    S: RowStore,
    K: ColumnValue + Ord + Clone,
    V: ColumnValue + Clone + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match other.to_btree() {
            Ok(theirs) => self.content_eq(&theirs),
            Err(err) => crate::or_degrade("map eq", Err(err), false),
        }
    }
}

impl<S, K, V> std::fmt::Debug for RowMap<S, K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowMap")
            .field("table", &self.table.table())
            .finish()
    }
}
