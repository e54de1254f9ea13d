//! Fixed-domain navigable cache.
//!
//! A sorted, read-mostly map whose key set is handed in at construction and
//! never changes. Key questions (membership, first/last, floor/ceiling,
//! ranges) are answered from the domain alone with no I/O. Values are
//! materialized on first access and memoized for the life of the cache;
//! there is no eviction and no invalidation.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rowstore_core::{ColumnValue, RowStore, StoreError, StoreResult};

use crate::map::RowMap;
use crate::table::MapTable;

/// Computes the value for a domain key.
pub trait Materialize<K, V> {
    fn materialize(&self, key: &K) -> StoreResult<V>;
}

impl<K, V, F> Materialize<K, V> for F
where
    F: Fn(&K) -> StoreResult<V>,
{
    fn materialize(&self, key: &K) -> StoreResult<V> {
        self(key)
    }
}

/// Materializer reading one value column by key.
///
/// A key with no row materializes as `None`.
pub struct RowLookup<S, K, V> {
    map: RowMap<S, K, V>,
}

impl<S, K, V> RowLookup<S, K, V>
where
    S: RowStore,
    K: ColumnValue + Ord + Clone,
    V: ColumnValue + Clone + PartialEq,
{
    pub fn new(store: Arc<S>, table: MapTable) -> Self {
        Self { map: RowMap::new(store, table) }
    }
}

impl<S, K, V> Materialize<K, Option<V>> for RowLookup<S, K, V>
where
    S: RowStore,
    K: ColumnValue + Ord + Clone,
    V: ColumnValue + Clone + PartialEq,
{
    fn materialize(&self, key: &K) -> StoreResult<Option<V>> {
        self.map.get(key)
    }
}

/// Sorted map over a fixed key domain with lazily computed values.
pub struct DomainCache<K, V, M> {
    domain: Arc<BTreeSet<K>>,
    /// Memoized values, filled on first access
    values: Mutex<HashMap<K, V>>,
    source: M,
}

impl<K, V, M> DomainCache<K, V, M>
where
    K: Ord + Hash + Clone,
    V: Clone,
    M: Materialize<K, V>,
{
    pub fn new(domain: Arc<BTreeSet<K>>, source: M) -> Self {
        Self {
            domain,
            values: Mutex::new(HashMap::new()),
            source,
        }
    }

    pub fn domain(&self) -> &BTreeSet<K> {
        &self.domain
    }

    /// Membership in the domain. Never touches storage.
    pub fn contains_key(&self, key: &K) -> bool {
        self.domain.contains(key)
    }

    pub fn len(&self) -> usize {
        self.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// How many values have been materialized so far.
    pub fn cached_len(&self) -> usize {
        self.values.lock().len()
    }

    /// Value for `key`, or `None` if `key` is outside the domain.
    pub fn get(&self, key: &K) -> StoreResult<Option<V>> {
        if !self.domain.contains(key) {
            return Ok(None);
        }
        self.value_of(key).map(Some)
    }

    /// Memoized value of a key known to be in the domain.
    fn value_of(&self, key: &K) -> StoreResult<V> {
        if let Some(value) = self.values.lock().get(key) {
            return Ok(value.clone());
        }
        // The lock is not held while materializing; the first stored value wins.
        let value = self.source.materialize(key)?;
        let mut values = self.values.lock();
        Ok(values.entry(key.clone()).or_insert(value).clone())
    }

    fn entry_of(&self, key: Option<&K>) -> StoreResult<Option<(K, V)>> {
        match key {
            Some(key) => Ok(Some((key.clone(), self.value_of(key)?))),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Key navigation, no I/O
    // -----------------------------------------------------------------------

    pub fn first_key(&self) -> Option<K> {
        self.domain.first().cloned()
    }

    pub fn last_key(&self) -> Option<K> {
        self.domain.last().cloned()
    }

    /// Greatest domain key strictly below `key`.
    pub fn lower_key(&self, key: &K) -> Option<K> {
        self.lower_ref(key).cloned()
    }

    /// Greatest domain key at or below `key`.
    pub fn floor_key(&self, key: &K) -> Option<K> {
        self.floor_ref(key).cloned()
    }

    /// Least domain key at or above `key`.
    pub fn ceiling_key(&self, key: &K) -> Option<K> {
        self.ceiling_ref(key).cloned()
    }

    /// Least domain key strictly above `key`.
    pub fn higher_key(&self, key: &K) -> Option<K> {
        self.higher_ref(key).cloned()
    }

    fn lower_ref(&self, key: &K) -> Option<&K> {
        self.domain.range::<K, _>(..key).next_back()
    }

    fn floor_ref(&self, key: &K) -> Option<&K> {
        self.domain.range::<K, _>(..=key).next_back()
    }

    fn ceiling_ref(&self, key: &K) -> Option<&K> {
        self.domain.range::<K, _>(key..).next()
    }

    fn higher_ref(&self, key: &K) -> Option<&K> {
        self.domain
            .range::<K, _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
    }

    // -----------------------------------------------------------------------
    // Entry navigation, values resolved lazily
    // -----------------------------------------------------------------------

    pub fn first_entry(&self) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.domain.first())
    }

    pub fn last_entry(&self) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.domain.last())
    }

    pub fn lower_entry(&self, key: &K) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.lower_ref(key))
    }

    pub fn floor_entry(&self, key: &K) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.floor_ref(key))
    }

    pub fn ceiling_entry(&self, key: &K) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.ceiling_ref(key))
    }

    pub fn higher_entry(&self, key: &K) -> StoreResult<Option<(K, V)>> {
        self.entry_of(self.higher_ref(key))
    }

    // -----------------------------------------------------------------------
    // Iteration and range views
    // -----------------------------------------------------------------------

    /// Entries in ascending key order, each value materialized on demand.
    pub fn iter(&self) -> impl Iterator<Item = StoreResult<(K, V)>> + '_ {
        self.domain
            .iter()
            .map(move |key| self.value_of(key).map(|value| (key.clone(), value)))
    }

    /// Entries in descending key order.
    pub fn iter_rev(&self) -> impl Iterator<Item = StoreResult<(K, V)>> + '_ {
        self.domain
            .iter()
            .rev()
            .map(move |key| self.value_of(key).map(|value| (key.clone(), value)))
    }

    /// View of the domain keys inside `bounds`.
    ///
    /// A start bound above the end bound is rejected.
    pub fn range<R: RangeBounds<K>>(&self, bounds: R) -> StoreResult<DomainRange<'_, K, V, M>> {
        DomainRange::new(self, bounds.start_bound().cloned(), bounds.end_bound().cloned())
    }

    /// Keys below `to` (or at it, if `inclusive`).
    pub fn head(&self, to: K, inclusive: bool) -> DomainRange<'_, K, V, M> {
        let end = if inclusive { Bound::Included(to) } else { Bound::Excluded(to) };
        DomainRange { cache: self, start: Bound::Unbounded, end, empty: false }
    }

    /// Keys above `from` (or at it, if `inclusive`).
    pub fn tail(&self, from: K, inclusive: bool) -> DomainRange<'_, K, V, M> {
        let start = if inclusive { Bound::Included(from) } else { Bound::Excluded(from) };
        DomainRange { cache: self, start, end: Bound::Unbounded, empty: false }
    }

    // -----------------------------------------------------------------------
    // Mutation: the domain is fixed
    // -----------------------------------------------------------------------

    pub fn put(&self, _key: K, _value: V) -> StoreResult<Option<V>> {
        Err(StoreError::Unsupported { operation: "put into fixed-domain cache" })
    }

    pub fn remove(&self, _key: &K) -> StoreResult<Option<V>> {
        Err(StoreError::Unsupported { operation: "remove from fixed-domain cache" })
    }

    pub fn pop_first(&self) -> StoreResult<Option<(K, V)>> {
        Err(StoreError::Unsupported { operation: "pop_first from fixed-domain cache" })
    }

    pub fn pop_last(&self) -> StoreResult<Option<(K, V)>> {
        Err(StoreError::Unsupported { operation: "pop_last from fixed-domain cache" })
    }

    // -----------------------------------------------------------------------
    // Whole-map comparison: materializes every domain key
    // -----------------------------------------------------------------------

    /// Every entry, materializing whatever is not cached yet.
    ///
    /// On a large domain this is a full fetch.
    pub fn to_btree(&self) -> StoreResult<BTreeMap<K, V>> {
        self.iter().collect()
    }

    /// Compare against an in-memory map. Store failures count as unequal.
    pub fn content_eq(&self, other: &BTreeMap<K, V>) -> bool
    where
        V: PartialEq,
    {
        if other.len() != self.domain.len() {
            return false;
        }
        crate::or_degrade("domain content_eq", self.to_btree().map(|m| m == *other), false)
    }

    /// Hash of every entry in key order. Store failures hash to 0.
    pub fn content_hash(&self) -> u64
    where
        V: Hash,
    {
        let hashed = self.to_btree().map(|m| {
            let mut hasher = DefaultHasher::new();
            m.hash(&mut hasher);
            hasher.finish()
        });
        crate::or_degrade("domain content_hash", hashed, 0)
    }
}

impl<K: std::fmt::Debug, V, M> std::fmt::Debug for DomainCache<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCache")
            .field("domain", &self.domain.len())
            .field("cached", &self.values.lock().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Range view
// ---------------------------------------------------------------------------

/// Sub-range of a [`DomainCache`]. Counting and key walks stay in memory;
/// values are still materialized one key at a time.
pub struct DomainRange<'c, K, V, M> {
    cache: &'c DomainCache<K, V, M>,
    start: Bound<K>,
    end: Bound<K>,
    /// Both bounds exclude the same key
    empty: bool,
}

impl<'c, K, V, M> DomainRange<'c, K, V, M>
where
    K: Ord + Hash + Clone,
    V: Clone,
    M: Materialize<K, V>,
{
    fn new(cache: &'c DomainCache<K, V, M>, start: Bound<K>, end: Bound<K>) -> StoreResult<Self> {
        let mut empty = false;
        if let (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) =
            (&start, &end)
        {
            if s > e {
                return Err(StoreError::invalid("range start is above range end"));
            }
            if s == e && matches!((&start, &end), (Bound::Excluded(_), Bound::Excluded(_))) {
                empty = true;
            }
        }
        Ok(Self { cache, start, end, empty })
    }

    fn domain_keys(&self) -> Box<dyn DoubleEndedIterator<Item = &'c K> + 'c> {
        if self.empty {
            return Box::new(std::iter::empty());
        }
        let bounds = (self.start.as_ref(), self.end.as_ref());
        Box::new(self.cache.domain.range::<K, _>(bounds))
    }

    pub fn len(&self) -> usize {
        self.domain_keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.domain_keys().next().is_none()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let above_start = match &self.start {
            Bound::Included(start) => key >= start,
            Bound::Excluded(start) => key > start,
            Bound::Unbounded => true,
        };
        let below_end = match &self.end {
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
            Bound::Unbounded => true,
        };
        above_start && below_end && self.cache.contains_key(key)
    }

    pub fn first_key(&self) -> Option<K> {
        self.domain_keys().next().cloned()
    }

    pub fn last_key(&self) -> Option<K> {
        self.domain_keys().next_back().cloned()
    }

    pub fn keys(&self) -> Vec<K> {
        self.domain_keys().cloned().collect()
    }

    /// Entries inside the range, values materialized on demand.
    pub fn iter(&self) -> impl Iterator<Item = StoreResult<(K, V)>> + 'c {
        let cache = self.cache;
        self.domain_keys()
            .map(move |key| cache.value_of(key).map(|value| (key.clone(), value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn domain(keys: &[i64]) -> Arc<BTreeSet<i64>> {
        Arc::new(keys.iter().copied().collect())
    }

    fn squares(keys: &[i64]) -> DomainCache<i64, i64, impl Fn(&i64) -> StoreResult<i64>> {
        DomainCache::new(domain(keys), |k: &i64| -> StoreResult<i64> { Ok(k * k) })
    }

    #[test]
    fn test_navigation_scenario() {
        let cache = squares(&[1, 3, 7]);
        assert_eq!(cache.floor_key(&5), Some(3));
        assert_eq!(cache.ceiling_key(&5), Some(7));
        assert_eq!(cache.lower_key(&3), Some(1));
        assert_eq!(cache.higher_key(&3), Some(7));
        assert_eq!(cache.floor_key(&0), None);
        assert_eq!(cache.higher_key(&7), None);
        assert_eq!(cache.first_key(), Some(1));
        assert_eq!(cache.last_key(), Some(7));
        assert_eq!(cache.get(&2).unwrap(), None);
        assert!(!cache.contains_key(&2));
        assert_eq!(cache.cached_len(), 0);
    }

    #[test]
    fn test_values_materialized_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = DomainCache::new(domain(&[2, 4]), move |k: &i64| -> StoreResult<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("v{k}"))
        });

        assert_eq!(cache.get(&2).unwrap(), Some("v2".to_string()));
        assert_eq!(cache.get(&2).unwrap(), Some("v2".to_string()));
        assert_eq!(cache.floor_entry(&3).unwrap(), Some((2, "v2".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_len(), 1);

        assert_eq!(cache.ceiling_key(&3), Some(4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_materialization_not_cached() {
        let cache: DomainCache<i64, i64, _> = DomainCache::new(domain(&[1]), |_: &i64| -> StoreResult<i64> {
            Err(StoreError::invalid("backing store down"))
        });
        assert!(cache.get(&1).is_err());
        assert_eq!(cache.cached_len(), 0);
        assert!(!cache.content_eq(&BTreeMap::from([(1, 1)])));
        assert_eq!(cache.content_hash(), 0);
    }

    #[test]
    fn test_mutation_unsupported() {
        let cache = squares(&[1]);
        assert!(matches!(cache.put(2, 4), Err(StoreError::Unsupported { .. })));
        assert!(matches!(cache.remove(&1), Err(StoreError::Unsupported { .. })));
        assert!(matches!(cache.pop_first(), Err(StoreError::Unsupported { .. })));
        assert!(matches!(cache.pop_last(), Err(StoreError::Unsupported { .. })));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_range_views() {
        let cache = squares(&[1, 3, 5, 7, 9]);
        let mid = cache.range(2..8).unwrap();
        assert_eq!(mid.len(), 3);
        assert_eq!(mid.keys(), vec![3, 5, 7]);
        assert_eq!(mid.first_key(), Some(3));
        assert_eq!(mid.last_key(), Some(7));
        assert!(mid.contains_key(&5));
        assert!(!mid.contains_key(&9));
        let entries: Vec<(i64, i64)> = mid.iter().collect::<StoreResult<_>>().unwrap();
        assert_eq!(entries, vec![(3, 9), (5, 25), (7, 49)]);
        assert_eq!(cache.cached_len(), 3);

        assert_eq!(cache.head(5, false).keys(), vec![1, 3]);
        assert_eq!(cache.head(5, true).len(), 3);
        assert_eq!(cache.tail(7, false).keys(), vec![9]);

        assert!(cache.range(8..2).is_err());
        let hollow = cache.range((Bound::Excluded(5), Bound::Excluded(5))).unwrap();
        assert!(hollow.is_empty());
    }

    #[test]
    fn test_iteration_and_equality() {
        let cache = squares(&[2, 1]);
        let forward: Vec<(i64, i64)> = cache.iter().collect::<StoreResult<_>>().unwrap();
        assert_eq!(forward, vec![(1, 1), (2, 4)]);
        let backward: Vec<(i64, i64)> = cache.iter_rev().collect::<StoreResult<_>>().unwrap();
        assert_eq!(backward, vec![(2, 4), (1, 1)]);

        assert!(cache.content_eq(&BTreeMap::from([(1, 1), (2, 4)])));
        assert!(!cache.content_eq(&BTreeMap::from([(1, 1)])));
        assert_eq!(cache.content_hash(), squares(&[1, 2]).content_hash());
    }

    #[test]
    fn test_random_navigation_matches_scan() {
        let mut rng = StdRng::seed_from_u64(0xd0a1);
        for _ in 0..50 {
            let size = rng.gen_range(0..30);
            let keys: Vec<i64> = (0..size).map(|_| rng.gen_range(-100..100)).collect();
            let cache = squares(&keys);
            let sorted: Vec<i64> = cache.domain().iter().copied().collect();

            for _ in 0..40 {
                let target = rng.gen_range(-110..110);
                let below = sorted.iter().rev().copied().find(|k| *k < target);
                let at_or_below = sorted.iter().rev().copied().find(|k| *k <= target);
                let at_or_above = sorted.iter().copied().find(|k| *k >= target);
                let above = sorted.iter().copied().find(|k| *k > target);

                assert_eq!(cache.lower_key(&target), below, "lower_key({target})");
                assert_eq!(cache.floor_key(&target), at_or_below, "floor_key({target})");
                assert_eq!(cache.ceiling_key(&target), at_or_above, "ceiling_key({target})");
                assert_eq!(cache.higher_key(&target), above, "higher_key({target})");
            }
            assert_eq!(cache.first_key(), sorted.first().copied());
            assert_eq!(cache.last_key(), sorted.last().copied());
            assert_eq!(cache.cached_len(), 0);
        }
    }
}
