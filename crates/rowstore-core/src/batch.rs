//! Statement grouping for multi-row mutations.
//!
//! A `Batch` suspends auto-commit for the duration of a bulk operation and
//! commits once at the end. Only the outermost batch commits: a batch opened
//! while auto-commit is already off leaves transaction control to whoever
//! switched it off.
//!
//! Grouping buys throughput, not crash atomicity. If a batch is dropped
//! before `finish()` (an error bubbled up through `?`, or a panic), the guard
//! rolls back the pending statements and restores auto-commit so the
//! connection is never left suspended.

use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::store::RowStore;

/// Auto-commit suspension guard.
pub struct Batch<'a, S: RowStore + ?Sized> {
    store: &'a S,
    /// Auto-commit was on when the batch began, so this batch owns the commit
    owner: bool,
    finished: bool,
}

impl<'a, S: RowStore + ?Sized> Batch<'a, S> {
    /// Suspend auto-commit if it is on.
    pub fn begin(store: &'a S) -> StoreResult<Self> {
        let owner = store.auto_commit();
        if owner {
            store.set_auto_commit(false)?;
        }
        Ok(Self { store, owner, finished: false })
    }

    /// Whether this batch will commit, as opposed to riding an outer one.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Commit the grouped statements and restore auto-commit.
    ///
    /// If the commit or the restore fails, pending work is rolled back,
    /// auto-commit is restored and the first error is returned.
    pub fn finish(mut self) -> StoreResult<()> {
        self.finished = true;
        if !self.owner {
            return Ok(());
        }
        let committed = self
            .store
            .commit()
            .and_then(|()| self.store.set_auto_commit(true));
        if let Err(err) = committed {
            self.abandon();
            return Err(err);
        }
        debug!("batch committed");
        Ok(())
    }

    fn abandon(&self) {
        if let Err(err) = self.store.rollback() {
            warn!(error = %err, "rollback of abandoned batch failed");
        }
        if let Err(err) = self.store.set_auto_commit(true) {
            warn!(error = %err, "could not restore auto-commit after abandoned batch");
        }
    }
}

impl<S: RowStore + ?Sized> Drop for Batch<'_, S> {
    fn drop(&mut self) {
        if self.finished || !self.owner {
            return;
        }
        warn!("batch dropped before finish, rolling back");
        self.abandon();
    }
}

/// Run `f` inside a batch, committing only if it succeeds.
pub fn batched<S, T, F>(store: &S, f: F) -> StoreResult<T>
where
    S: RowStore + ?Sized,
    F: FnOnce() -> StoreResult<T>,
{
    let batch = Batch::begin(store)?;
    let out = f()?;
    batch.finish()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::error::StoreError;
    use crate::sqlite::SqliteStore;
    use crate::store::Row;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory(StoreConfig::memory()).unwrap();
        store.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        store
    }

    fn count(store: &SqliteStore) -> i64 {
        store.query_scalar("SELECT COUNT(*) FROM t", &[]).unwrap().unwrap()
    }

    #[test]
    fn test_finish_commits_and_restores() {
        let store = test_store();
        let batch = Batch::begin(&store).unwrap();
        assert!(batch.is_owner());
        assert!(!store.auto_commit());
        store.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        batch.finish().unwrap();
        assert!(store.auto_commit());
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let store = test_store();
        let result: StoreResult<()> = batched(&store, || {
            store.execute("INSERT INTO t VALUES (1)", &[])?;
            Err(StoreError::invalid("boom"))
        });
        assert!(result.is_err());
        assert!(store.auto_commit());
        assert_eq!(count(&store), 0);
    }

    #[test]
    fn test_failed_commit_rolls_back_and_restores() {
        let store = SqliteStore::open_in_memory(StoreConfig::memory()).unwrap();
        store
            .execute_batch(
                "PRAGMA foreign_keys = ON;
                 CREATE TABLE parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE t (v INTEGER REFERENCES parent (id) DEFERRABLE INITIALLY DEFERRED);",
            )
            .unwrap();

        // The dangling reference is only checked at COMMIT.
        let batch = Batch::begin(&store).unwrap();
        store.execute("INSERT INTO t VALUES (42)", &[]).unwrap();
        let err = batch.finish().unwrap_err();
        assert!(err.is_constraint());
        assert!(store.auto_commit());
        assert_eq!(count(&store), 0);

        store.execute("INSERT INTO parent VALUES (42)", &[]).unwrap();
        batched(&store, || store.execute("INSERT INTO t VALUES (42)", &[])).unwrap();
        assert_eq!(count(&store), 1);
    }

    /// Store whose first attempt to turn auto-commit back on fails.
    struct StuckRestore {
        inner: SqliteStore,
        failures: AtomicUsize,
    }

    impl RowStore for StuckRestore {
        fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
            self.inner.query(sql, params)
        }

        fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
            self.inner.execute(sql, params)
        }

        fn insert(&self, sql: &str, params: &[Value]) -> StoreResult<i64> {
            self.inner.insert(sql, params)
        }

        fn auto_commit(&self) -> bool {
            self.inner.auto_commit()
        }

        fn set_auto_commit(&self, enabled: bool) -> StoreResult<()> {
            if enabled && self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::invalid("auto-commit restore refused"));
            }
            self.inner.set_auto_commit(enabled)
        }

        fn commit(&self) -> StoreResult<()> {
            self.inner.commit()
        }

        fn rollback(&self) -> StoreResult<()> {
            self.inner.rollback()
        }
    }

    #[test]
    fn test_failed_restore_still_restores() {
        let store = StuckRestore { inner: test_store(), failures: AtomicUsize::new(1) };
        let batch = Batch::begin(&store).unwrap();
        store.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        assert!(batch.finish().is_err());
        assert!(store.auto_commit());
        // The commit itself went through before the restore failed.
        assert_eq!(count(&store.inner), 1);
    }

    #[test]
    fn test_nested_batch_defers_to_outer() {
        let store = test_store();
        let outer = Batch::begin(&store).unwrap();
        {
            let inner = Batch::begin(&store).unwrap();
            assert!(!inner.is_owner());
            store.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
            inner.finish().unwrap();
        }
        assert!(!store.auto_commit());
        drop(outer);
        assert!(store.auto_commit());
        assert_eq!(count(&store), 0);
    }
}
