//! SQLite Row Store: the concrete collaborator the adapters run against.
//!
//! SqliteStore wraps one rusqlite connection behind a Mutex so a single
//! handle can be shared through `Arc` between adapters.
//!
//! **Statements**: every text is prepared through the connection's cache
//! **Auto-commit**: JDBC-style; switching it off opens a transaction that
//! `commit`/`rollback` close and immediately reopen
//! **Errors**: constraint failures are reported apart from all others

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{Row, RowStore};
use crate::value::Value;

struct Inner {
    conn: Connection,
    auto_commit: bool,
}

impl Inner {
    fn run(&self, sql: &str) -> StoreResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| StoreError::from_sqlite(sql, e))
    }
}

/// Row Store over a single SQLite connection.
///
/// All methods take `&self`. The Mutex serializes individual statements;
/// it does not make multi-statement sequences atomic, which remain the
/// caller's business under the single-writer model.
pub struct SqliteStore {
    inner: Mutex<Inner>,
    /// Database file, `None` for in-memory stores
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::from_sqlite(format!("open {}", path.display()), e))?;
        let store = Self::configure(conn, Some(path), config)?;
        info!(path = ?store.path, "opened sqlite row store");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(config: StoreConfig) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::from_sqlite("open in-memory database", e))?;
        Self::configure(conn, None, config)
    }

    fn configure(conn: Connection, path: Option<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        config.validate().map_err(StoreError::invalid)?;

        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| StoreError::from_sqlite("set busy timeout", e))?;
        conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);

        // journal_mode answers with the mode actually in effect; in-memory
        // databases always answer "memory".
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_pragma(), |row| row.get(0))
            .map_err(|e| StoreError::from_sqlite("set journal_mode", e))?;
        conn.pragma_update(None, "synchronous", config.sync_level.as_pragma())
            .map_err(|e| StoreError::from_sqlite("set synchronous", e))?;
        debug!(journal_mode = %mode, sync = config.sync_level.as_pragma(), "configured connection");

        Ok(Self {
            inner: Mutex::new(Inner { conn, auto_commit: true }),
            path,
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run DDL or other unparameterized statements.
    ///
    /// Adapters never call this; it exists so owners of the store can set up
    /// tables before handing the store to adapters.
    pub fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        self.inner.lock().run(sql)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("auto_commit", &self.inner.lock().auto_commit)
            .finish()
    }
}

impl RowStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        let inner = self.inner.lock();
        let mut stmt = inner
            .conn
            .prepare_cached(sql)
            .map_err(|e| StoreError::from_sqlite(sql, e))?;
        let columns = stmt.column_count();
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| StoreError::from_sqlite(sql, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| StoreError::from_sqlite(sql, e))? {
            let mut cells = Vec::with_capacity(columns);
            for i in 0..columns {
                let cell = row.get_ref(i).map_err(|e| StoreError::from_sqlite(sql, e))?;
                cells.push(Value::from(cell));
            }
            out.push(Row::new(cells));
        }
        Ok(out)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        let inner = self.inner.lock();
        let mut stmt = inner
            .conn
            .prepare_cached(sql)
            .map_err(|e| StoreError::from_sqlite(sql, e))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| StoreError::from_sqlite(sql, e))
    }

    fn insert(&self, sql: &str, params: &[Value]) -> StoreResult<i64> {
        let inner = self.inner.lock();
        {
            let mut stmt = inner
                .conn
                .prepare_cached(sql)
                .map_err(|e| StoreError::from_sqlite(sql, e))?;
            stmt.execute(params_from_iter(params.iter()))
                .map_err(|e| StoreError::from_sqlite(sql, e))?;
        }
        Ok(inner.conn.last_insert_rowid())
    }

    fn auto_commit(&self) -> bool {
        self.inner.lock().auto_commit
    }

    fn set_auto_commit(&self, enabled: bool) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.auto_commit == enabled {
            return Ok(());
        }
        if enabled {
            if !inner.conn.is_autocommit() {
                inner.run("COMMIT")?;
            }
        } else {
            inner.run("BEGIN")?;
        }
        inner.auto_commit = enabled;
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let inner = self.inner.lock();
        if inner.auto_commit {
            return Ok(());
        }
        if !inner.conn.is_autocommit() {
            inner.run("COMMIT")?;
        }
        inner.run("BEGIN")
    }

    fn rollback(&self) -> StoreResult<()> {
        let inner = self.inner.lock();
        if inner.auto_commit {
            return Ok(());
        }
        if !inner.conn.is_autocommit() {
            inner.run("ROLLBACK")?;
        }
        inner.run("BEGIN")
    }
}
