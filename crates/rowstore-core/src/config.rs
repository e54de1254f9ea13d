//! Configuration management for the SQLite Row Store
//!
//! Provides durability presets for different workloads
//! and validation for custom configurations.

use std::time::Duration;

/// SQLite journal mode applied when a connection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal deleted at the end of each transaction
    Delete,
    /// Write-ahead log; readers do not block the writer
    Wal,
    /// Journal kept in RAM; a crash mid-transaction may corrupt the file
    Memory,
}

impl JournalMode {
    pub(crate) fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// SQLite `synchronous` level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLevel {
    /// No fsync; fastest, not crash-safe
    Off,
    /// fsync at critical moments only
    Normal,
    /// fsync on every commit
    Full,
}

impl SyncLevel {
    pub(crate) fn as_pragma(&self) -> &'static str {
        match self {
            SyncLevel::Off => "OFF",
            SyncLevel::Normal => "NORMAL",
            SyncLevel::Full => "FULL",
        }
    }
}

/// Row Store configuration with durability presets
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Journal mode for file-backed databases
    pub journal_mode: JournalMode,
    /// Commit durability
    pub sync_level: SyncLevel,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Number of prepared statements kept per connection
    pub statement_cache_capacity: usize,
}

impl StoreConfig {
    /// Durable: WAL journal, fsync on every commit
    pub fn durable() -> Self {
        Self {
            journal_mode: JournalMode::Wal,
            sync_level: SyncLevel::Full,
            busy_timeout: Duration::from_secs(5),
            statement_cache_capacity: 64,
        }
    }

    /// Fast: WAL journal, fsync only at checkpoints
    pub fn fast() -> Self {
        Self {
            journal_mode: JournalMode::Wal,
            sync_level: SyncLevel::Normal,
            busy_timeout: Duration::from_secs(5),
            statement_cache_capacity: 128,
        }
    }

    /// Memory: scratch databases and tests
    pub fn memory() -> Self {
        Self {
            journal_mode: JournalMode::Memory,
            sync_level: SyncLevel::Off,
            busy_timeout: Duration::from_millis(500),
            statement_cache_capacity: 64,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.busy_timeout.as_millis() == 0 {
            return Err("busy_timeout must be > 0".into());
        }
        if self.statement_cache_capacity == 0 || self.statement_cache_capacity > 4096 {
            return Err("statement_cache_capacity must be in [1, 4096]".into());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self { Self::durable() }
}
