//! RowStore Core: the relational collaborator behind collection adapters
//!
//! Adapters that present lists and maps over relational tables need exactly
//! one thing from their environment: a store that runs parameterized
//! statements and lets them group statements into one commit.
//!
//! # Architecture
//!
//! - **`RowStore`**: query / execute / insert plus auto-commit control
//! - **`SqliteStore`**: the rusqlite-backed implementation
//! - **`Batch`**: suspends auto-commit around bulk mutations, rolls back if abandoned
//! - **`ColumnValue`**: marshaling between Rust types and stored cells
//!
//! # No Schema Management
//!
//! Nothing in this crate creates or migrates tables. Owners of a store set up
//! their schema before handing the store to adapters.

pub mod batch;
pub mod config;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod value;

// Re-export key types for convenience
pub use batch::{batched, Batch};
pub use config::{JournalMode, StoreConfig, SyncLevel};
pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use store::{Row, RowStore};
pub use value::{ColumnValue, Value};
