//! Collection adapters over a relational Row Store
//!
//! Presents familiar ordered-collection contracts while every element lives
//! in a table reached only through parameterized statements.
//!
//! # Architecture
//!
//! Tables have no notion of "list position" or "in-memory set", so each
//! adapter carries that contract itself:
//! - [`RowList`] keeps a dense per-partition index column `[0, len)` and
//!   shifts it with bulk arithmetic updates on insert and remove
//! - [`RowMap`] maps keys to values with adapter-enforced key uniqueness
//! - [`IdMap`] generates keys for values and navigates duplicate values in
//!   key order ([`RowKeyMap`])
//! - [`DomainCache`] serves a fixed, sorted key domain and materializes each
//!   value once, on first access
//! - [`SnapshotIter`] iterates a point-in-time copy and pushes removals back
//!   to the live table
//!
//! Multi-row mutations are grouped with [`rowstore_core::Batch`]. All
//! check-then-act sequences assume a single writer per store.

pub mod domain;
pub mod keygen;
pub mod list;
pub mod map;
pub mod snapshot;
pub mod table;

pub use domain::{DomainCache, DomainRange, Materialize, RowLookup};
pub use keygen::{Duplicates, IdMap, KeySetFor, KeySetIter, KeyUsage, RowKeyMap};
pub use list::{ListReferences, RowList};
pub use map::RowMap;
pub use snapshot::{LiveRemover, SnapshotIter};
pub use table::{ListTable, MapTable, Nav};

use rowstore_core::StoreResult;
use tracing::warn;

/// Unwrap a convenience-operation result, logging and substituting
/// `fallback` when the store failed.
pub(crate) fn or_degrade<T>(operation: &'static str, result: StoreResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(operation, error = %err, "store error in convenience operation, degrading");
            fallback
        }
    }
}
