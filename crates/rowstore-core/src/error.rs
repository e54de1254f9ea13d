//! Error types for Row Store operations
//!
//! Every adapter operation reports failures through the `StoreError` enum.
//! Failures reported by the store itself are re-signaled as `Access` (or the
//! more specific `Constraint`) carrying the original cause, so callers that
//! only think in sequence/map terms never handle driver error types.

use std::error::Error;

use thiserror::Error;

/// Boxed driver error kept as the cause of a store failure.
pub type Cause = Box<dyn Error + Send + Sync + 'static>;

/// Row Store error types with detailed context
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Row Store failed while reading or writing
    #[error("store access failed during {operation}: {source}")]
    Access {
        /// What the adapter was doing when the store failed
        operation: String,
        /// The underlying driver error
        #[source]
        source: Cause,
    },

    /// The Row Store rejected a write because of a uniqueness or
    /// referential-integrity rule
    #[error("constraint violated during {operation}: {source}")]
    Constraint {
        /// What the adapter was doing when the constraint fired
        operation: String,
        /// The underlying driver error, or an adapter-level description
        #[source]
        source: Cause,
    },

    /// The adapter variant does not implement this operation
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Index outside the valid range for the sequence
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds {
        /// Requested index
        index: usize,
        /// Length the index was checked against
        len: usize,
    },

    /// Caller passed an argument the adapter cannot act on
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description
        reason: String,
    },

    /// A stored value did not have the shape the adapter expected
    #[error("cannot decode {found} as {expected}")]
    Decode {
        /// Rust type the column was decoded into
        expected: &'static str,
        /// Storage class actually found
        found: &'static str,
    },
}

impl StoreError {
    /// Build a `Constraint` error raised by adapter logic rather than the store.
    pub fn constraint(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        StoreError::Constraint {
            operation: operation.into(),
            source: reason.into(),
        }
    }

    /// Build an `InvalidArgument` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        StoreError::InvalidArgument { reason: reason.into() }
    }

    /// True for failures reported by the store, constraint violations included.
    pub fn is_access(&self) -> bool {
        matches!(self, StoreError::Access { .. } | StoreError::Constraint { .. })
    }

    /// True only for uniqueness / referential-integrity violations.
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }

    /// Map a rusqlite failure onto the error taxonomy.
    ///
    /// `SQLITE_CONSTRAINT` and its extended codes become `Constraint`,
    /// everything else becomes `Access`.
    pub fn from_sqlite(operation: impl Into<String>, err: rusqlite::Error) -> Self {
        let operation = operation.into();
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint { operation, source: Box::new(err) }
            }
            _ => StoreError::Access { operation, source: Box::new(err) },
        }
    }
}

/// Result type alias for Row Store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::OutOfBounds { index: 7, len: 3 };
        let display = format!("{}", err);
        assert!(display.contains("index 7"));
        assert!(display.contains("length 3"));
    }

    #[test]
    fn test_constraint_is_access() {
        let err = StoreError::constraint("insert", "duplicate value");
        assert!(err.is_access());
        assert!(err.is_constraint());
        assert!(err.source().is_some());

        let err = StoreError::Unsupported { operation: "remove" };
        assert!(!err.is_access());
    }

    #[test]
    fn test_sqlite_error_mapping() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k INTEGER PRIMARY KEY)").unwrap();
        conn.execute("INSERT INTO t (k) VALUES (1)", []).unwrap();

        let err = conn.execute("INSERT INTO t (k) VALUES (1)", []).unwrap_err();
        assert!(StoreError::from_sqlite("insert", err).is_constraint());

        let err = conn.execute("SELECT * FROM missing", []).unwrap_err();
        let mapped = StoreError::from_sqlite("select", err);
        assert!(mapped.is_access());
        assert!(!mapped.is_constraint());
    }
}
