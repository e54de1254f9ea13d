//! The Row Store collaborator contract.
//!
//! Adapters never own a connection: they are handed a shared `RowStore`
//! and talk to it exclusively through parameterized statements. The store
//! is assumed to serve one writer at a time; nothing here makes a sequence
//! of calls atomic unless it runs inside a [`Batch`](crate::Batch).

use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::value::{ColumnValue, Value};

/// One result row, cells in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    /// Decode the cell at `index` into `T`.
    pub fn get<T: ColumnValue>(&self, index: usize) -> StoreResult<T> {
        match self.cells.get(index) {
            Some(cell) => T::from_value(cell.clone()),
            None => Err(StoreError::invalid(format!(
                "column {} requested from a row of {} columns",
                index,
                self.cells.len()
            ))),
        }
    }

    /// Move the cells out, decoding the first one.
    pub fn into_first<T: ColumnValue>(self) -> StoreResult<T> {
        match self.cells.into_iter().next() {
            Some(cell) => T::from_value(cell),
            None => Err(StoreError::invalid("empty row")),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Parameterized access to a relational store.
///
/// Implementations prepare (and may cache) each statement text, bind
/// `params` positionally to `?` placeholders, and report failures as
/// `StoreError::Access` or `StoreError::Constraint`.
pub trait RowStore {
    /// Run a query and collect every result row.
    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>>;

    /// Run an update and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize>;

    /// Run an insert and return the identifier the store assigned to the row.
    fn insert(&self, sql: &str, params: &[Value]) -> StoreResult<i64>;

    /// Whether every statement currently commits on its own.
    fn auto_commit(&self) -> bool;

    /// Switch statement-level commits on or off.
    ///
    /// Switching off opens a transaction; switching back on commits it.
    fn set_auto_commit(&self, enabled: bool) -> StoreResult<()>;

    /// Commit pending work. No-op while auto-commit is on.
    fn commit(&self) -> StoreResult<()>;

    /// Discard pending work. No-op while auto-commit is on.
    fn rollback(&self) -> StoreResult<()>;

    /// First row of a query, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> StoreResult<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// First column of the first row, if any row came back.
    fn query_scalar<T: ColumnValue>(&self, sql: &str, params: &[Value]) -> StoreResult<Option<T>>
    where
        Self: Sized,
    {
        match self.query_one(sql, params)? {
            Some(row) => row.into_first().map(Some),
            None => Ok(None),
        }
    }
}

impl<S: RowStore + ?Sized> RowStore for Arc<S> {
    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        (**self).execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> StoreResult<i64> {
        (**self).insert(sql, params)
    }

    fn auto_commit(&self) -> bool {
        (**self).auto_commit()
    }

    fn set_auto_commit(&self, enabled: bool) -> StoreResult<()> {
        (**self).set_auto_commit(enabled)
    }

    fn commit(&self) -> StoreResult<()> {
        (**self).commit()
    }

    fn rollback(&self) -> StoreResult<()> {
        (**self).rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get() {
        let row = Row::new(vec![Value::Integer(3), Value::Text("a".into())]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get::<i64>(0).unwrap(), 3);
        assert_eq!(row.get::<String>(1).unwrap(), "a");
        assert!(row.get::<i64>(2).is_err());
    }

    #[test]
    fn test_row_into_first() {
        let row = Row::new(vec![Value::Null]);
        assert_eq!(row.into_first::<Option<i64>>().unwrap(), None);
        assert!(Row::new(vec![]).into_first::<i64>().is_err());
    }
}
