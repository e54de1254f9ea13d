//! Column values and marshaling between Rust types and stored cells.
//!
//! `Value` mirrors the five SQLite storage classes. Adapters never bind Rust
//! values directly: they go through `ColumnValue`, which is implemented once
//! per element/key type.

use crate::error::{StoreError, StoreResult};

/// One stored cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Storage class name, used in decode errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Marshaling between a Rust type and a single column.
pub trait ColumnValue: Sized {
    /// Encode for binding as a statement parameter
    fn to_value(&self) -> Value;

    /// Decode a cell read back from the store
    fn from_value(value: Value) -> StoreResult<Self>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> StoreResult<T> {
    Err(StoreError::Decode { expected, found: found.kind() })
}

impl ColumnValue for Value {
    fn to_value(&self) -> Value { self.clone() }
    fn from_value(value: Value) -> StoreResult<Self> { Ok(value) }
}

impl ColumnValue for i64 {
    fn to_value(&self) -> Value { Value::Integer(*self) }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => mismatch("i64", &other),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl ColumnValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(*self as i64)
                }

                fn from_value(value: Value) -> StoreResult<Self> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(i).map_err(|_| StoreError::Decode {
                            expected: stringify!($ty),
                            found: "out-of-range integer",
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

narrow_integer!(i32, u32);

// u64 and usize can exceed i64::MAX: they saturate when encoded, and
// negative cells are rejected when decoded.
macro_rules! wide_unsigned {
    ($($ty:ty),*) => {
        $(
            impl ColumnValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::try_from(*self).unwrap_or(i64::MAX))
                }

                fn from_value(value: Value) -> StoreResult<Self> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(i).map_err(|_| StoreError::Decode {
                            expected: stringify!($ty),
                            found: "negative integer",
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

wide_unsigned!(u64, usize);

impl ColumnValue for bool {
    fn to_value(&self) -> Value { Value::Integer(i64::from(*self)) }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl ColumnValue for f64 {
    fn to_value(&self) -> Value { Value::Real(*self) }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Real(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl ColumnValue for String {
    fn to_value(&self) -> Value { Value::Text(self.clone()) }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("String", &other),
        }
    }
}

impl ColumnValue for Vec<u8> {
    fn to_value(&self) -> Value { Value::Blob(self.clone()) }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

/// `None` is stored as NULL.
impl<T: ColumnValue> ColumnValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for Value {
    fn from(cell: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match cell {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
