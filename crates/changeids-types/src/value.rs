//! Column values carried by change-set records.

use serde::{Deserialize, Serialize};

/// A SQLite storage-class value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqliteValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqliteValue {
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

/// One column slot of a change-set record.
///
/// `None` marks columns the record does not carry: unchanged columns of
/// an UPDATE, and non-key columns of a patchset DELETE.
pub type ColumnValue = Option<SqliteValue>;
