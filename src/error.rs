//! Error types for the relational engine.
//!
//! All public APIs return `RelResult<T>` — no panics in library code.

use crate::value::ColumnType;
use thiserror::Error;

/// Unified error type for all engine operations.
#[derive(Debug, Error)]
pub enum RelError {
    /// A condition string did not match the `operand operator operand` grammar.
    #[error("malformed condition: {0}")]
    MalformedCondition(String),

    /// Requested table does not exist in the database's catalog.
    #[error("table '{0}' not found")]
    UnknownTable(String),

    /// Requested column does not exist in a table's schema.
    #[error("column '{0}' not found")]
    UnknownColumn(String),

    /// Requested index name has no entry in `meta_indexes`.
    #[error("index '{0}' not found")]
    UnknownIndex(String),

    /// A literal could not be coerced to a column's declared type.
    #[error("cannot coerce '{value}' to {target:?}")]
    TypeCoercion { value: String, target: ColumnType },

    /// Insert/update would introduce a duplicate or null primary-key value.
    #[error("primary key violation on table '{table}': duplicate key '{key}'")]
    PrimaryKeyViolation { table: String, key: String },

    /// `create_index` was called with a name already registered.
    #[error("index '{0}' already exists")]
    DuplicateIndex(String),

    /// `create_index` was called on a table with no primary key.
    #[error("table '{0}' has no primary key to index")]
    NoPrimaryKey(String),

    /// `join` was called with a mode other than `inner`.
    #[error("unsupported join mode: {0}")]
    UnsupportedJoinMode(String),

    /// Standard I/O error (reading/writing table or index files).
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Table/index (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// CSV import/export failure.
    #[error("csv error: {0}")]
    Csv(String),
}

/// Result type alias for all engine operations.
pub type RelResult<T> = Result<T, RelError>;

impl From<Box<bincode::ErrorKind>> for RelError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        RelError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for RelError {
    fn from(err: csv::Error) -> Self {
        RelError::Csv(err.to_string())
    }
}
