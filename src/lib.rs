//! # relbase-core — a file-backed relational query/storage engine
//!
//! `relbase-core` persists named tables to disk, answers a fixed set of
//! relational operations against them (selection, projection, update,
//! delete, sort, join), and accelerates primary-key lookups with an on-disk
//! B-tree index.
//!
//! ## Quick start
//!
//! ```no_run
//! use relbase_core::engine::Database;
//!
//! # fn main() -> relbase_core::error::RelResult<()> {
//! let mut db = Database::create("dbdata", "school")?;
//! db.create_table(
//!     "department",
//!     vec!["name".into(), "building".into()],
//!     vec!["str".into(), "str".into()],
//!     Vec::new(),
//!     Some(0),
//! )?;
//! db.insert_into("department", &["Biology".into(), "Watson".into()])?;
//! let rows = db.select("*", "department", None)?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module structure
//! - [`value`] — the five atomic column types and the runtime `Value`.
//! - [`condition`] — the shared `operand operator operand` grammar parser.
//! - [`table`] — the typed column schema, row store, and join algorithms.
//! - [`index`] — the arena-allocated B-tree primary-key index.
//! - [`engine`] — the `Database` catalog, locking, and statement surface.
//! - [`csv`] — CSV import/export, an external collaborator per the spec.
//! - [`pretty`] — table pretty-printing, an external collaborator.
//! - [`error`] — the unified `RelError`/`RelResult` types.
//! - [`logging`] — `tracing` subscriber setup, gated behind the `logging` feature.

pub mod condition;
pub mod csv;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod pretty;
pub mod table;
pub mod value;

pub use engine::Database;
pub use error::{RelError, RelResult};
pub use table::Table;
pub use value::{ColumnType, Value};
