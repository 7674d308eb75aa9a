//! Database struct definition — the core data structure

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::metadata::Catalog;
use crate::engine::persistence;
use crate::error::{RelError, RelResult};
use crate::index::BTree;
use crate::table::Table;
use crate::value::Value;

/// A relational database: a catalog of tables, their row storage, and any
/// B-tree indexes built over their primary keys.
///
/// # Example
///
/// ```no_run
/// use relbase_core::engine::Database;
///
/// # fn main() -> relbase_core::error::RelResult<()> {
/// let mut db = Database::create("dbdata", "school")?;
/// db.create_table("department", vec!["name".into(), "building".into()], vec!["str".into(), "str".into()], Vec::new(), Some(0))?;
/// db.insert_into("department", &["Biology".into(), "Watson".into()])?;
/// let rows = db.select("*", "department", None)?;
/// assert_eq!(rows.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Database {
    pub name: String,
    pub(crate) dir: PathBuf,
    pub(crate) catalog: Catalog,
    pub(crate) tables: HashMap<String, Table>,
    pub(crate) indexes: HashMap<String, BTree<Value>>,
}

impl Database {
    /// Creates a fresh, empty database directory. Fails if one already exists
    /// at that path so an accidental `create` cannot clobber existing data.
    pub fn create(base_dir: impl AsRef<Path>, name: &str) -> RelResult<Self> {
        let dir = persistence::database_dir(base_dir.as_ref(), name);
        if dir.exists() {
            return Err(RelError::Serialization(format!(
                "database directory already exists: {}",
                dir.display()
            )));
        }
        let db = Database {
            name: name.to_string(),
            dir,
            catalog: Catalog::new(),
            tables: HashMap::new(),
            indexes: HashMap::new(),
        };
        db.save()?;
        debug!(database = %db.name, "created database");
        Ok(db)
    }

    /// Opens a previously created database directory.
    pub fn open(base_dir: impl AsRef<Path>, name: &str) -> RelResult<Self> {
        let dir = persistence::database_dir(base_dir.as_ref(), name);
        let (catalog, tables, indexes) = persistence::load_database(&dir)?;
        debug!(database = %name, tables = tables.len(), "opened database");
        Ok(Database { name: name.to_string(), dir, catalog, tables, indexes })
    }

    pub(crate) fn save(&self) -> RelResult<()> {
        persistence::save_database(&self.dir, &self.catalog, &self.tables, &self.indexes)
    }

    /// Rewrites the whole database to disk (spec §4.4 statement surface
    /// `save_database`). Every mutating statement already calls this
    /// internally as the last step of its canonical envelope; exposed
    /// directly for callers that want to force a checkpoint.
    pub fn save_database(&self) -> RelResult<()> {
        self.save()
    }

    /// Reloads a database directory from disk into a fresh in-memory
    /// `Database` (spec §4.4 statement surface `load_database`, spec §8
    /// round-trip property: `save_database` then `load_database` yields an
    /// equal database).
    pub fn load_database(base_dir: impl AsRef<Path>, name: &str) -> RelResult<Self> {
        Self::open(base_dir, name)
    }

    /// Re-reads lock state from disk so a lock another process just acquired
    /// is visible before this statement proceeds (spec §5).
    pub(crate) fn reload_locks(&mut self) -> RelResult<()> {
        let fresh = persistence::read_catalog(&self.dir)?;
        self.catalog.locks = fresh.locks;
        Ok(())
    }

    pub(crate) fn table(&self, name: &str) -> RelResult<&Table> {
        self.tables.get(name).ok_or_else(|| RelError::UnknownTable(name.to_string()))
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> RelResult<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| RelError::UnknownTable(name.to_string()))
    }
}
