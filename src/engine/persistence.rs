//! On-disk layout and (de)serialization for a database directory
//! (spec §4.2 "Serialization", §6 "External Interfaces").
//!
//! Each database lives under `<base_dir>/<name>_db/`:
//!
//! ```text
//! <name>_db/
//!   catalog.bin                        — the Catalog (bincode)
//!   <table_name>.bin                   — one Table each (bincode)
//!   indexes/meta_<index_name>_index.bin — one BTree<Value> each (bincode)
//! ```
//!
//! Every table and index round-trips as one opaque bincode blob; there is no
//! partial/streaming read, matching the original system's pickle-the-whole-
//! object persistence model (spec §4.2).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use crate::engine::metadata::Catalog;
use crate::error::RelResult;
use crate::index::BTree;
use crate::table::Table;
use crate::value::Value;

/// Resolves the directory a database named `name` lives in under `base_dir`.
pub fn database_dir(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{name}_db"))
}

fn catalog_path(dir: &Path) -> PathBuf {
    dir.join("catalog.bin")
}

fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.bin"))
}

fn index_path(dir: &Path, index: &str) -> PathBuf {
    dir.join("indexes").join(format!("meta_{index}_index.bin"))
}

fn write_blob<T: Serialize>(path: &Path, value: &T) -> RelResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(value)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> RelResult<T> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Persists the full database: catalog, every table, and every registered
/// index, overwriting whatever was previously on disk (spec §4.4 "rewrite all
/// table files on every mutating statement").
pub fn save_database(
    dir: &Path,
    catalog: &Catalog,
    tables: &HashMap<String, Table>,
    indexes: &HashMap<String, BTree<Value>>,
) -> RelResult<()> {
    fs::create_dir_all(dir)?;
    fs::create_dir_all(dir.join("indexes"))?;
    write_blob(&catalog_path(dir), catalog)?;
    for (name, table) in tables {
        write_blob(&table_path(dir, name), table)?;
    }
    for (name, index) in indexes {
        write_blob(&index_path(dir, name), index)?;
    }
    Ok(())
}

/// Loads a previously saved database directory back into memory.
pub fn load_database(
    dir: &Path,
) -> RelResult<(Catalog, HashMap<String, Table>, HashMap<String, BTree<Value>>)> {
    let catalog: Catalog = read_blob(&catalog_path(dir))?;

    let mut tables = HashMap::new();
    for table_name in &catalog.table_names {
        let table: Table = read_blob(&table_path(dir, table_name))?;
        tables.insert(table_name.clone(), table);
    }

    let mut indexes = HashMap::new();
    for index_name in catalog.indexes.keys() {
        let index: BTree<Value> = read_blob(&index_path(dir, index_name))?;
        indexes.insert(index_name.clone(), index);
    }

    Ok((catalog, tables, indexes))
}

/// Re-reads only the catalog's lock state from disk, without loading any
/// table or index data — used by `is_locked` so a lock held by another
/// process is observed immediately (spec §5 "locks are re-checked fresh").
pub fn read_catalog(dir: &Path) -> RelResult<Catalog> {
    read_blob(&catalog_path(dir))
}

pub fn write_catalog(dir: &Path, catalog: &Catalog) -> RelResult<()> {
    write_blob(&catalog_path(dir), catalog)
}

/// Removes a dropped table's on-disk file, if any (spec §3 "Lifecycle":
/// `drop_table` ... deletes its on-disk file).
pub fn delete_table_file(dir: &Path, table: &str) -> RelResult<()> {
    remove_if_exists(&table_path(dir, table))
}

/// Removes a dropped index's on-disk file (spec §9: `drop_table` cascades to
/// remove any B-tree index associated with the table).
pub fn delete_index_file(dir: &Path, index: &str) -> RelResult<()> {
    remove_if_exists(&index_path(dir, index))
}

fn remove_if_exists(path: &Path) -> RelResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
