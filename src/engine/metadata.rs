//! The database's meta-catalog: table registry, per-table locks, registered
//! indexes and free-slot stacks (spec §4.4).
//!
//! Earlier designs modeled the catalog itself as "just another table" with
//! `meta_*` rows. That collapses two different shapes (a schema registry and
//! a generic row store) into one, so here the catalog is its own struct;
//! [`Catalog::as_table`] projects any one of its aspects into a read-only
//! [`crate::table::Table`] view on demand, which is all external callers of
//! `select('*', "meta_locks", ...)` actually need (spec §9 redesign note).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{RelError, RelResult};
use crate::table::{RowSlot, Table};
use crate::value::{ColumnType, Value};

/// One registered index: which table and column it accelerates lookups on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub table: String,
    pub column: String,
}

/// The names of the four virtual catalog tables external callers may select
/// from, matching the original system's `meta_*` table names (spec §6).
pub const META_LENGTH: &str = "meta_length";
pub const META_LOCKS: &str = "meta_locks";
pub const META_INDEXES: &str = "meta_indexes";
pub const META_INSERT_STACK: &str = "meta_insert_stack";

/// The database's catalog: which tables exist, whether each is locked, which
/// indexes are registered, and each table's free-slot stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Table names in creation order, so catalog listings are deterministic.
    pub table_names: Vec<String>,
    pub locks: HashMap<String, bool>,
    pub indexes: HashMap<String, IndexEntry>,
    pub free_positions: HashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn register_table(&mut self, name: &str) {
        if !self.table_names.contains(&name.to_string()) {
            self.table_names.push(name.to_string());
        }
        self.locks.entry(name.to_string()).or_insert(false);
        self.free_positions.entry(name.to_string()).or_default();
    }

    pub fn drop_table(&mut self, name: &str) {
        self.table_names.retain(|t| t != name);
        self.locks.remove(name);
        self.free_positions.remove(name);
        self.indexes.retain(|_, entry| entry.table != name);
    }

    /// Re-reads the lock state for `table` (spec §5: "locks are re-checked
    /// fresh at the start of every statement, never cached across calls").
    pub fn is_locked(&self, table: &str) -> bool {
        *self.locks.get(table).unwrap_or(&false)
    }

    pub fn lock(&mut self, table: &str) {
        self.locks.insert(table.to_string(), true);
    }

    pub fn unlock(&mut self, table: &str) {
        self.locks.insert(table.to_string(), false);
    }

    pub fn register_index(&mut self, index_name: &str, table: &str, column: &str) -> RelResult<()> {
        if self.indexes.contains_key(index_name) {
            return Err(RelError::DuplicateIndex(index_name.to_string()));
        }
        self.indexes.insert(
            index_name.to_string(),
            IndexEntry { table: table.to_string(), column: column.to_string() },
        );
        Ok(())
    }

    pub fn index_for_table(&self, table: &str) -> Option<(&String, &IndexEntry)> {
        self.indexes.iter().find(|(_, entry)| entry.table == table)
    }

    pub fn free_positions_for(&self, table: &str) -> &[usize] {
        self.free_positions.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn free_positions_mut(&mut self, table: &str) -> &mut Vec<usize> {
        self.free_positions.entry(table.to_string()).or_default()
    }

    /// Projects one of the four virtual catalog tables into a read-only
    /// [`Table`] so it can flow through the same `select`/`show` paths as any
    /// ordinary table (spec §6).
    ///
    /// `tables` supplies live row counts for `meta_length`; it is otherwise
    /// unused.
    pub fn as_table(&self, name: &str, tables: &HashMap<String, Table>) -> RelResult<Table> {
        match name {
            META_LENGTH => {
                let mut t = Table::new(
                    META_LENGTH,
                    vec!["table_name".into(), "no_of_rows".into()],
                    vec![ColumnType::Str, ColumnType::Int],
                    None,
                );
                for table_name in &self.table_names {
                    let len = tables.get(table_name).map(Table::live_row_count).unwrap_or(0);
                    t.rows.push(RowSlot::Live(vec![
                        Value::Str(table_name.clone()),
                        Value::Int(len as i64),
                    ]));
                }
                Ok(t)
            }
            META_LOCKS => {
                let mut t = Table::new(
                    META_LOCKS,
                    vec!["table_name".into(), "locked".into()],
                    vec![ColumnType::Str, ColumnType::Bool],
                    None,
                );
                for table_name in &self.table_names {
                    t.rows.push(RowSlot::Live(vec![
                        Value::Str(table_name.clone()),
                        Value::Bool(self.is_locked(table_name)),
                    ]));
                }
                Ok(t)
            }
            META_INDEXES => {
                let mut t = Table::new(
                    META_INDEXES,
                    vec!["table_name".into(), "index_name".into()],
                    vec![ColumnType::Str, ColumnType::Str],
                    None,
                );
                for (index_name, entry) in &self.indexes {
                    t.rows.push(RowSlot::Live(vec![
                        Value::Str(entry.table.clone()),
                        Value::Str(index_name.clone()),
                    ]));
                }
                Ok(t)
            }
            META_INSERT_STACK => {
                let mut t = Table::new(
                    META_INSERT_STACK,
                    vec!["table_name".into(), "indexes".into()],
                    vec![ColumnType::Str, ColumnType::List],
                    None,
                );
                for table_name in &self.table_names {
                    let positions = self.free_positions_for(table_name);
                    let list = positions.iter().map(|p| Value::Int(*p as i64)).collect();
                    t.rows.push(RowSlot::Live(vec![Value::Str(table_name.clone()), Value::List(list)]));
                }
                Ok(t)
            }
            other => Err(RelError::UnknownTable(other.to_string())),
        }
    }

    pub fn is_meta_table(name: &str) -> bool {
        matches!(name, META_LENGTH | META_LOCKS | META_INDEXES | META_INSERT_STACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_drop_table() {
        let mut cat = Catalog::new();
        cat.register_table("students");
        assert!(cat.table_names.contains(&"students".to_string()));
        assert!(!cat.is_locked("students"));
        cat.drop_table("students");
        assert!(cat.table_names.is_empty());
    }

    #[test]
    fn lock_roundtrip() {
        let mut cat = Catalog::new();
        cat.register_table("students");
        cat.lock("students");
        assert!(cat.is_locked("students"));
        cat.unlock("students");
        assert!(!cat.is_locked("students"));
    }

    #[test]
    fn duplicate_index_rejected() {
        let mut cat = Catalog::new();
        cat.register_table("students");
        cat.register_index("idx_students_id", "students", "id").unwrap();
        let err = cat.register_index("idx_students_id", "students", "id");
        assert!(matches!(err, Err(RelError::DuplicateIndex(_))));
    }

    #[test]
    fn meta_locks_projects_every_table() {
        let mut cat = Catalog::new();
        cat.register_table("students");
        cat.register_table("department");
        cat.lock("department");
        let tables = HashMap::new();
        let projected = cat.as_table(META_LOCKS, &tables).unwrap();
        let rows = projected.select_where(None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r[0] == Value::Str("department".into()) && r[1] == Value::Bool(true)));
    }
}
