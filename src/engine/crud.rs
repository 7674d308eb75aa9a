//! Database CRUD Operations — the full statement surface (spec §4.4, §6).
//!
//! Every mutating statement follows the same envelope: reload lock state from
//! disk, bail out silently if the target table is locked, otherwise perform
//! the mutation, refresh the in-memory catalog projection, and rewrite the
//! whole database to disk. This mirrors the original system's
//! read-lock-then-pickle-everything cycle (spec §5, §9).

use tracing::{debug, warn};

use crate::engine::Database;
use crate::engine::metadata::{self, Catalog};
use crate::engine::persistence;
use crate::error::{RelError, RelResult};
use crate::index::BTree;
use crate::table::join::{self, Condition2, JoinMethod};
use crate::table::{RowSlot, Table};
use crate::value::{ColumnType, Value};

impl Database {
    // ════════════════════════════════════════════
    // Schema operations
    // ════════════════════════════════════════════

    /// Registers a new table with the given columns and, optionally, a
    /// primary key column index (spec §4.1 "create_table").
    ///
    /// `column_extras` may be shorter than `column_names` (padded with blank
    /// annotations) or empty (every column gets a blank annotation); it is
    /// never interpreted by the core (spec §3 "column_extras").
    pub fn create_table(
        &mut self,
        name: &str,
        column_names: Vec<String>,
        column_type_names: Vec<String>,
        column_extras: Vec<String>,
        primary_key: Option<usize>,
    ) -> RelResult<()> {
        self.reload_locks()?;
        let column_types = column_type_names
            .iter()
            .map(|s| ColumnType::parse(s))
            .collect::<RelResult<Vec<_>>>()?;
        let mut extras = column_extras;
        extras.resize(column_names.len(), String::new());
        let table = Table::with_extras(name, column_names, column_types, extras, primary_key);
        self.tables.insert(name.to_string(), table);
        self.catalog.register_table(name);
        self.save()?;
        debug!(table = name, "created table");
        Ok(())
    }

    /// Drops a table, its free-slot stack entry, its on-disk file, and any
    /// index registered on it, cascading the index's own on-disk file too
    /// (spec §4.1 "drop_table", spec §9 cascading-removal resolution).
    pub fn drop_table(&mut self, name: &str) -> RelResult<()> {
        self.reload_locks()?;
        if self.catalog.is_locked(name) {
            warn!(table = name, "drop_table skipped: table is locked");
            return Ok(());
        }
        self.tables.remove(name);
        let dropped_indexes: Vec<String> = self
            .catalog
            .indexes
            .iter()
            .filter(|(_, entry)| entry.table == name)
            .map(|(index_name, _)| index_name.clone())
            .collect();
        for index_name in &dropped_indexes {
            self.indexes.remove(index_name);
            persistence::delete_index_file(&self.dir, index_name)?;
        }
        self.catalog.drop_table(name);
        persistence::delete_table_file(&self.dir, name)?;
        self.save()?;
        debug!(table = name, "dropped table");
        Ok(())
    }

    // ════════════════════════════════════════════
    // Row mutation
    // ════════════════════════════════════════════

    /// Inserts one row of raw textual values into `table`, maintaining any
    /// index registered on its primary key (spec §4.1, §4.2).
    pub fn insert_into(&mut self, table: &str, raw_values: &[String]) -> RelResult<()> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "insert_into skipped: table is locked");
            return Ok(());
        }
        let mut free = std::mem::take(self.catalog.free_positions_mut(table));
        let position = {
            let t = self.table_mut(table)?;
            t.insert(raw_values, &mut free)
        };
        *self.catalog.free_positions_mut(table) = free;

        let position = position?;

        if let Some((index_name, entry)) = self.catalog.index_for_table(table) {
            let index_name = index_name.clone();
            let column = entry.column.clone();
            let t = self.table(table)?;
            let col_idx = t.column_index(&column)?;
            if let RowSlot::Live(values) = &t.rows[position] {
                let key = values[col_idx].clone();
                self.indexes.entry(index_name).or_insert_with(BTree::new).insert(key, position);
            }
        }

        self.save()?;
        debug!(table, position, "inserted row");
        Ok(())
    }

    /// Updates every row matching `condition_raw` in `table`, setting each
    /// named column to the paired literal (spec §4.1 "update").
    pub fn update_table(
        &mut self,
        table: &str,
        condition_raw: &str,
        assignments: &[(String, String)],
    ) -> RelResult<usize> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "update_table skipped: table is locked");
            return Ok(0);
        }
        let updated = self.table_mut(table)?.update_where(condition_raw, assignments)?;
        if updated > 0 {
            self.rebuild_index_if_present(table)?;
            self.save()?;
        }
        debug!(table, updated, "updated rows");
        Ok(updated)
    }

    /// Deletes every row matching `condition_raw` in `table`, pushing freed
    /// positions onto its free-slot stack (spec §4.1 "delete").
    pub fn delete_from(&mut self, table: &str, condition_raw: &str) -> RelResult<usize> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "delete_from skipped: table is locked");
            return Ok(0);
        }
        let mut free = std::mem::take(self.catalog.free_positions_mut(table));
        let deleted = {
            let t = self.table_mut(table)?;
            t.delete_where(condition_raw, &mut free)
        };
        *self.catalog.free_positions_mut(table) = free;
        let deleted = deleted?;
        if deleted > 0 {
            self.rebuild_index_if_present(table)?;
            self.save()?;
        }
        debug!(table, deleted, "deleted rows");
        Ok(deleted)
    }

    /// Re-coerces every live value in `column` of `table` to `target_type`
    /// (spec §4.1 "cast").
    pub fn cast(&mut self, table: &str, column: &str, target_type: &str) -> RelResult<()> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "cast skipped: table is locked");
            return Ok(());
        }
        let target = ColumnType::parse(target_type)?;
        self.table_mut(table)?.cast_column(column, target)?;
        self.save()?;
        Ok(())
    }

    /// Rebuilds a table's index from scratch against its current rows.
    /// Indexes are only rebuilt incrementally on insert (spec §4.2); update
    /// and delete instead trigger a full rebuild since either may change or
    /// remove the indexed key out from under an existing entry.
    fn rebuild_index_if_present(&mut self, table: &str) -> RelResult<()> {
        let Some((index_name, entry)) = self.catalog.index_for_table(table) else {
            return Ok(());
        };
        let index_name = index_name.clone();
        let column = entry.column.clone();
        let t = self.table(table)?;
        let col_idx = t.column_index(&column)?;
        let mut fresh = BTree::new();
        for (pos, slot) in t.rows.iter().enumerate() {
            if let RowSlot::Live(values) = slot {
                fresh.insert(values[col_idx].clone(), pos);
            }
        }
        self.indexes.insert(index_name, fresh);
        Ok(())
    }

    // ════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════

    /// Selects rows from `table` (or a `meta_*` catalog projection), filtered
    /// by an optional condition. `columns` of `"*"` returns every column;
    /// otherwise only the named, comma-separated columns (spec §4.1 "select").
    pub fn select(
        &mut self,
        columns: &str,
        table: &str,
        condition_raw: Option<&str>,
    ) -> RelResult<Vec<Vec<Value>>> {
        self.select_full(columns, table, condition_raw, None, false, None)
    }

    /// Full `select_where(columns, condition, order_by, desc, top_k)` surface
    /// (spec §4.3). `order_by` sorts the filtered rows (by the *source*
    /// table's column, even if that column is not itself projected) before
    /// projection, stably, with nulls sorting last; `top_k` truncates the
    /// result afterward. `top_k = Some(0)` returns no rows.
    ///
    /// Read-only, but still follows the canonical envelope's reload/check-lock
    /// /acquire/release steps (spec §4.4: "select is read-only but still
    /// follows steps 1–3 and 7 so in-flight mutations elsewhere are
    /// respected"); meta-table projections are exempt, matching the rule that
    /// meta-tables are "never locked" (spec §3).
    pub fn select_full(
        &mut self,
        columns: &str,
        table: &str,
        condition_raw: Option<&str>,
        order_by: Option<&str>,
        desc: bool,
        top_k: Option<usize>,
    ) -> RelResult<Vec<Vec<Value>>> {
        let guarded = !Catalog::is_meta_table(table);
        if guarded {
            self.reload_locks()?;
            if self.catalog.is_locked(table) {
                warn!(table, "select skipped: table is locked");
                return Ok(Vec::new());
            }
            self.catalog.lock(table);
            persistence::write_catalog(&self.dir, &self.catalog)?;
        }

        let result = self.select_unguarded(columns, table, condition_raw, order_by, desc, top_k);

        if guarded {
            self.catalog.unlock(table);
            persistence::write_catalog(&self.dir, &self.catalog)?;
        }
        result
    }

    fn select_unguarded(
        &self,
        columns: &str,
        table: &str,
        condition_raw: Option<&str>,
        order_by: Option<&str>,
        desc: bool,
        top_k: Option<usize>,
    ) -> RelResult<Vec<Vec<Value>>> {
        let projected;
        let t: &Table = if Catalog::is_meta_table(table) {
            projected = self.catalog.as_table(table, &self.tables)?;
            &projected
        } else {
            self.table(table)?
        };

        let mut rows = t.select_where(condition_raw)?;
        if let Some(order_col) = order_by {
            let idx = t.column_index(order_col)?;
            rows.sort_by(|a, b| {
                let ord = a[idx].cmp(&b[idx]);
                if desc { ord.reverse() } else { ord }
            });
        }
        if let Some(k) = top_k {
            rows.truncate(k);
        }

        let col_indices: Vec<usize> = if columns.trim() == "*" {
            (0..t.column_names.len()).collect()
        } else {
            columns
                .split(',')
                .map(|c| t.column_index(c.trim()))
                .collect::<RelResult<_>>()?
        };

        Ok(rows
            .into_iter()
            .map(|row| col_indices.iter().map(|&i| row[i].clone()).collect())
            .collect())
    }

    /// Same as [`Database::select`], but answered via `table`'s registered
    /// index when `condition_raw` is an equality test on the indexed primary
    /// key, falling back to a linear scan otherwise (spec §4.2). Follows the
    /// same transient lock-acquire/release envelope as `select_full`.
    pub fn select_indexed(
        &mut self,
        table: &str,
        condition_raw: &str,
    ) -> RelResult<Option<Vec<Value>>> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "select_indexed skipped: table is locked");
            return Ok(None);
        }
        self.catalog.lock(table);
        persistence::write_catalog(&self.dir, &self.catalog)?;

        let result = self.select_indexed_unguarded(table, condition_raw);

        self.catalog.unlock(table);
        persistence::write_catalog(&self.dir, &self.catalog)?;
        result
    }

    fn select_indexed_unguarded(&self, table: &str, condition_raw: &str) -> RelResult<Option<Vec<Value>>> {
        let t = self.table(table)?;
        let Some((index_name, entry)) = self.catalog.index_for_table(table) else {
            let rows = t.select_where(Some(condition_raw))?;
            return Ok(rows.first().map(|r| r.to_vec()));
        };
        if entry.column != t.column_names[t.primary_key.ok_or_else(|| RelError::NoPrimaryKey(table.to_string()))?] {
            let rows = t.select_where(Some(condition_raw))?;
            return Ok(rows.first().map(|r| r.to_vec()));
        }
        let cond = crate::condition::parse(condition_raw)?;
        if cond.op != crate::condition::Op::Eq {
            let rows = t.select_where(Some(condition_raw))?;
            return Ok(rows.first().map(|r| r.to_vec()));
        }
        let pk_idx = t.primary_key.unwrap();
        let key = Value::coerce(&cond.right, t.column_types[pk_idx])?;
        let index = self.indexes.get(index_name).ok_or_else(|| RelError::UnknownIndex(index_name.clone()))?;
        Ok(t.select_by_indexed_pk(index, &key).map(|row| row.to_vec()))
    }

    /// Stably sorts `table`'s rows in place by `column`, persisting the new
    /// physical order and returning the sorted rows (spec §4.1 "sort": a
    /// mutating statement following the canonical envelope, not a read-only
    /// view).
    pub fn sort(&mut self, table: &str, column: &str, descending: bool) -> RelResult<Vec<Vec<Value>>> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "sort skipped: table is locked");
            return Ok(Vec::new());
        }
        self.catalog.lock(table);
        persistence::write_catalog(&self.dir, &self.catalog)?;

        let result = self.sort_unguarded(table, column, descending);

        self.catalog.unlock(table);
        persistence::write_catalog(&self.dir, &self.catalog)?;
        result
    }

    fn sort_unguarded(&mut self, table: &str, column: &str, descending: bool) -> RelResult<Vec<Vec<Value>>> {
        self.table_mut(table)?.sort_by(column, descending)?;

        // Sorting physically moves rows, so any position recorded elsewhere
        // (the free-slot stack, an index's stored row positions) is now
        // stale and has to be recomputed against the new order.
        let free = self
            .table(table)?
            .rows
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| matches!(slot, RowSlot::Tombstone).then_some(pos))
            .collect();
        *self.catalog.free_positions_mut(table) = free;
        self.rebuild_index_if_present(table)?;

        self.save()?;
        let rows = self.table(table)?.select_where(None)?.into_iter().map(|r| r.to_vec()).collect();
        Ok(rows)
    }

    /// Prints `table` to stdout as a formatted grid (spec §6 "show").
    pub fn show_table(&mut self, table: &str) -> RelResult<()> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "show_table skipped: table is locked");
            return Ok(());
        }
        let t = self.table(table)?;
        crate::pretty::print_table(t);
        Ok(())
    }

    // ════════════════════════════════════════════
    // Joins
    // ════════════════════════════════════════════

    /// Joins `left` and `right` on `condition_raw`, automatically selecting
    /// nested-loop, index-nested-loop, or sort-merge based on which side(s)
    /// are primary-key indexed (spec §4.3). `mode` must be `"inner"`; any
    /// other value fails with `UnsupportedJoinMode` (spec §7).
    ///
    /// Reloads and checks locks on both tables before running, like every
    /// other statement — a join against a locked table is a silent no-op
    /// (spec §5), matching the original system's `join` (`if
    /// self.is_locked(left_table) or self.is_locked(right_table): ... return`).
    pub fn join(
        &mut self,
        mode: &str,
        left: &str,
        right: &str,
        condition_raw: &str,
    ) -> RelResult<(JoinMethod, Vec<Vec<Value>>)> {
        if mode != "inner" {
            return Err(RelError::UnsupportedJoinMode(mode.to_string()));
        }
        self.reload_locks()?;
        if self.catalog.is_locked(left) || self.catalog.is_locked(right) {
            warn!(left, right, "join skipped: a table is locked");
            return Ok((JoinMethod::NestedLoop, Vec::new()));
        }

        let left_table = self.table(left)?;
        let right_table = self.table(right)?;
        let left_indexed = self.catalog.index_for_table(left).is_some();
        let right_indexed = self.catalog.index_for_table(right).is_some();

        let (method, cond, swapped) = join::select_join_strategy(
            left_table,
            right_table,
            condition_raw,
            left_indexed,
            right_indexed,
        )?;

        // When `swapped`, spec §4.3's "only L matches → swap the operands and
        // the condition" applies: the outer (scanned) table becomes the
        // original `right`, and the inner (indexed) table becomes the
        // original `left`. `cond`'s indices are already relative to this
        // swapped pairing.
        let (_outer_name, outer_table, inner_name, inner_table) = if swapped {
            (right, right_table, left, left_table)
        } else {
            (left, left_table, right, right_table)
        };

        let joined = match method {
            JoinMethod::NestedLoop => join::nested_loop_join(left_table, right_table, cond),
            JoinMethod::IndexNestedLoop => {
                let (index_name, _) = self.catalog.index_for_table(inner_name).ok_or_else(|| {
                    RelError::UnknownIndex(format!("no index registered on table '{inner_name}'"))
                })?;
                let index = self.indexes.get(index_name).ok_or_else(|| RelError::UnknownIndex(index_name.clone()))?;
                join::index_nested_loop_join(outer_table, inner_table, index, cond)
            }
            JoinMethod::SortMerge => {
                let (left_index_name, _) = self.catalog.index_for_table(left).ok_or_else(|| {
                    RelError::UnknownIndex(format!("no index registered on table '{left}'"))
                })?;
                let (right_index_name, _) = self.catalog.index_for_table(right).ok_or_else(|| {
                    RelError::UnknownIndex(format!("no index registered on table '{right}'"))
                })?;
                let left_index = self.indexes.get(left_index_name).ok_or_else(|| RelError::UnknownIndex(left_index_name.clone()))?;
                let right_index = self.indexes.get(right_index_name).ok_or_else(|| RelError::UnknownIndex(right_index_name.clone()))?;
                join::sort_merge_join(left_table, right_table, left_index, right_index)
            }
        };

        debug!(left, right, method = ?method, swapped, rows = joined.len(), "joined tables");

        // `joined` pairs come back as (outer_row, inner_row); restore
        // (left_row, right_row) order so the public result schema is always
        // `column_names(left) ∪ column_names(right)` regardless of which
        // internal strategy executed the join (spec §4.3).
        let concatenated = joined
            .into_iter()
            .map(|(a, b)| if swapped { (b, a) } else { (a, b) })
            .map(|(mut l, r)| {
                l.extend(r);
                l
            })
            .collect();
        Ok((method, concatenated))
    }

    /// Joins `left` and `right` and materializes the result as a brand new
    /// table named `into`, combining both sides' columns (supplements the
    /// base spec: a `join ... into` save-as convenience mirroring
    /// `select_into`, grounded in the original system's `save_as` helper).
    pub fn join_into(
        &mut self,
        left: &str,
        right: &str,
        condition_raw: &str,
        into: &str,
    ) -> RelResult<usize> {
        let (_, rows) = self.join("inner", left, right, condition_raw)?;
        let left_table = self.table(left)?;
        let right_table = self.table(right)?;

        // Only a name shared by both sides needs disambiguating with a
        // `table.column` prefix (spec §4.3); everything else keeps its bare
        // name.
        let colliding = |name: &str| {
            left_table.column_names.iter().any(|c| c == name)
                && right_table.column_names.iter().any(|c| c == name)
        };
        let mut column_names: Vec<String> = left_table
            .column_names
            .iter()
            .map(|c| if colliding(c) { format!("{left}.{c}") } else { c.clone() })
            .collect();
        column_names.extend(
            right_table
                .column_names
                .iter()
                .map(|c| if colliding(c) { format!("{right}.{c}") } else { c.clone() }),
        );
        let mut column_types = left_table.column_types.clone();
        column_types.extend(right_table.column_types.clone());

        self.materialize(into, column_names, column_types, rows)
    }

    /// Runs `select` and materializes the result as a brand new table named
    /// `into` (supplements the base spec, mirrored from the original's
    /// `save_as` pattern used by both `select` and `join`).
    pub fn select_into(
        &mut self,
        columns: &str,
        table: &str,
        condition_raw: Option<&str>,
        into: &str,
    ) -> RelResult<usize> {
        let rows = self.select(columns, table, condition_raw)?;
        let source = self.table(table)?;
        let col_names: Vec<String> = if columns.trim() == "*" {
            source.column_names.clone()
        } else {
            columns.split(',').map(|c| c.trim().to_string()).collect()
        };
        let col_types: Vec<ColumnType> = col_names
            .iter()
            .map(|c| source.column_types[source.column_index(c)?])
            .collect::<RelResult<_>>()?;

        self.materialize(into, col_names, col_types, rows)
    }

    fn materialize(
        &mut self,
        into: &str,
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        rows: Vec<Vec<Value>>,
    ) -> RelResult<usize> {
        let mut table = Table::new(into, column_names, column_types, None);
        let count = rows.len();
        for row in rows {
            table.rows.push(RowSlot::Live(row));
        }
        self.tables.insert(into.to_string(), table);
        self.catalog.register_table(into);
        self.save()?;
        Ok(count)
    }

    // ════════════════════════════════════════════
    // Indexing and locking
    // ════════════════════════════════════════════

    /// Builds a B-tree index over `table`'s primary key column, named
    /// `index_name`. Only built once, at creation time; later inserts extend
    /// it incrementally and updates/deletes trigger a full rebuild
    /// (spec §4.2).
    pub fn create_index(&mut self, index_name: &str, table: &str) -> RelResult<()> {
        self.reload_locks()?;
        if self.catalog.is_locked(table) {
            warn!(table, "create_index skipped: table is locked");
            return Ok(());
        }
        let t = self.table(table)?;
        let pk_idx = t.primary_key.ok_or_else(|| RelError::NoPrimaryKey(table.to_string()))?;
        let mut index = BTree::new();
        for (pos, slot) in t.rows.iter().enumerate() {
            if let RowSlot::Live(values) = slot {
                index.insert(values[pk_idx].clone(), pos);
            }
        }
        let column = t.column_names[pk_idx].clone();
        self.catalog.register_index(index_name, table, &column)?;
        self.indexes.insert(index_name.to_string(), index);
        self.save()?;
        debug!(index_name, table, "created index");
        Ok(())
    }

    /// Acquires an exclusive lock on `table`. Advisory: every mutating
    /// statement checks it, but nothing prevents bypassing the API
    /// (spec §5).
    pub fn lock_table(&mut self, table: &str) -> RelResult<()> {
        self.reload_locks()?;
        self.catalog.lock(table);
        self.save()?;
        Ok(())
    }

    pub fn unlock_table(&mut self, table: &str) -> RelResult<()> {
        self.reload_locks()?;
        self.catalog.unlock(table);
        self.save()?;
        Ok(())
    }

    /// Re-reads lock state from disk and reports whether `table` is
    /// currently locked, without mutating anything (spec §5).
    pub fn is_locked(&mut self, table: &str) -> RelResult<bool> {
        self.reload_locks()?;
        Ok(self.catalog.is_locked(table))
    }

    // ════════════════════════════════════════════
    // Import / export
    // ════════════════════════════════════════════

    /// Loads `table` from a CSV file, inferring a schema from the header row
    /// and declaring every column as `str` (spec §6 supplement, grounded on
    /// the original's `load_from_file` CSV path).
    pub fn import_table(&mut self, table: &str, csv_path: &std::path::Path) -> RelResult<usize> {
        self.reload_locks()?;
        let (column_names, raw_rows) = crate::csv::read_table(csv_path)?;
        let column_types = vec![ColumnType::Str; column_names.len()];
        let mut t = Table::new(table, column_names, column_types, None);
        let mut free = Vec::new();
        let mut count = 0;
        for raw_row in raw_rows {
            t.insert(&raw_row, &mut free)?;
            count += 1;
        }
        self.tables.insert(table.to_string(), t);
        self.catalog.register_table(table);
        self.save()?;
        Ok(count)
    }

    /// Writes `table`'s live rows to a CSV file (spec §6 supplement).
    pub fn export(&self, table: &str, csv_path: &std::path::Path) -> RelResult<()> {
        let t = self.table(table)?;
        crate::csv::write_table(t, csv_path)
    }
}
