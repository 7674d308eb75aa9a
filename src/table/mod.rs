//! The `Table` data model: a column-typed row store with an explicit free-slot
//! stack for reusing tombstoned positions (spec §4.1).

pub mod join;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::condition::{self, Op};
use crate::error::{RelError, RelResult};
use crate::value::{ColumnType, Value};

/// One physical row position: either a live row or a tombstone left behind by
/// a delete. Tombstones are never removed from `rows`; their positions are
/// instead pushed onto the table's free-slot stack and reused by the next
/// insert (spec §4.1 "Insertion free-slot stack").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RowSlot {
    Live(Vec<Value>),
    Tombstone,
}

impl RowSlot {
    pub fn as_live(&self) -> Option<&[Value]> {
        match self {
            RowSlot::Live(values) => Some(values),
            RowSlot::Tombstone => None,
        }
    }
}

/// A single table: its schema plus its row storage.
///
/// The free-slot stack (`free_positions`) is *not* owned here; per spec §9's
/// redesign note, the caller (the database/catalog layer) persists it
/// alongside the table so that the stack's own on-disk identity is explicit
/// rather than smuggled inside the row vector as a sentinel value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub column_names: Vec<String>,
    pub column_types: Vec<ColumnType>,
    /// Free-form per-column annotations (e.g. "not null"); carried through
    /// the schema but never interpreted by the core (spec §3 "column_extras").
    pub column_extras: Vec<String>,
    /// Index into `column_names`/`column_types` of the primary key column,
    /// if one was declared at creation time.
    pub primary_key: Option<usize>,
    pub rows: Vec<RowSlot>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        primary_key: Option<usize>,
    ) -> Self {
        let column_extras = vec![String::new(); column_names.len()];
        Table {
            name: name.into(),
            column_names,
            column_types,
            column_extras,
            primary_key,
            rows: Vec::new(),
        }
    }

    /// Same as [`Table::new`], but with explicit per-column `column_extras`
    /// annotations instead of the all-blank default (spec §3).
    pub fn with_extras(
        name: impl Into<String>,
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        column_extras: Vec<String>,
        primary_key: Option<usize>,
    ) -> Self {
        let mut t = Table::new(name, column_names, column_types, primary_key);
        t.column_extras = column_extras;
        t
    }

    pub fn column_index(&self, name: &str) -> RelResult<usize> {
        self.column_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RelError::UnknownColumn(name.to_string()))
    }

    /// Row count excluding tombstones (spec §8 `meta_length` invariant).
    pub fn live_row_count(&self) -> usize {
        self.rows.iter().filter(|r| matches!(r, RowSlot::Live(_))).count()
    }

    pub fn primary_key_value<'a>(&self, row: &'a [Value]) -> Option<&'a Value> {
        self.primary_key.map(|idx| &row[idx])
    }

    /// Inserts one row, reusing `free_positions`'s top slot if non-empty,
    /// otherwise appending. Coerces each raw token to its column's type and
    /// rejects a duplicate primary key (spec §4.1 "insert").
    pub fn insert(&mut self, raw_values: &[String], free_positions: &mut Vec<usize>) -> RelResult<usize> {
        if raw_values.len() != self.column_names.len() {
            return Err(RelError::TypeCoercion {
                value: raw_values.join(","),
                target: self.column_types.first().copied().unwrap_or(ColumnType::Str),
            });
        }

        let mut values = Vec::with_capacity(raw_values.len());
        for (raw, ty) in raw_values.iter().zip(&self.column_types) {
            values.push(Value::coerce(raw, *ty)?);
        }

        if let Some(pk_idx) = self.primary_key {
            let candidate = &values[pk_idx];
            if self.find_by_pk_linear(candidate).is_some() {
                return Err(RelError::PrimaryKeyViolation {
                    table: self.name.clone(),
                    key: candidate.to_string(),
                });
            }
        }

        let position = if let Some(pos) = free_positions.pop() {
            self.rows[pos] = RowSlot::Live(values);
            pos
        } else {
            self.rows.push(RowSlot::Live(values));
            self.rows.len() - 1
        };
        Ok(position)
    }

    fn find_by_pk_linear(&self, key: &Value) -> Option<usize> {
        let pk_idx = self.primary_key?;
        self.rows.iter().position(|slot| match slot {
            RowSlot::Live(values) => &values[pk_idx] == key,
            RowSlot::Tombstone => false,
        })
    }

    /// Replaces live rows matching `condition` with `assignments`
    /// (`column_name -> raw literal`), returning how many rows changed
    /// (spec §4.1 "update").
    pub fn update_where(
        &mut self,
        condition_raw: &str,
        assignments: &[(String, String)],
    ) -> RelResult<usize> {
        let parsed: Vec<(usize, Value)> = assignments
            .iter()
            .map(|(col, raw)| -> RelResult<(usize, Value)> {
                let idx = self.column_index(col)?;
                let value = Value::coerce(raw, self.column_types[idx])?;
                Ok((idx, value))
            })
            .collect::<RelResult<_>>()?;

        if let Some(pk_idx) = self.primary_key {
            if let Some((_, new_key)) = parsed.iter().find(|(idx, _)| *idx == pk_idx) {
                let matcher = self.build_matcher(condition_raw)?;
                let collides_with_untouched_row = self.rows.iter().any(|slot| match slot {
                    RowSlot::Live(values) => &values[pk_idx] == new_key && !matcher(values),
                    RowSlot::Tombstone => false,
                });
                if collides_with_untouched_row {
                    return Err(RelError::PrimaryKeyViolation {
                        table: self.name.clone(),
                        key: new_key.to_string(),
                    });
                }
            }
        }

        let matcher = self.build_matcher(condition_raw)?;
        let mut updated = 0;
        for slot in self.rows.iter_mut() {
            if let RowSlot::Live(values) = slot {
                if matcher(values) {
                    for (idx, value) in &parsed {
                        values[*idx] = value.clone();
                    }
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    /// Tombstones every live row matching `condition_raw`, pushing their
    /// positions onto `free_positions` for reuse by a later insert
    /// (spec §4.1 "delete").
    pub fn delete_where(&mut self, condition_raw: &str, free_positions: &mut Vec<usize>) -> RelResult<usize> {
        let matcher = self.build_matcher(condition_raw)?;
        let mut deleted = 0;
        for (pos, slot) in self.rows.iter_mut().enumerate() {
            let matches = match slot {
                RowSlot::Live(values) => matcher(values),
                RowSlot::Tombstone => false,
            };
            if matches {
                *slot = RowSlot::Tombstone;
                free_positions.push(pos);
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Returns references to every live row matching `condition_raw`, or
    /// every live row if `condition_raw` is `None` (spec §4.1 "select").
    pub fn select_where(&self, condition_raw: Option<&str>) -> RelResult<Vec<&[Value]>> {
        let matcher = match condition_raw {
            Some(raw) => Some(self.build_matcher(raw)?),
            None => None,
        };
        Ok(self
            .rows
            .iter()
            .filter_map(|slot| slot.as_live())
            .filter(|row| matcher.as_ref().is_none_or(|m| m(row)))
            .collect())
    }

    /// Same as [`Table::select_where`], but restricted to an equality
    /// condition on the primary key, answered via `index` instead of a linear
    /// scan (spec §4.2 "index-accelerated select").
    pub fn select_by_indexed_pk(
        &self,
        index: &crate::index::BTree<Value>,
        key: &Value,
    ) -> Option<&[Value]> {
        let pos = index.find(key)?;
        self.rows.get(pos).and_then(RowSlot::as_live)
    }

    /// Builds a closure testing whether a live row satisfies `condition_raw`.
    /// Exactly one of the condition's operands must name a column; the other
    /// is treated as a literal coerced to that column's type (spec §4.1).
    fn build_matcher(&self, condition_raw: &str) -> RelResult<impl Fn(&[Value]) -> bool + '_> {
        let cond = condition::parse(condition_raw)?;
        let (col_idx, op, literal_side) = match (
            self.column_names.iter().position(|c| c == &cond.left),
            self.column_names.iter().position(|c| c == &cond.right),
        ) {
            (Some(idx), None) => (idx, cond.op, &cond.right),
            (None, Some(idx)) => (idx, flip(cond.op), &cond.left),
            (Some(_), Some(_)) => return Err(RelError::MalformedCondition(condition_raw.to_string())),
            (None, None) => return Err(RelError::UnknownColumn(cond.left)),
        };
        let literal = Value::coerce(literal_side, self.column_types[col_idx])?;
        Ok(move |row: &[Value]| op.matches(row[col_idx].cmp(&literal)))
    }

    /// Casts every live value in `column` to `target`. Every slot is cast
    /// before any is written back, so a failing slot aborts with no partial
    /// mutation to the column (spec §4.1 "cast_column").
    pub fn cast_column(&mut self, column: &str, target: ColumnType) -> RelResult<()> {
        let idx = self.column_index(column)?;
        let recast: Vec<(usize, Value)> = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.as_live().map(|values| (pos, &values[idx])))
            .map(|(pos, value)| Ok((pos, value.cast(target)?)))
            .collect::<RelResult<_>>()?;
        for (pos, value) in recast {
            if let RowSlot::Live(values) = &mut self.rows[pos] {
                values[idx] = value;
            }
        }
        self.column_types[idx] = target;
        Ok(())
    }

    /// Stably sorts the table's rows in place by `column`'s natural order,
    /// ascending or descending (spec §4.1 "sort": stable in-place sort).
    /// Tombstones carry no value for any column and sort after every live
    /// row, matching the convention that nulls sort last (spec §8).
    pub fn sort_by(&mut self, column: &str, descending: bool) -> RelResult<()> {
        let idx = self.column_index(column)?;
        self.rows.sort_by(|a, b| match (a.as_live(), b.as_live()) {
            (Some(av), Some(bv)) => {
                let ord = av[idx].cmp(&bv[idx]);
                if descending { ord.reverse() } else { ord }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(())
    }
}

/// Swaps an operator's operands around so `a op b` can be re-read as `b op' a`.
fn flip(op: Op) -> Op {
    match op {
        Op::Le => Op::Ge,
        Op::Ge => Op::Le,
        Op::Lt => Op::Gt,
        Op::Gt => Op::Lt,
        Op::Eq => Op::Eq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students_table() -> Table {
        Table::new(
            "students",
            vec!["id".into(), "name".into(), "gpa".into()],
            vec![ColumnType::Int, ColumnType::Str, ColumnType::Real],
            Some(0),
        )
    }

    #[test]
    fn insert_reuses_freed_slot() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "3.2".into()], &mut free).unwrap();
        t.delete_where("id=1", &mut free).unwrap();
        assert_eq!(free, vec![0]);

        let pos = t.insert(&["3".into(), "Carol".into(), "3.5".into()], &mut free).unwrap();
        assert_eq!(pos, 0);
        assert!(free.is_empty());
        assert_eq!(t.live_row_count(), 2);
    }

    #[test]
    fn insert_rejects_duplicate_primary_key() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        let err = t.insert(&["1".into(), "Alice2".into(), "3.0".into()], &mut free);
        assert!(matches!(err, Err(RelError::PrimaryKeyViolation { .. })));
    }

    #[test]
    fn select_where_condition_with_column_on_right() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        let rows = t.select_where(Some("3.0<gpa")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], Value::Str("Alice".to_string()));
    }

    #[test]
    fn update_where_changes_matching_rows_only() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        let n = t
            .update_where("gpa<3.0", &[("gpa".to_string(), "2.8".to_string())])
            .unwrap();
        assert_eq!(n, 1);
        let rows = t.select_where(None).unwrap();
        assert_eq!(rows[1][2], Value::Real(2.8));
    }

    #[test]
    fn update_rejects_duplicate_primary_key() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        let err = t.update_where("id=2", &[("id".to_string(), "1".to_string())]);
        assert!(matches!(err, Err(RelError::PrimaryKeyViolation { .. })));
        // unchanged: id=2's row still has its original key
        let rows = t.select_where(Some("id=2")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn update_allows_setting_pk_to_its_own_current_value() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        let n = t.update_where("id=1", &[("id".to_string(), "1".to_string()), ("gpa".to_string(), "4.0".to_string())]).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn sort_by_descending() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        t.sort_by("gpa", true).unwrap();
        let rows = t.select_where(None).unwrap();
        assert_eq!(rows[0][1], Value::Str("Alice".to_string()));
    }

    #[test]
    fn sort_by_moves_tombstones_to_the_end() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        t.insert(&["3".into(), "Carol".into(), "3.1".into()], &mut free).unwrap();
        t.delete_where("id=2", &mut free).unwrap();
        t.sort_by("gpa", false).unwrap();
        let rows = t.select_where(None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Value::Str("Alice".to_string()));
        assert_eq!(rows[1][1], Value::Str("Carol".to_string()));
    }

    #[test]
    fn cast_column_changes_type_and_values() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.cast_column("id", ColumnType::Str).unwrap();
        let rows = t.select_where(None).unwrap();
        assert_eq!(rows[0][0], Value::Str("1".to_string()));
    }

    #[test]
    fn cast_column_failure_leaves_column_unmutated() {
        let mut t = students_table();
        let mut free = Vec::new();
        t.insert(&["1".into(), "Alice".into(), "3.9".into()], &mut free).unwrap();
        t.insert(&["2".into(), "Bob".into(), "2.5".into()], &mut free).unwrap();
        // "name" holds "Alice"/"Bob", neither of which parses as an int.
        let err = t.cast_column("name", ColumnType::Int);
        assert!(err.is_err());
        assert_eq!(t.column_types[1], ColumnType::Str);
        let rows = t.select_where(None).unwrap();
        assert_eq!(rows[0][1], Value::Str("Alice".to_string()));
        assert_eq!(rows[1][1], Value::Str("Bob".to_string()));
    }
}
