//! CSV import/export (spec §6 supplement, grounded in the original system's
//! `load_from_file`/CSV interchange path; the `csv` crate is the same one
//! `prataprc-rdms` reaches for when it needs CSV support).

use std::io::Write;
use std::path::Path;

use crate::error::RelResult;
use crate::table::{RowSlot, Table};

/// Reads a CSV file's header row as column names and every subsequent row as
/// a vector of raw string cells, ready to pass to [`crate::table::Table::insert`].
pub fn read_table(path: &Path) -> RelResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = ::csv::Reader::from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// Writes a table's column names as the header row, followed by every live
/// row's values rendered via `Display`.
pub fn write_table(table: &Table, path: &Path) -> RelResult<()> {
    let mut writer = ::csv::Writer::from_path(path)?;
    writer.write_record(&table.column_names)?;
    for slot in &table.rows {
        if let RowSlot::Live(values) = slot {
            let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            writer.write_record(&cells)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    #[test]
    fn write_then_read_round_trips_header_and_rows() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut t = Table::new(
            "department",
            vec!["name".into(), "building".into()],
            vec![ColumnType::Str, ColumnType::Str],
            Some(0),
        );
        let mut free = Vec::new();
        t.insert(&["Biology".into(), "Watson".into()], &mut free).unwrap();
        t.insert(&["Physics".into(), "Wren".into()], &mut free).unwrap();

        write_table(&t, tmp.path()).unwrap();
        let (headers, rows) = read_table(tmp.path()).unwrap();
        assert_eq!(headers, vec!["name".to_string(), "building".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Biology".to_string(), "Watson".to_string()]);
    }
}
