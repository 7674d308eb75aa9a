//! Table pretty-printing for `show` (spec §6 supplement, grounded in
//! `prataprc-rdms`'s optional `prettytable-rs` dependency).

use prettytable::{Cell, Row, Table as PrettyTable};

use crate::table::{RowSlot, Table};

/// Renders `table` as a bordered grid and prints it to stdout.
pub fn print_table(table: &Table) {
    let mut pretty = PrettyTable::new();
    pretty.add_row(Row::new(table.column_names.iter().map(|c| Cell::new(c)).collect()));
    for slot in &table.rows {
        if let RowSlot::Live(values) = slot {
            let cells = values.iter().map(|v| Cell::new(&v.to_string())).collect();
            pretty.add_row(Row::new(cells));
        }
    }
    pretty.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    #[test]
    fn print_table_does_not_panic_on_empty_table() {
        let t = Table::new("department", vec!["name".into()], vec![ColumnType::Str], None);
        print_table(&t);
    }
}
