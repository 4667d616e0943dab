//! CSV encoding at the spreadsheet boundary

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::table::Table;

/// Encode a table to CSV bytes, preserving column order
pub fn csv_bytes(table: &Table) -> Vec<u8> {
    let mut out = String::new();

    let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in &table.rows {
        let values: Vec<String> = row
            .cells
            .iter()
            .map(|c| escape_csv(&c.to_string_value()))
            .collect();
        out.push_str(&values.join(","));
        out.push('\n');
    }

    out.into_bytes()
}

/// Write a table to a CSV file
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&csv_bytes(table))?;
    Ok(())
}

/// Escape a value for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_csv_str;
    use crate::table::CellValue;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_csv_bytes_header_and_rows() {
        let mut table = crate::table::Table::with_columns(&["A", "B"]);
        table.push_row(vec![CellValue::Integer(1), CellValue::Text("x,y".into())]);

        let text = String::from_utf8(csv_bytes(&table)).unwrap();
        assert_eq!(text, "A,B\n1,\"x,y\"\n");
    }

    #[test]
    fn test_round_trip_preserves_values_and_order() {
        let csv = "Customer Name,Balance Due,Age\nAcme,1000.5,260\nBolt,0,\n";
        let table = read_csv_str(csv, "in.csv").unwrap();

        let bytes = csv_bytes(&table);
        let back = read_csv_str(std::str::from_utf8(&bytes).unwrap(), "back.csv").unwrap();

        assert_eq!(back.column_names(), table.column_names());
        assert_eq!(back.rows.len(), table.rows.len());
        for (a, b) in table.rows.iter().zip(back.rows.iter()) {
            assert_eq!(a.cells, b.cells);
        }
    }
}
