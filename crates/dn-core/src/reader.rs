//! CSV decoding at the spreadsheet boundary

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};

/// Read a CSV file into a Table
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    read_from(BufReader::new(file), path)
}

/// Read CSV content from a string (useful for testing and FFI callers)
pub fn read_csv_str(content: &str, source_name: &str) -> Result<Table> {
    read_from(content.as_bytes(), Path::new(source_name))
}

fn read_from<R: Read>(reader: R, path: &Path) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        // Pad short rows with missing cells, truncate overlong ones
        if cells.len() > columns.len() {
            log::warn!(
                "row {} in {} has more cells than columns, truncating",
                row_idx + 1,
                path.display()
            );
            cells.truncate(columns.len());
        }
        while cells.len() < columns.len() {
            cells.push(CellValue::Missing);
        }

        rows.push(Row::new(cells));
    }

    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_simple_csv() {
        let csv = "Customer Name,Amount\nAcme,100\nBolt,200.5\n";
        let table = read_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.column_names(), vec!["Customer Name", "Amount"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].cells[1], CellValue::Integer(100));
        assert_eq!(table.rows[1].cells[1], CellValue::Float(200.5));
        assert_eq!(
            table.rows[0].cells[0],
            CellValue::Text("Acme".to_string())
        );
    }

    #[test]
    fn test_read_empty_cells_become_missing() {
        let csv = "A,B,C\n1,,3\n";
        let table = read_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Missing);
    }

    #[test]
    fn test_read_pads_short_rows() {
        let csv = "A,B,C\n1,2\n";
        let table = read_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Missing);
    }

    #[test]
    fn test_read_quoted_values() {
        let csv = "Customer Name,Note\n\"Acme, Inc\",\"line\"\n";
        let table = read_csv_str(csv, "test.csv").unwrap();

        assert_eq!(
            table.rows[0].cells[0],
            CellValue::Text("Acme, Inc".to_string())
        );
    }

    #[test]
    fn test_read_trims_header_whitespace() {
        let csv = " Customer Name ,Amount\nAcme,1\n";
        let table = read_csv_str(csv, "test.csv").unwrap();

        assert!(table.column_index("Customer Name").is_some());
    }
}
