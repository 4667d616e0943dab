//! In-memory table types shared by the transformer and the reconciler

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An ordered table of rows over a fixed, order-significant column schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn with_columns(names: &[&str]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.to_string(), i))
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get all column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get a cell by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.cells.get(idx))
    }

    /// Append a row, padding or truncating the cells to the column count
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Missing);
        self.rows.push(Row::new(cells));
    }

    /// Check that every name in `required` is present, listing the missing
    /// ones in the error
    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns { columns: missing })
        }
    }

    /// Summary statistics over the numeric cells of a column
    ///
    /// Returns `None` when the column is absent or holds no numeric values.
    pub fn column_stats(&self, column: &str) -> Option<ColumnStats> {
        let idx = self.column_index(column)?;

        let values: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|r| r.cells.get(idx).and_then(|c| c.as_f64()))
            .collect();

        if values.is_empty() {
            return None;
        }

        let sum: f64 = values.iter().sum();
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);

        Some(ColumnStats {
            count: values.len(),
            sum,
            mean: sum / values.len() as f64,
            max,
            min,
        })
    }
}

/// A column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name (e.g., "Customer Name")
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// Cell values aligned to the table's columns
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// Summary statistics for a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

/// A cell value with type detection
///
/// `Missing` is the explicit null marker: cell-level cleaning failures
/// degrade to it, and it compares false against any numeric threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Text value
    Text(String),
    /// Missing/null cell
    Missing,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Missing;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        CellValue::Text(trimmed.to_string())
    }

    /// Build a numeric cell, preferring Integer for integral values
    pub fn number(v: f64) -> Self {
        if v.fract() == 0.0 && v.abs() <= i64::MAX as f64 {
            CellValue::Integer(v as i64)
        } else {
            CellValue::Float(v)
        }
    }

    /// Check if the cell is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of the cell, if it holds text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to a display string (empty for missing cells)
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Missing => String::new(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Missing => write!(f, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_parse_integer() {
        assert_eq!(CellValue::parse("42"), CellValue::Integer(42));
        assert_eq!(CellValue::parse("-123"), CellValue::Integer(-123));
        assert_eq!(CellValue::parse("0"), CellValue::Integer(0));
    }

    #[test]
    fn test_cell_value_parse_float() {
        assert_eq!(CellValue::parse("3.14"), CellValue::Float(3.14));
        assert_eq!(CellValue::parse("-2.5"), CellValue::Float(-2.5));
    }

    #[test]
    fn test_cell_value_parse_text() {
        assert_eq!(
            CellValue::parse("Overdue"),
            CellValue::Text("Overdue".to_string())
        );
    }

    #[test]
    fn test_cell_value_parse_missing() {
        assert_eq!(CellValue::parse(""), CellValue::Missing);
        assert_eq!(CellValue::parse("   "), CellValue::Missing);
    }

    #[test]
    fn test_cell_value_number_prefers_integer() {
        assert_eq!(CellValue::number(300.0), CellValue::Integer(300));
        assert_eq!(CellValue::number(1.86), CellValue::Float(1.86));
    }

    #[test]
    fn test_missing_has_no_numeric_view() {
        assert_eq!(CellValue::Missing.as_f64(), None);
        assert_eq!(CellValue::Text("260 Days".into()).as_f64(), None);
        assert_eq!(CellValue::Integer(260).as_f64(), Some(260.0));
    }

    #[test]
    fn test_require_columns_lists_missing() {
        let table = Table::with_columns(&["A", "B"]);

        assert!(table.require_columns(&["A", "B"]).is_ok());

        let err = table.require_columns(&["A", "C", "D"]).unwrap_err();
        match err {
            crate::error::Error::MissingColumns { columns } => {
                assert_eq!(columns, vec!["C".to_string(), "D".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut table = Table::with_columns(&["A", "B", "C"]);
        table.push_row(vec![CellValue::Integer(1)]);
        table.push_row(vec![
            CellValue::Integer(1),
            CellValue::Integer(2),
            CellValue::Integer(3),
            CellValue::Integer(4),
        ]);

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Missing);
        assert_eq!(table.rows[1].cells.len(), 3);
    }

    #[test]
    fn test_column_stats() {
        let mut table = Table::with_columns(&["amount"]);
        table.push_row(vec![CellValue::Integer(10)]);
        table.push_row(vec![CellValue::Float(20.0)]);
        table.push_row(vec![CellValue::Missing]);

        let stats = table.column_stats("amount").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.sum, 30.0);
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.max, 20.0);
        assert_eq!(stats.min, 10.0);

        assert!(table.column_stats("nope").is_none());
    }
}
