//! Fixed column schemas for the invoice ledger format
//!
//! Column names are preserved verbatim (including the original spelling of
//! the derived interest columns) because downstream consumers match on the
//! exact spreadsheet header.

use crate::error::Result;
use crate::table::Table;

/// Columns that must be present on raw input before transformation
pub const REQUIRED_INPUT_COLUMNS: [&str; 13] = [
    "Region",
    "Area Name",
    "Market",
    "Customer Name",
    "Customer Number",
    "DATE",
    "Transaction#",
    "Type",
    "Status",
    "Due Date",
    "Amount",
    "Balance Due",
    "Age",
];

/// Output column order for processed tables
pub const FINAL_COLUMNS: [&str; 19] = [
    "Region",
    "Area Name",
    "Market",
    "Customer Name",
    "Customer Number",
    "DATE",
    "Transaction#",
    "Type",
    "Status",
    "Due Date",
    "Amount",
    "Balance Due",
    "Age",
    "Due days",
    "Previous interst",
    "interst working",
    "per day interst%",
    "working interst in %",
    "interest amount",
];

/// Columns stripped from raw data when present
pub const COLUMNS_TO_DROP: [&str; 2] = ["Sales person", "Sale Person"];

/// Validate that a raw table carries every required input column
pub fn validate_required(table: &Table) -> Result<()> {
    table.require_columns(&REQUIRED_INPUT_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_columns_extend_required() {
        // The output schema is the input schema plus the derived columns
        assert_eq!(&FINAL_COLUMNS[..13], &REQUIRED_INPUT_COLUMNS[..]);
        assert_eq!(FINAL_COLUMNS.len(), 19);
    }

    #[test]
    fn test_validate_required_reports_missing() {
        let table = Table::with_columns(&["Region", "Status"]);
        let err = validate_required(&table).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("Customer Name"));
        assert!(message.contains("Transaction#"));
        assert!(!message.contains("Region,"));
    }
}
