//! dn-core: Core library for overdue-invoice interest processing
//!
//! This library provides functionality to:
//! - Decode spreadsheet (CSV) files into typed in-memory tables
//! - Validate tables against the fixed ledger column schema
//! - Filter overdue rows, clean raw fields, and derive interest columns
//! - Reconcile a processed table against an expected reference table,
//!   reporting row-, column-, and value-level discrepancies
//! - Encode processed tables back to spreadsheet bytes

pub mod config;
pub mod error;
pub mod reader;
pub mod reconcile;
pub mod schema;
pub mod table;
pub mod transform;
pub mod writer;

pub use config::{InterestConfig, WorkingDaysPolicy};
pub use error::{Error, Result};
pub use reader::{read_csv, read_csv_str};
pub use reconcile::{
    compare_shape, detailed_mismatches, summary_report, value_comparison, MismatchRecord,
    MismatchType, ReconcileOptions, ShapeComparison, SummaryReport, ValueDiff,
};
pub use schema::{FINAL_COLUMNS, REQUIRED_INPUT_COLUMNS};
pub use table::{CellValue, Column, ColumnStats, Row, Table};
pub use transform::transform;
pub use writer::{csv_bytes, write_csv};
