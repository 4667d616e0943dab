//! Row-reconciliation engine: compare a processed table against an expected
//! reference table by composite key
//!
//! Ordinary data mismatches are data, never errors; the only abort is a key
//! column missing from either table.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::table::{CellValue, Row, Table};

/// Key columns used to match rows across the two tables
pub const DEFAULT_KEY_COLUMNS: [&str; 2] = ["Customer Name", "Transaction#"];

/// Columns compared value-by-value on matched rows
pub const DEFAULT_COMPARE_COLUMNS: [&str; 3] = ["interest amount", "Balance Due", "Age"];

/// Numeric tolerance below which two values count as equal
pub const VALUE_TOLERANCE: f64 = 0.01;

/// Separator joining key-column values into a composite key
const KEY_SEPARATOR: &str = "||";

/// Options for the keyed comparison operations
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub key_columns: Vec<String>,
    pub compare_columns: Vec<String>,
    pub tolerance: f64,
    /// Optional cap on evaluated matched keys. `None` compares every
    /// matched key, costing O(matched keys x compared columns).
    pub max_keys: Option<usize>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key_columns: DEFAULT_KEY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            compare_columns: DEFAULT_COMPARE_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tolerance: VALUE_TOLERANCE,
            max_keys: None,
        }
    }
}

/// Row-count comparison between the two tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowComparison {
    pub processed_rows: usize,
    pub expected_rows: usize,
    /// Signed difference, processed minus expected
    pub difference: i64,
}

/// Column-set comparison between the two tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnComparison {
    pub processed_columns: Vec<String>,
    pub expected_columns: Vec<String>,
    pub extra_in_processed: Vec<String>,
    pub missing_in_processed: Vec<String>,
    pub columns_match: bool,
}

/// Customer names present on only one side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSetDiff {
    pub extra_in_processed: Vec<String>,
    pub missing_in_processed: Vec<String>,
}

/// Combined shape report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeComparison {
    pub rows: RowComparison,
    pub columns: ColumnComparison,
    /// Absent (not an error) when either table lacks a Customer Name column
    pub customers: Option<CustomerSetDiff>,
}

/// Compare row counts, column sets, and customer sets
pub fn compare_shape(processed: &Table, expected: &Table) -> ShapeComparison {
    let processed_cols: BTreeSet<&str> = processed.column_names().into_iter().collect();
    let expected_cols: BTreeSet<&str> = expected.column_names().into_iter().collect();

    let columns = ColumnComparison {
        processed_columns: processed.column_names().iter().map(|s| s.to_string()).collect(),
        expected_columns: expected.column_names().iter().map(|s| s.to_string()).collect(),
        extra_in_processed: processed_cols
            .difference(&expected_cols)
            .map(|s| s.to_string())
            .collect(),
        missing_in_processed: expected_cols
            .difference(&processed_cols)
            .map(|s| s.to_string())
            .collect(),
        columns_match: processed_cols == expected_cols,
    };

    let customers = match (
        processed.column_index("Customer Name"),
        expected.column_index("Customer Name"),
    ) {
        (Some(p_idx), Some(e_idx)) => {
            let p_names = customer_set(processed, p_idx);
            let e_names = customer_set(expected, e_idx);
            Some(CustomerSetDiff {
                extra_in_processed: p_names.difference(&e_names).cloned().collect(),
                missing_in_processed: e_names.difference(&p_names).cloned().collect(),
            })
        }
        _ => None,
    };

    ShapeComparison {
        rows: RowComparison {
            processed_rows: processed.row_count(),
            expected_rows: expected.row_count(),
            difference: processed.row_count() as i64 - expected.row_count() as i64,
        },
        columns,
        customers,
    }
}

fn customer_set(table: &Table, idx: usize) -> BTreeSet<String> {
    table
        .rows
        .iter()
        .filter_map(|r| r.get(idx))
        .filter(|c| !c.is_missing())
        .map(|c| c.to_string_value())
        .collect()
}

/// Which side a key-level mismatch sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchType {
    #[serde(rename = "Extra in Processed")]
    ExtraInProcessed,
    #[serde(rename = "Missing in Processed")]
    MissingInProcessed,
}

impl std::fmt::Display for MismatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MismatchType::ExtraInProcessed => write!(f, "Extra in Processed"),
            MismatchType::MissingInProcessed => write!(f, "Missing in Processed"),
        }
    }
}

/// A row present on only one side of the comparison
///
/// Field names serialize to the spreadsheet headers downstream consumers
/// already expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchRecord {
    #[serde(rename = "Mismatch Type")]
    pub mismatch_type: MismatchType,
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Transaction#")]
    pub transaction: String,
    #[serde(rename = "Type")]
    pub entry_type: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Balance Due")]
    pub balance_due: String,
    #[serde(rename = "Interest Amount")]
    pub interest_amount: String,
}

/// Report rows whose composite key exists on only one side
///
/// Matched keys are never reported here; an empty result is the success
/// state. The only error is a key column absent from either table.
pub fn detailed_mismatches(
    processed: &Table,
    expected: &Table,
    options: &ReconcileOptions,
) -> Result<Vec<MismatchRecord>> {
    let p_keys = key_indices(processed, &options.key_columns)?;
    let e_keys = key_indices(expected, &options.key_columns)?;

    let processed_set: HashSet<String> = processed
        .rows
        .iter()
        .map(|r| composite_key(r, &p_keys))
        .collect();
    let expected_set: HashSet<String> = expected
        .rows
        .iter()
        .map(|r| composite_key(r, &e_keys))
        .collect();

    let mut records = Vec::new();

    for row in &processed.rows {
        if !expected_set.contains(&composite_key(row, &p_keys)) {
            records.push(mismatch_record(
                MismatchType::ExtraInProcessed,
                processed,
                row,
            ));
        }
    }
    for row in &expected.rows {
        if !processed_set.contains(&composite_key(row, &e_keys)) {
            records.push(mismatch_record(
                MismatchType::MissingInProcessed,
                expected,
                row,
            ));
        }
    }

    Ok(records)
}

fn mismatch_record(mismatch_type: MismatchType, table: &Table, row: &Row) -> MismatchRecord {
    MismatchRecord {
        mismatch_type,
        customer_name: field_or_na(table, row, "Customer Name"),
        transaction: field_or_na(table, row, "Transaction#"),
        entry_type: field_or_na(table, row, "Type"),
        age: field_or_na(table, row, "Age"),
        balance_due: field_or_na(table, row, "Balance Due"),
        interest_amount: field_or_na(table, row, "interest amount"),
    }
}

fn field_or_na(table: &Table, row: &Row, column: &str) -> String {
    table
        .column_index(column)
        .and_then(|idx| row.get(idx))
        .filter(|c| !c.is_missing())
        .map(|c| c.to_string_value())
        .unwrap_or_else(|| "N/A".to_string())
}

/// A per-column value drift on a key-matched row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDiff {
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Transaction#")]
    pub transaction: String,
    #[serde(rename = "Column")]
    pub column: String,
    #[serde(rename = "Processed Value")]
    pub processed_value: String,
    #[serde(rename = "Expected Value")]
    pub expected_value: String,
    /// Signed difference (processed minus expected) rounded to 4 decimals;
    /// absent for non-numeric comparisons
    #[serde(rename = "Difference")]
    pub difference: Option<f64>,
}

/// Compare configured columns on rows whose composite key exists in both
/// tables
///
/// Keys are visited in processed-table order, first occurrence winning for
/// duplicates, so the result is deterministic. An empty result is the
/// success state.
pub fn value_comparison(
    processed: &Table,
    expected: &Table,
    options: &ReconcileOptions,
) -> Result<Vec<ValueDiff>> {
    let p_keys = key_indices(processed, &options.key_columns)?;
    let e_keys = key_indices(expected, &options.key_columns)?;

    // First occurrence per key on the expected side
    let mut expected_by_key: HashMap<String, usize> = HashMap::new();
    for (idx, row) in expected.rows.iter().enumerate() {
        expected_by_key
            .entry(composite_key(row, &e_keys))
            .or_insert(idx);
    }

    let mut diffs = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut matched = 0usize;

    for row in &processed.rows {
        let key = composite_key(row, &p_keys);
        if !visited.insert(key.clone()) {
            continue;
        }
        let Some(&exp_idx) = expected_by_key.get(&key) else {
            continue;
        };

        if let Some(cap) = options.max_keys {
            if matched >= cap {
                break;
            }
        }
        matched += 1;
        let exp_row = &expected.rows[exp_idx];

        for column in &options.compare_columns {
            let (Some(p_idx), Some(e_idx)) =
                (processed.column_index(column), expected.column_index(column))
            else {
                continue;
            };

            let p_val = row.get(p_idx).unwrap_or(&CellValue::Missing);
            let e_val = exp_row.get(e_idx).unwrap_or(&CellValue::Missing);

            // A missing value on either side is not comparable
            if p_val.is_missing() || e_val.is_missing() {
                continue;
            }

            let drift = match (numeric_view(p_val), numeric_view(e_val)) {
                (Some(p), Some(e)) => {
                    let diff = p - e;
                    (diff.abs() > options.tolerance).then(|| Some(round4(diff)))
                }
                _ => (p_val.to_string_value() != e_val.to_string_value()).then(|| None),
            };

            if let Some(difference) = drift {
                diffs.push(ValueDiff {
                    customer_name: field_or_na(processed, row, "Customer Name"),
                    transaction: field_or_na(processed, row, "Transaction#"),
                    column: column.clone(),
                    processed_value: p_val.to_string_value(),
                    expected_value: e_val.to_string_value(),
                    difference,
                });
            }
        }
    }

    Ok(diffs)
}

/// Comprehensive one-page summary of a comparison run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub processed_rows: usize,
    pub expected_rows: usize,
    pub row_difference: i64,
    pub columns_match: bool,
    pub extra_customer_count: usize,
    pub missing_customer_count: usize,
    pub processed_total_interest: Option<f64>,
    pub expected_total_interest: Option<f64>,
}

/// Build the summary report from the shape comparison plus interest totals
pub fn summary_report(processed: &Table, expected: &Table) -> SummaryReport {
    let shape = compare_shape(processed, expected);
    let (extra, missing) = match &shape.customers {
        Some(diff) => (diff.extra_in_processed.len(), diff.missing_in_processed.len()),
        None => (0, 0),
    };

    SummaryReport {
        processed_rows: shape.rows.processed_rows,
        expected_rows: shape.rows.expected_rows,
        row_difference: shape.rows.difference,
        columns_match: shape.columns.columns_match,
        extra_customer_count: extra,
        missing_customer_count: missing,
        processed_total_interest: processed
            .column_stats("interest amount")
            .map(|s| s.sum),
        expected_total_interest: expected.column_stats("interest amount").map(|s| s.sum),
    }
}

fn key_indices(table: &Table, key_columns: &[String]) -> Result<Vec<usize>> {
    let mut indices = Vec::with_capacity(key_columns.len());
    let mut missing = Vec::new();
    for name in key_columns {
        match table.column_index(name) {
            Some(idx) => indices.push(idx),
            None => missing.push(name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(Error::MissingColumns { columns: missing })
    }
}

fn composite_key(row: &Row, indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| {
            row.get(i)
                .map(|c| c.to_string_value())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Numeric view of a cell for comparison: numbers directly, numeric-looking
/// text re-parsed
fn numeric_view(cell: &CellValue) -> Option<f64> {
    cell.as_f64()
        .or_else(|| cell.as_text().and_then(|s| s.trim().parse().ok()))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_csv_str;

    fn table(csv: &str) -> Table {
        read_csv_str(csv, "test.csv").unwrap()
    }

    #[test]
    fn test_compare_shape_idempotent() {
        let t = table("Customer Name,Transaction#,Age\nAcme,TX1,200\nBolt,TX2,180\n");

        let shape = compare_shape(&t, &t);

        assert_eq!(shape.rows.difference, 0);
        assert!(shape.columns.columns_match);
        let customers = shape.customers.unwrap();
        assert!(customers.extra_in_processed.is_empty());
        assert!(customers.missing_in_processed.is_empty());
    }

    #[test]
    fn test_compare_shape_reports_differences() {
        let processed = table("Customer Name,Age,Extra\nAcme,200,1\nBolt,180,2\n");
        let expected = table("Customer Name,Age,Other\nAcme,200\n");

        let shape = compare_shape(&processed, &expected);

        assert_eq!(shape.rows.processed_rows, 2);
        assert_eq!(shape.rows.expected_rows, 1);
        assert_eq!(shape.rows.difference, 1);
        assert!(!shape.columns.columns_match);
        assert_eq!(shape.columns.extra_in_processed, vec!["Extra".to_string()]);
        assert_eq!(shape.columns.missing_in_processed, vec!["Other".to_string()]);

        let customers = shape.customers.unwrap();
        assert_eq!(customers.extra_in_processed, vec!["Bolt".to_string()]);
        assert!(customers.missing_in_processed.is_empty());
    }

    #[test]
    fn test_compare_shape_without_customer_column() {
        let processed = table("A,B\n1,2\n");
        let expected = table("A,B\n1,2\n");

        let shape = compare_shape(&processed, &expected);

        assert!(shape.customers.is_none());
    }

    #[test]
    fn test_detailed_mismatches_missing_in_processed() {
        let processed = table(
            "Customer Name,Transaction#,Type,Age,Balance Due,interest amount\n\
             Acme,TX1,Invoice,200,500,9.3\n",
        );
        let expected = table(
            "Customer Name,Transaction#,Type,Age,Balance Due,interest amount\n\
             Acme,TX1,Invoice,200,500,9.3\n\
             Customer X,Tx#9,Invoice,210,750,13.95\n",
        );

        let records =
            detailed_mismatches(&processed, &expected, &ReconcileOptions::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mismatch_type, MismatchType::MissingInProcessed);
        assert_eq!(records[0].customer_name, "Customer X");
        assert_eq!(records[0].transaction, "Tx#9");
    }

    #[test]
    fn test_detailed_mismatches_symmetric_and_empty_on_match() {
        let processed = table("Customer Name,Transaction#\nAcme,TX1\nBolt,TX2\n");
        let expected = table("Customer Name,Transaction#\nAcme,TX1\n");

        let records =
            detailed_mismatches(&processed, &expected, &ReconcileOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mismatch_type, MismatchType::ExtraInProcessed);
        assert_eq!(records[0].customer_name, "Bolt");
        // Fields absent from the table fall back to the marker
        assert_eq!(records[0].balance_due, "N/A");

        let records =
            detailed_mismatches(&processed, &processed, &ReconcileOptions::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_detailed_mismatches_requires_key_columns() {
        let processed = table("Customer Name\nAcme\n");
        let expected = table("Customer Name,Transaction#\nAcme,TX1\n");

        let err =
            detailed_mismatches(&processed, &expected, &ReconcileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Transaction#"));
    }

    #[test]
    fn test_value_comparison_tolerance() {
        let processed = table(
            "Customer Name,Transaction#,interest amount,Balance Due,Age\n\
             Acme,TX1,100.00,500,200\n\
             Bolt,TX2,50.005,500,200\n",
        );
        let expected = table(
            "Customer Name,Transaction#,interest amount,Balance Due,Age\n\
             Acme,TX1,100.02,500,200\n\
             Bolt,TX2,50.0,500,200\n",
        );

        let diffs = value_comparison(&processed, &expected, &ReconcileOptions::default()).unwrap();

        // 0.02 exceeds the tolerance, 0.005 does not
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].customer_name, "Acme");
        assert_eq!(diffs[0].column, "interest amount");
        assert_eq!(diffs[0].difference, Some(-0.02));
    }

    #[test]
    fn test_value_comparison_non_numeric() {
        let options = ReconcileOptions {
            compare_columns: vec!["Status".to_string()],
            ..ReconcileOptions::default()
        };
        let processed = table("Customer Name,Transaction#,Status\nAcme,TX1,Overdue\n");
        let expected = table("Customer Name,Transaction#,Status\nAcme,TX1,Open\n");

        let diffs = value_comparison(&processed, &expected, &options).unwrap();

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].difference, None);
        assert_eq!(diffs[0].processed_value, "Overdue");
        assert_eq!(diffs[0].expected_value, "Open");
    }

    #[test]
    fn test_value_comparison_skips_missing_and_unmatched() {
        let processed = table(
            "Customer Name,Transaction#,interest amount\nAcme,TX1,\nLoner,TX9,5.0\n",
        );
        let expected = table("Customer Name,Transaction#,interest amount\nAcme,TX1,7.5\n");

        let diffs = value_comparison(&processed, &expected, &ReconcileOptions::default()).unwrap();

        // The missing value is not comparable and TX9 has no match
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_value_comparison_key_cap() {
        let processed = table(
            "Customer Name,Transaction#,Age\nA,T1,10\nB,T2,20\nC,T3,30\n",
        );
        let expected = table(
            "Customer Name,Transaction#,Age\nA,T1,11\nB,T2,22\nC,T3,33\n",
        );

        let options = ReconcileOptions {
            max_keys: Some(2),
            ..ReconcileOptions::default()
        };
        let diffs = value_comparison(&processed, &expected, &options).unwrap();

        // Only the first two matched keys in processed order are evaluated
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].customer_name, "A");
        assert_eq!(diffs[1].customer_name, "B");
    }

    #[test]
    fn test_summary_report_totals() {
        let processed = table(
            "Customer Name,Transaction#,interest amount\nAcme,TX1,100.5\nBolt,TX2,50\n",
        );
        let expected = table("Customer Name,Transaction#,interest amount\nAcme,TX1,100.5\n");

        let report = summary_report(&processed, &expected);

        assert_eq!(report.processed_rows, 2);
        assert_eq!(report.expected_rows, 1);
        assert_eq!(report.row_difference, 1);
        assert!(report.columns_match);
        assert_eq!(report.extra_customer_count, 1);
        assert_eq!(report.missing_customer_count, 0);
        assert_eq!(report.processed_total_interest, Some(150.5));
        assert_eq!(report.expected_total_interest, Some(100.5));
    }
}
