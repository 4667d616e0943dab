//! C FFI bindings for dn-core
//!
//! This crate provides a C-compatible API so a host UI can run the
//! transformation over uploaded CSV content, read the processed table
//! cell-by-cell, and fetch a comparison report as JSON.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use dn_core::{InterestConfig, ReconcileOptions, Table};

/// Opaque handle to a processed table
pub struct FfiTable {
    inner: Table,
}

unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

fn string_out(s: String) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Transform raw CSV content into a processed table
///
/// `config_json` may be null to use the default configuration.
///
/// # Safety
/// - `raw_csv` must be a valid C string
/// - `config_json` must be a valid C string or null
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn dn_process_csv(
    raw_csv: *const c_char,
    config_json: *const c_char,
) -> *mut FfiTable {
    let Some(content) = str_arg(raw_csv) else {
        return ptr::null_mut();
    };

    let config = match str_arg(config_json) {
        Some(json) => match serde_json::from_str::<InterestConfig>(json) {
            Ok(config) => config,
            Err(_) => return ptr::null_mut(),
        },
        None => InterestConfig::default(),
    };

    let raw = match dn_core::read_csv_str(content, "<upload>") {
        Ok(table) => table,
        Err(_) => return ptr::null_mut(),
    };

    match dn_core::transform(&raw, &config) {
        Ok(table) => Box::into_raw(Box::new(FfiTable { inner: table })),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a processed table
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv` or null
#[no_mangle]
pub unsafe extern "C" fn dn_free_table(table: *mut FfiTable) {
    if !table.is_null() {
        drop(Box::from_raw(table));
    }
}

/// Get the row count of a processed table
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv`
#[no_mangle]
pub unsafe extern "C" fn dn_table_row_count(table: *const FfiTable) -> usize {
    if table.is_null() {
        return 0;
    }
    (*table).inner.row_count()
}

/// Get the column count of a processed table
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv`
#[no_mangle]
pub unsafe extern "C" fn dn_table_col_count(table: *const FfiTable) -> usize {
    if table.is_null() {
        return 0;
    }
    (*table).inner.column_count()
}

/// Get a column name by index
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `dn_free_string`
#[no_mangle]
pub unsafe extern "C" fn dn_table_col_name(table: *const FfiTable, index: usize) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }

    match (&(*table).inner.columns).get(index) {
        Some(col) => string_out(col.name.clone()),
        None => ptr::null_mut(),
    }
}

/// Get a cell value as a string (empty string for missing cells)
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv`
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `dn_free_string`
#[no_mangle]
pub unsafe extern "C" fn dn_table_cell(
    table: *const FfiTable,
    row: usize,
    col: usize,
) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }

    match (&(*table).inner.rows).get(row).and_then(|r| r.get(col)) {
        Some(cell) => string_out(cell.to_string_value()),
        None => ptr::null_mut(),
    }
}

/// Export a processed table as CSV bytes (returned as a C string)
///
/// # Safety
/// - `table` must be a valid pointer returned by `dn_process_csv`
/// - Caller must free the returned string with `dn_free_string`
#[no_mangle]
pub unsafe extern "C" fn dn_table_to_csv(table: *const FfiTable) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }

    match String::from_utf8(dn_core::csv_bytes(&(*table).inner)) {
        Ok(text) => string_out(text),
        Err(_) => ptr::null_mut(),
    }
}

/// Compare two CSV tables and return the full report as JSON
///
/// # Safety
/// - `processed_csv` and `expected_csv` must be valid C strings
/// - Returns null on error
/// - Caller must free the returned string with `dn_free_string`
#[no_mangle]
pub unsafe extern "C" fn dn_compare_csv(
    processed_csv: *const c_char,
    expected_csv: *const c_char,
) -> *mut c_char {
    let (Some(processed), Some(expected)) = (str_arg(processed_csv), str_arg(expected_csv)) else {
        return ptr::null_mut();
    };

    let processed = match dn_core::read_csv_str(processed, "<processed>") {
        Ok(table) => table,
        Err(_) => return ptr::null_mut(),
    };
    let expected = match dn_core::read_csv_str(expected, "<expected>") {
        Ok(table) => table,
        Err(_) => return ptr::null_mut(),
    };

    let options = ReconcileOptions::default();
    let shape = dn_core::compare_shape(&processed, &expected);
    let mismatches = match dn_core::detailed_mismatches(&processed, &expected, &options) {
        Ok(records) => records,
        Err(_) => return ptr::null_mut(),
    };
    let value_diffs = match dn_core::value_comparison(&processed, &expected, &options) {
        Ok(diffs) => diffs,
        Err(_) => return ptr::null_mut(),
    };
    let summary = dn_core::summary_report(&processed, &expected);

    let report = serde_json::json!({
        "summary": summary,
        "shape": shape,
        "mismatches": mismatches,
        "value_diffs": value_diffs,
    });

    match serde_json::to_string(&report) {
        Ok(json) => string_out(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a dn_* function or null
#[no_mangle]
pub unsafe extern "C" fn dn_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const RAW: &str = "Region,Area Name,Market,Customer Name,Customer Number,DATE,Transaction#,Type,Status,Due Date,Amount,Balance Due,Age\nWest,Metro,Urban,Acme,C001,2024-01-05,TX1,Invoice,Overdue,2024-02-05,500,1000,260 Days\n";

    #[test]
    fn test_process_and_read_cells() {
        let raw = CString::new(RAW).unwrap();

        unsafe {
            let table = dn_process_csv(raw.as_ptr(), ptr::null());
            assert!(!table.is_null());
            assert_eq!(dn_table_row_count(table), 1);
            assert_eq!(dn_table_col_count(table), 19);

            let name = dn_table_col_name(table, 3);
            assert_eq!(CStr::from_ptr(name).to_str().unwrap(), "Customer Name");
            dn_free_string(name);

            let cell = dn_table_cell(table, 0, 3);
            assert_eq!(CStr::from_ptr(cell).to_str().unwrap(), "Acme");
            dn_free_string(cell);

            assert!(dn_table_cell(table, 5, 0).is_null());
            dn_free_table(table);
        }
    }

    #[test]
    fn test_null_and_invalid_inputs() {
        unsafe {
            assert!(dn_process_csv(ptr::null(), ptr::null()).is_null());

            // Missing required columns
            let bad = CString::new("A,B\n1,2\n").unwrap();
            assert!(dn_process_csv(bad.as_ptr(), ptr::null()).is_null());
        }
    }

    #[test]
    fn test_compare_csv_reports_json() {
        let processed =
            CString::new("Customer Name,Transaction#,interest amount\nAcme,TX1,10\n").unwrap();
        let expected =
            CString::new("Customer Name,Transaction#,interest amount\nAcme,TX1,10.5\n").unwrap();

        unsafe {
            let json_ptr = dn_compare_csv(processed.as_ptr(), expected.as_ptr());
            assert!(!json_ptr.is_null());

            let json = CStr::from_ptr(json_ptr).to_str().unwrap().to_string();
            dn_free_string(json_ptr);

            let report: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(report["summary"]["row_difference"], 0);
            assert_eq!(report["value_diffs"][0]["Column"], "interest amount");
        }
    }
}
