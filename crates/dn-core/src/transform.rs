//! Rules-based transformation pipeline: filter overdue rows, clean raw
//! fields, derive the interest columns
//!
//! The step order is fixed; reordering changes the output. The only fatal
//! condition is a missing required column. Cell-level cleaning failures
//! degrade to missing values and processing continues.

use crate::config::{InterestConfig, WorkingDaysPolicy};
use crate::error::{Error, Result};
use crate::schema::{COLUMNS_TO_DROP, FINAL_COLUMNS};
use crate::table::{CellValue, Table};

/// Transform a raw ledger table into the processed 19-column output
///
/// The input table is never mutated.
pub fn transform(raw: &Table, config: &InterestConfig) -> Result<Table> {
    config.validate()?;
    crate::schema::validate_required(raw)?;

    // Working schema: raw columns minus the exclusion set
    let kept: Vec<(usize, &str)> = raw
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !COLUMNS_TO_DROP.contains(&c.name.as_str()))
        .map(|(i, c)| (i, c.name.as_str()))
        .collect();
    let kept_names: Vec<&str> = kept.iter().map(|&(_, name)| name).collect();

    let status_idx = column_pos(&kept_names, "Status")?;
    let type_pos = column_pos(&kept_names, "Type")?;
    let age_pos = column_pos(&kept_names, "Age")?;
    let customer_pos = column_pos(&kept_names, "Customer Name")?;
    let balance_pos = column_pos(&kept_names, "Balance Due")?;

    // Filter to overdue rows and clean the currency/age fields in one pass
    let status_src = kept[status_idx].0;
    let mut work: Vec<Vec<CellValue>> = Vec::new();
    for row in &raw.rows {
        if row.get(status_src).and_then(|c| c.as_text()) != Some("Overdue") {
            continue;
        }

        let cells: Vec<CellValue> = kept
            .iter()
            .map(|&(src_idx, name)| {
                let cell = row.get(src_idx).cloned().unwrap_or(CellValue::Missing);
                match name {
                    // Unparsable balances become 0, unparsable amounts stay missing
                    "Balance Due" => match clean_currency(&cell) {
                        CellValue::Missing => CellValue::Integer(0),
                        cleaned => cleaned,
                    },
                    "Amount" => clean_currency(&cell),
                    "Age" => clean_age(&cell),
                    _ => cell,
                }
            })
            .collect();

        work.push(cells);
    }

    // Opening balance entries get a configured age, overriding the cleaned value
    for cells in &mut work {
        if cells[type_pos].as_text() == Some("Customer Opening Balance") {
            cells[age_pos] = CellValue::Integer(config.opening_balance_age);
        }
    }

    // Keep rows past the due-days threshold; a missing age never passes
    let due_days = config.due_days_threshold as f64;
    let mut work: Vec<(Vec<CellValue>, f64)> = work
        .into_iter()
        .filter_map(|cells| {
            let age = cells[age_pos].as_f64().filter(|a| *a > due_days)?;
            Some((cells, age))
        })
        .collect();

    log::debug!("{} overdue rows past the {} day threshold", work.len(), config.due_days_threshold);

    // Stable sort by customer name, ascending byte order
    work.sort_by(|a, b| {
        a.0[customer_pos]
            .to_string_value()
            .cmp(&b.0[customer_pos].to_string_value())
    });

    // Project to the fixed output schema and derive the interest columns
    let base_pos: Vec<usize> = FINAL_COLUMNS[..13]
        .iter()
        .map(|name| column_pos(&kept_names, name))
        .collect::<Result<_>>()?;

    let rate = config.per_day_interest_rate;
    let mut out = Table::with_columns(&FINAL_COLUMNS);

    for (cells, age) in work {
        let working_days = match config.working_days_policy {
            WorkingDaysPolicy::Fixed => config.interest_working_days as f64,
            WorkingDaysPolicy::Dynamic => age - due_days,
        };
        let previous_days = (age - due_days - working_days).max(0.0);
        let working_pct = working_days * rate;
        let balance = cells[balance_pos].as_f64().unwrap_or(0.0);
        let interest = round4(balance * working_pct / 100.0);

        let mut row: Vec<CellValue> = base_pos.iter().map(|&p| cells[p].clone()).collect();
        row.push(CellValue::Integer(config.due_days_threshold));
        row.push(CellValue::number(previous_days));
        row.push(CellValue::number(working_days));
        row.push(CellValue::Float(rate));
        row.push(CellValue::Float(working_pct));
        row.push(CellValue::Float(interest));
        out.push_row(row);
    }

    Ok(out)
}

/// Clean a currency cell: strip the rupee glyph and thousands separators,
/// trim, and re-parse as a number
fn clean_currency(cell: &CellValue) -> CellValue {
    if cell.is_missing() {
        return CellValue::Missing;
    }
    let cleaned: String = cell
        .to_string_value()
        .chars()
        .filter(|c| *c != '₹' && *c != ',')
        .collect();
    match CellValue::parse(&cleaned) {
        CellValue::Text(_) => CellValue::Missing,
        numeric => numeric,
    }
}

/// Clean an age cell: strip a trailing " Days" suffix, trim, and re-parse
fn clean_age(cell: &CellValue) -> CellValue {
    if cell.is_missing() {
        return CellValue::Missing;
    }
    let text = cell.to_string_value();
    let trimmed = text.trim();
    let stripped = trimmed.strip_suffix(" Days").unwrap_or(trimmed);
    match CellValue::parse(stripped) {
        CellValue::Text(_) => CellValue::Missing,
        numeric => numeric,
    }
}

/// Round half-up (away from zero) to 4 decimal places
fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn column_pos(names: &[&str], name: &str) -> Result<usize> {
    names
        .iter()
        .position(|n| *n == name)
        .ok_or_else(|| Error::MissingColumns {
            columns: vec![name.to_string()],
        })
}
