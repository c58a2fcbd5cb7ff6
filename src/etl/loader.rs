//! Raw shift loader
//!
//! Reads the raw shift CSV and enforces the minimal schema before any
//! transform runs. Date and time cells are kept as strings; numeric cells
//! are parsed and sanity-checked here so the stages can assume clean input.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::PipelineError;
use crate::types::{RawShift, REQUIRED_COLUMNS};

/// Largest currency amount an `f64` cell holds exactly (2^53).
pub const MAX_WHOLE_UNITS: f64 = 9_007_199_254_740_992.0;

/// One CSV row as typed by serde, before amount checks.
#[derive(Debug, Deserialize)]
struct CsvShiftRow {
    date: String,
    start_time: String,
    end_time: String,
    km_reference: f64,
    km_platform: f64,
    gross_income: f64,
    orders_rocket: u32,
    orders_normal: u32,
    expense: Option<f64>,
}

/// Load and validate the raw shift file at `path`.
pub fn load_raw_shifts(path: &Path) -> Result<Vec<RawShift>, PipelineError> {
    let file =
        std::fs::File::open(path).map_err(|e| PipelineError::Io(path.to_path_buf(), e))?;
    let shifts = read_raw_shifts(file, path)?;
    if shifts.is_empty() {
        return Err(PipelineError::EmptyDataset(path.to_path_buf()));
    }
    info!(records = shifts.len(), path = %path.display(), "Raw shifts loaded");
    Ok(shifts)
}

/// Parse raw shifts from any reader. `origin` is only used in error messages.
pub fn read_raw_shifts<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawShift>, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PipelineError::Csv(origin.to_path_buf(), e))?
        .clone();

    let missing = missing_columns(headers.iter());
    if !missing.is_empty() {
        return Err(PipelineError::Schema {
            path: origin.to_path_buf(),
            missing,
        });
    }

    let mut shifts = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| PipelineError::Csv(origin.to_path_buf(), e))?;
        let line = record
            .position()
            .map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));

        let row: CsvShiftRow = record.deserialize(Some(&headers)).map_err(|e| {
            let column = deserialize_column(&e, &headers);
            PipelineError::Format {
                line,
                column,
                message: e.to_string(),
            }
        })?;

        shifts.push(validate_row(row, line).map_err(|e| e.at_line(line))?);
    }

    Ok(shifts)
}

/// Required columns absent from `headers`, in canonical order.
pub fn missing_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let present: std::collections::HashSet<&str> = headers.collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| (*c).to_string())
        .collect()
}

fn deserialize_column(err: &csv::Error, headers: &csv::StringRecord) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err
            .field()
            .and_then(|i| headers.get(i as usize))
            .unwrap_or("?")
            .to_string(),
        _ => "?".to_string(),
    }
}

fn validate_row(row: CsvShiftRow, line: usize) -> Result<RawShift, PipelineError> {
    let km_reference = non_negative("km_reference", row.km_reference)?;
    let km_platform = non_negative("km_platform", row.km_platform)?;
    let gross_income = whole_units("gross_income", row.gross_income)?;

    // A NaN cell is a missing expense, same as an empty one.
    let expense = match row.expense {
        Some(v) if v.is_nan() => None,
        Some(v) => Some(bounded_amount("expense", v)?),
        None => None,
    };

    Ok(RawShift {
        date: row.date,
        start_time: row.start_time,
        end_time: row.end_time,
        km_reference,
        km_platform,
        gross_income,
        orders_rocket: row.orders_rocket,
        orders_normal: row.orders_normal,
        expense,
        source_line: Some(line),
    })
}

fn non_negative(column: &str, value: f64) -> Result<f64, PipelineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PipelineError::format(
            column,
            format!("expected a finite non-negative number, got {value}"),
        ))
    }
}

fn bounded_amount(column: &str, value: f64) -> Result<f64, PipelineError> {
    let value = non_negative(column, value)?;
    if value > MAX_WHOLE_UNITS {
        return Err(PipelineError::format(
            column,
            format!("amount {value} exceeds {MAX_WHOLE_UNITS}"),
        ));
    }
    Ok(value)
}

#[allow(clippy::cast_possible_truncation)]
fn whole_units(column: &str, value: f64) -> Result<i64, PipelineError> {
    let value = bounded_amount(column, value)?;
    if value.fract() != 0.0 {
        return Err(PipelineError::format(
            column,
            format!("expected whole currency units, got {value}"),
        ));
    }
    Ok(value as i64)
}
