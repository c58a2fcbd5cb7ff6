//! Read-back of the processed file, with regeneration policy.
//!
//! - absent file: run the pipeline, then read what it wrote
//! - `refresh`: rerun the pipeline; if that fails while an older export
//!   exists, warn and serve the stale file
//! - otherwise: read the existing file as is

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::etl::export::PROCESSED_COLUMNS;
use crate::etl::Pipeline;

/// One row of the 28-column processed file. Flags are `0`/`1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRow {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_hours: f64,
    pub peak_window: u8,
    pub km_reference: f64,
    pub km_platform: f64,
    pub km_phantom: f64,
    pub optimization_ratio: Option<f64>,
    pub base_income: i64,
    pub bonus_income: i64,
    pub guaranteed_income: i64,
    pub bonus_share: Option<f64>,
    pub operating_expense: i64,
    pub zero_expense_flag: u8,
    pub net_profit: i64,
    pub profit_per_hour: Option<f64>,
    pub daily_roi: Option<f64>,
    pub profitable: u8,
    pub total_orders: u32,
    pub progress_units: u32,
    pub completion_efficiency: Option<f64>,
    pub km_per_order_reference: Option<f64>,
    pub km_per_order_platform: Option<f64>,
    pub income_per_km_reference: Option<f64>,
    pub income_per_hour: Option<f64>,
    pub optimal_zone: u8,
    pub critical_alert: u8,
}

impl ProcessedRow {
    pub fn is_peak(&self) -> bool {
        self.peak_window == 1
    }

    pub fn has_zero_expense(&self) -> bool {
        self.zero_expense_flag == 1
    }

    pub fn is_optimal(&self) -> bool {
        self.optimal_zone == 1
    }

    pub fn is_critical(&self) -> bool {
        self.critical_alert == 1
    }
}

/// Where the rows handed to the dashboard came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowsOrigin {
    /// Pipeline ran during this load
    Regenerated,
    /// Existing export read without rerunning
    Cached,
    /// Pipeline failed; an older export was served
    StaleFallback,
}

#[derive(Debug, Clone)]
pub struct LoadedRows {
    pub rows: Vec<ProcessedRow>,
    pub origin: RowsOrigin,
}

pub fn read_processed_rows<R: Read>(reader: R, origin: &Path) -> Result<Vec<ProcessedRow>, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PipelineError::Csv(origin.to_path_buf(), e))?
        .clone();
    let missing: Vec<String> = PROCESSED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema {
            path: origin.to_path_buf(),
            missing,
        });
    }

    let mut rows = Vec::new();
    for result in csv_reader.deserialize::<ProcessedRow>() {
        rows.push(result.map_err(|e| PipelineError::Csv(origin.to_path_buf(), e))?);
    }
    Ok(rows)
}

pub fn load_processed(path: &Path) -> Result<Vec<ProcessedRow>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::Io(path.to_path_buf(), e))?;
    read_processed_rows(file, path)
}

/// Load the processed rows, regenerating them from `raw_path` when needed.
pub fn load_or_regenerate(
    pipeline: &Pipeline,
    raw_path: &Path,
    processed_path: &Path,
    refresh: bool,
) -> Result<LoadedRows, PipelineError> {
    let exists = processed_path.exists();

    if exists && !refresh {
        return Ok(LoadedRows {
            rows: load_processed(processed_path)?,
            origin: RowsOrigin::Cached,
        });
    }

    match pipeline.run(raw_path, processed_path) {
        Ok(run) => {
            info!(
                records = run.records.len(),
                path = %processed_path.display(),
                "Processed file regenerated"
            );
            Ok(LoadedRows {
                rows: load_processed(processed_path)?,
                origin: RowsOrigin::Regenerated,
            })
        }
        Err(e) if exists => {
            warn!(
                error = %e,
                path = %processed_path.display(),
                "Pipeline failed; serving previous processed file"
            );
            Ok(LoadedRows {
                rows: load_processed(processed_path)?,
                origin: RowsOrigin::StaleFallback,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;

    const RAW: &str = "\
date,start_time,end_time,km_reference,km_platform,gross_income,orders_rocket,orders_normal,expense
2025-12-06,17:00,21:00,10,17.3,100000,8,2,20000
2025-12-07,9:00,13:30,20,30,80000,5,1,
";

    #[test]
    fn missing_file_is_regenerated_then_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = dir.path().join("raw.csv");
        let processed = dir.path().join("out/processed.csv");
        std::fs::write(&raw, RAW).expect("write raw");
        let pipeline = Pipeline::standard(CalibrationConfig::default());

        let first = load_or_regenerate(&pipeline, &raw, &processed, false).expect("first");
        assert_eq!(first.origin, RowsOrigin::Regenerated);
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[1].start_time, "09:00");
        assert_eq!(first.rows[1].daily_roi, None);
        assert!(first.rows[1].has_zero_expense());
        assert!(first.rows[0].is_optimal());

        let second = load_or_regenerate(&pipeline, &raw, &processed, false).expect("second");
        assert_eq!(second.origin, RowsOrigin::Cached);
        assert_eq!(second.rows, first.rows);
    }

    #[test]
    fn failed_refresh_falls_back_to_stale_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = dir.path().join("raw.csv");
        let processed = dir.path().join("processed.csv");
        std::fs::write(&raw, RAW).expect("write raw");
        let pipeline = Pipeline::standard(CalibrationConfig::default());
        load_or_regenerate(&pipeline, &raw, &processed, false).expect("seed");

        std::fs::write(&raw, "date,start_time\n2025-12-06,17:00\n").expect("break raw");
        let loaded = load_or_regenerate(&pipeline, &raw, &processed, true).expect("fallback");
        assert_eq!(loaded.origin, RowsOrigin::StaleFallback);
        assert_eq!(loaded.rows.len(), 2);
    }

    #[test]
    fn failure_without_previous_export_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = Pipeline::standard(CalibrationConfig::default());
        let result = load_or_regenerate(
            &pipeline,
            &dir.path().join("absent.csv"),
            &dir.path().join("processed.csv"),
            false,
        );
        assert!(matches!(result, Err(PipelineError::Io(..))));
    }

    #[test]
    fn partial_export_is_rejected_on_read_back() {
        let text = "date,start_time,end_time\n2025-12-06,17:00,21:00\n";
        let err = read_processed_rows(text.as_bytes(), Path::new("partial.csv")).expect_err("schema");
        match err {
            PipelineError::Schema { missing, .. } => {
                assert_eq!(missing.len(), 25);
                assert_eq!(missing[0], "duration_hours");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
