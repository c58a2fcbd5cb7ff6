//! Canonical 28-column projection and atomic CSV export.
//!
//! Columns belonging to a stage that did not run are omitted; present
//! columns keep their canonical position and name. Floats are written with
//! exactly four decimals, integers and flags as integers, and undefined
//! values as empty cells.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PipelineError;
use crate::types::ShiftRecord;

// ============================================================================
// Column Table
// ============================================================================

/// Which record block a column is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Raw,
    Time,
    Distance,
    Income,
    Cost,
    Outcome,
    Production,
    Zone,
}

impl Source {
    fn is_present(self, record: &ShiftRecord) -> bool {
        match self {
            Self::Raw => true,
            Self::Time => record.time.is_some(),
            Self::Distance => record.distance.is_some(),
            Self::Income => record.income.is_some(),
            Self::Cost => record.cost.is_some(),
            Self::Outcome => record.outcome.is_some(),
            Self::Production => record.production.is_some(),
            Self::Zone => record.zone.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
    Null,
}

impl Cell<'_> {
    fn flag(value: bool) -> Self {
        Cell::Int(i64::from(value))
    }

    fn maybe(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Float)
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(s) => (*s).to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format!("{v:.4}"),
            Cell::Null => String::new(),
        }
    }
}

struct Column {
    name: &'static str,
    source: Source,
    extract: for<'a> fn(&'a ShiftRecord) -> Cell<'a>,
}

macro_rules! col {
    ($name:literal, $source:ident, |$r:ident| $body:expr) => {
        Column {
            name: $name,
            source: Source::$source,
            extract: |$r| $body,
        }
    };
}

/// Output column names in canonical order.
pub const PROCESSED_COLUMNS: [&str; 28] = [
    "date",
    "start_time",
    "end_time",
    "duration_hours",
    "peak_window",
    "km_reference",
    "km_platform",
    "km_phantom",
    "optimization_ratio",
    "base_income",
    "bonus_income",
    "guaranteed_income",
    "bonus_share",
    "operating_expense",
    "zero_expense_flag",
    "net_profit",
    "profit_per_hour",
    "daily_roi",
    "profitable",
    "total_orders",
    "progress_units",
    "completion_efficiency",
    "km_per_order_reference",
    "km_per_order_platform",
    "income_per_km_reference",
    "income_per_hour",
    "optimal_zone",
    "critical_alert",
];

// Extractors only run after `Source::is_present` has been checked for every
// record, so the `Null` arms for a missing block are unreachable in practice.
fn columns() -> [Column; 28] {
    [
        col!("date", Raw, |r| Cell::Text(&r.raw.date)),
        col!("start_time", Raw, |r| Cell::Text(&r.raw.start_time)),
        col!("end_time", Raw, |r| Cell::Text(&r.raw.end_time)),
        col!("duration_hours", Time, |r| {
            r.time.map_or(Cell::Null, |t| Cell::Float(t.duration_hours))
        }),
        col!("peak_window", Time, |r| {
            r.time.map_or(Cell::Null, |t| Cell::flag(t.peak_window))
        }),
        col!("km_reference", Raw, |r| Cell::Float(r.raw.km_reference)),
        col!("km_platform", Raw, |r| Cell::Float(r.raw.km_platform)),
        col!("km_phantom", Distance, |r| {
            r.distance.map_or(Cell::Null, |d| Cell::Float(d.km_phantom))
        }),
        col!("optimization_ratio", Distance, |r| Cell::maybe(r.optimization_ratio())),
        col!("base_income", Income, |r| {
            r.income.map_or(Cell::Null, |i| Cell::Int(i.base_income))
        }),
        col!("bonus_income", Income, |r| {
            r.income.map_or(Cell::Null, |i| Cell::Int(i.bonus_income))
        }),
        col!("guaranteed_income", Income, |r| {
            r.income.map_or(Cell::Null, |i| Cell::Int(i.guaranteed_income))
        }),
        col!("bonus_share", Income, |r| {
            Cell::maybe(r.income.and_then(|i| i.bonus_share()))
        }),
        col!("operating_expense", Cost, |r| {
            r.cost.map_or(Cell::Null, |c| Cell::Int(c.operating_expense))
        }),
        col!("zero_expense_flag", Cost, |r| {
            r.cost.map_or(Cell::Null, |c| Cell::flag(c.zero_expense))
        }),
        col!("net_profit", Outcome, |r| {
            r.outcome.map_or(Cell::Null, |o| Cell::Int(o.net_profit))
        }),
        col!("profit_per_hour", Outcome, |r| {
            Cell::maybe(r.outcome.and_then(|o| o.profit_per_hour))
        }),
        col!("daily_roi", Outcome, |r| {
            Cell::maybe(r.outcome.and_then(|o| o.daily_roi))
        }),
        col!("profitable", Outcome, |r| {
            r.outcome.map_or(Cell::Null, |o| Cell::flag(o.profitable))
        }),
        col!("total_orders", Production, |r| {
            r.production
                .map_or(Cell::Null, |p| Cell::Int(i64::from(p.total_orders)))
        }),
        col!("progress_units", Production, |r| {
            r.production
                .map_or(Cell::Null, |p| Cell::Int(i64::from(p.progress_units)))
        }),
        col!("completion_efficiency", Production, |r| {
            Cell::maybe(r.production.and_then(|p| p.completion_efficiency))
        }),
        col!("km_per_order_reference", Production, |r| {
            Cell::maybe(r.production.and_then(|p| p.km_per_order_reference))
        }),
        col!("km_per_order_platform", Production, |r| {
            Cell::maybe(r.production.and_then(|p| p.km_per_order_platform))
        }),
        col!("income_per_km_reference", Production, |r| {
            Cell::maybe(r.production.and_then(|p| p.income_per_km_reference))
        }),
        col!("income_per_hour", Production, |r| {
            Cell::maybe(r.production.and_then(|p| p.income_per_hour))
        }),
        col!("optimal_zone", Zone, |r| {
            r.zone.map_or(Cell::Null, |z| Cell::flag(z.optimal_zone))
        }),
        col!("critical_alert", Zone, |r| {
            r.zone.map_or(Cell::Null, |z| Cell::flag(z.critical_alert))
        }),
    ]
}

// ============================================================================
// Projection
// ============================================================================

fn present_columns(records: &[ShiftRecord]) -> Vec<Column> {
    columns()
        .into_iter()
        .filter(|c| records.iter().all(|r| c.source.is_present(r)))
        .collect()
}

/// Names of the columns that would be exported for `records`, in order.
pub fn exported_column_names(records: &[ShiftRecord]) -> Vec<&'static str> {
    present_columns(records).iter().map(|c| c.name).collect()
}

/// Render the projection as CSV into any writer. Returns the column count.
pub fn write_processed<W: Write>(
    records: &[ShiftRecord],
    writer: W,
    origin: &Path,
) -> Result<usize, PipelineError> {
    let columns = present_columns(records);
    let csv_err = |e: csv::Error| PipelineError::Csv(origin.to_path_buf(), e);

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(columns.iter().map(|c| c.name))
        .map_err(csv_err)?;
    for record in records {
        out.write_record(columns.iter().map(|c| (c.extract)(record).render()))
            .map_err(csv_err)?;
    }
    out.flush()
        .map_err(|e| PipelineError::Io(origin.to_path_buf(), e))?;
    Ok(columns.len())
}

/// Export atomically: write a temp file next to `path`, then rename it over.
///
/// Parent directories are created as needed. On any failure the target is
/// left untouched.
pub fn export_processed(records: &[ShiftRecord], path: &Path) -> Result<usize, PipelineError> {
    let io_err = |e: std::io::Error| PipelineError::Io(path.to_path_buf(), e);

    let dir: PathBuf = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    let written = write_processed(records, tmp.as_file_mut(), path)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), columns = written, rows = records.len(), "Processed file written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use crate::etl::{DistanceStage, Pipeline, TimeStage};
    use crate::types::RawShift;

    fn raw(start: &str, end: &str, km_ref: f64, km_plat: f64, expense: Option<f64>) -> RawShift {
        RawShift {
            date: "2025-12-06".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            km_reference: km_ref,
            km_platform: km_plat,
            gross_income: 100_000,
            orders_rocket: 8,
            orders_normal: 2,
            expense,
            source_line: None,
        }
    }

    fn render(records: &[ShiftRecord]) -> (usize, String) {
        let mut buf = Vec::new();
        let n = write_processed(records, &mut buf, Path::new("mem.csv")).expect("write");
        (n, String::from_utf8(buf).expect("utf8"))
    }

    #[test]
    fn column_table_matches_canonical_names() {
        let names: Vec<_> = columns().iter().map(|c| c.name).collect();
        assert_eq!(names, PROCESSED_COLUMNS.to_vec());
    }

    #[test]
    fn full_pipeline_exports_all_columns() {
        let records = Pipeline::standard(CalibrationConfig::default())
            .transform(vec![raw("17:00", "21:00", 10.0, 17.3, Some(20_000.0))])
            .expect("transform");
        let (n, text) = render(&records);
        assert_eq!(n, 28);

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(PROCESSED_COLUMNS.join(",").as_str()));
        let row: Vec<&str> = lines.next().expect("row").split(',').collect();
        assert_eq!(row[0], "2025-12-06");
        assert_eq!(row[3], "4.0000");
        assert_eq!(row[4], "1");
        assert_eq!(row[8], "1.7300");
        assert_eq!(row[9], "52100");
        assert_eq!(row[17], "400.0000");
        assert_eq!(row[26], "1");
        assert_eq!(row[27], "0");
    }

    #[test]
    fn partial_pipeline_omits_missing_stage_columns() {
        let p = Pipeline::with_stages(
            CalibrationConfig::default(),
            vec![Box::new(TimeStage), Box::new(DistanceStage)],
        );
        let records = p
            .transform(vec![raw("9:00", "11:30", 10.0, 12.0, None)])
            .expect("transform");
        assert_eq!(
            exported_column_names(&records),
            vec![
                "date",
                "start_time",
                "end_time",
                "duration_hours",
                "peak_window",
                "km_reference",
                "km_platform",
                "km_phantom",
                "optimization_ratio"
            ]
        );
        let (_, text) = render(&records);
        assert!(text.contains("2025-12-06,09:00,11:30,2.5000,0,"));
    }

    #[test]
    fn undefined_values_are_empty_cells() {
        let records = Pipeline::standard(CalibrationConfig::default())
            .transform(vec![raw("17:00", "21:00", 0.0, 5.0, None)])
            .expect("transform");
        let (_, text) = render(&records);
        let row: Vec<&str> = text.lines().nth(1).expect("row").split(',').collect();
        // optimization_ratio, daily_roi, income_per_km_reference
        assert_eq!(row[8], "");
        assert_eq!(row[17], "");
        assert_eq!(row[24], "");
        assert_eq!(row[14], "1");
    }

    #[test]
    fn export_creates_parent_dirs_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested/out/processed.csv");
        let records = Pipeline::standard(CalibrationConfig::default())
            .transform(vec![raw("17:00", "21:00", 10.0, 17.3, Some(20_000.0))])
            .expect("transform");

        let n = export_processed(&records, &target).expect("export");
        assert_eq!(n, 28);
        assert!(target.exists());

        let entries = std::fs::read_dir(target.parent().expect("parent"))
            .expect("read_dir")
            .count();
        assert_eq!(entries, 1);
    }
}
