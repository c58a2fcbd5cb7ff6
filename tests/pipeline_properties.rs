//! Pipeline Property Tests
//!
//! Runs the full load -> transform -> invariants -> export path on small
//! hand-built CSV files and checks the record-level and file-level
//! guarantees: the end-to-end reference shift, midnight crossing, ROI null
//! policy, zone boundaries, byte-identical reruns and fatal input errors.

use std::path::{Path, PathBuf};

use shift_dss::etl::export::PROCESSED_COLUMNS;
use shift_dss::{CalibrationConfig, Pipeline, PipelineError, PipelineRun};

const HEADER: &str =
    "date,start_time,end_time,km_reference,km_platform,gross_income,orders_rocket,orders_normal,expense";

fn write_raw(dir: &Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("raw.csv");
    let mut text = String::from(HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(&path, text).expect("write raw csv");
    path
}

fn run(rows: &[&str]) -> (tempfile::TempDir, PipelineRun, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(dir.path(), rows);
    let processed = dir.path().join("processed/shifts_processed.csv");
    let result = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &processed)
        .expect("pipeline run");
    (dir, result, processed)
}

// ============================================================================
// End-to-end reference shift
// ============================================================================

#[test]
fn reference_shift_end_to_end() {
    let (_dir, result, processed) = run(&["2025-12-06,17:00,21:00,10,17.3,100000,8,2,20000"]);
    let r = &result.records[0];

    let time = r.time.expect("time");
    assert!(time.peak_window);
    assert_eq!(time.duration_hours, 4.0);

    assert_eq!(r.optimization_ratio(), Some(1.73));
    let zone = r.zone.expect("zone");
    assert!(zone.optimal_zone);
    assert!(!zone.critical_alert);

    assert_eq!(r.production.expect("production").total_orders, 10);
    let outcome = r.outcome.expect("outcome");
    assert_eq!(outcome.net_profit, 80_000);
    assert_eq!(outcome.daily_roi, Some(400.0));

    assert_eq!(result.exported_columns, 28);
    let text = std::fs::read_to_string(processed).expect("read processed");
    assert_eq!(text.lines().next(), Some(PROCESSED_COLUMNS.join(",").as_str()));
    assert_eq!(text.lines().count(), 2);
}

// ============================================================================
// Record-level properties
// ============================================================================

#[test]
fn midnight_crossing_duration() {
    let (_dir, result, _) = run(&["2025-12-06,23:30,00:15,5,6,20000,2,1,5000"]);
    let time = result.records[0].time.expect("time");
    assert_eq!(time.duration_hours, 0.75);
    assert!(!time.peak_window);
}

#[test]
fn times_are_normalized_in_the_export() {
    let (_dir, result, processed) = run(&["2025-12-06,9:05,0:12,5,6,20000,2,1,5000"]);
    assert_eq!(result.records[0].raw.start_time, "09:05");
    assert_eq!(result.records[0].raw.end_time, "00:12");
    let text = std::fs::read_to_string(processed).expect("read");
    assert!(text.contains("2025-12-06,09:05,00:12,"));
}

#[test]
fn income_split_is_exact_for_every_record() {
    let (_dir, result, _) = run(&[
        "2025-12-01,10:00,14:00,10,17,100000,8,2,20000",
        "2025-12-02,10:00,14:00,10,17,1001,1,0,100",
        "2025-12-03,10:00,14:00,10,17,0,0,0,",
        "2025-12-04,10:00,14:00,10,17,99999,3,3,1",
    ]);
    for r in &result.records {
        let income = r.income.expect("income");
        assert_eq!(income.base_income + income.bonus_income, r.raw.gross_income);
        assert_eq!(income.guaranteed_income, r.raw.gross_income);
    }
}

#[test]
fn roi_null_exactly_when_expense_is_zero() {
    let (_dir, result, processed) = run(&[
        "2025-12-01,10:00,14:00,10,17,100000,8,2,20000",
        "2025-12-02,10:00,14:00,10,17,90000,5,2,",
        "2025-12-03,10:00,14:00,10,17,80000,5,2,0",
        "2025-12-04,10:00,14:00,10,17,10000,1,0,30000",
    ]);
    for r in &result.records {
        let cost = r.cost.expect("cost");
        let outcome = r.outcome.expect("outcome");
        if cost.operating_expense == 0 {
            assert!(cost.zero_expense);
            assert_eq!(outcome.daily_roi, None);
        } else {
            let expected = outcome.net_profit as f64 / cost.operating_expense as f64 * 100.0;
            let roi = outcome.daily_roi.expect("roi defined");
            assert!((roi - expected).abs() <= 0.005);
        }
    }
    assert_eq!(result.invariants.n_valid_roi, 2);
    assert_eq!(result.invariants.integrity_gap(), 2);

    // The null survives the export as an empty cell.
    let roi_col = PROCESSED_COLUMNS
        .iter()
        .position(|c| *c == "daily_roi")
        .expect("daily_roi column");
    let text = std::fs::read_to_string(processed).expect("read");
    let third: Vec<&str> = text.lines().nth(3).expect("row 3").split(',').collect();
    assert_eq!(third[roi_col], "");
}

#[test]
fn zone_boundaries_are_inclusive() {
    let (_dir, result, _) = run(&[
        "2025-12-01,10:00,14:00,10,17.3,100000,8,2,20000",
        "2025-12-02,10:00,14:00,10,18.4,100000,8,2,20000",
        "2025-12-03,10:00,14:00,10,20,100000,8,2,20000",
        "2025-12-04,10:00,14:00,10,19,100000,8,2,20000",
        "2025-12-05,10:00,14:00,0,5,100000,8,2,20000",
    ]);
    let zones: Vec<(bool, bool)> = result
        .records
        .iter()
        .map(|r| {
            let z = r.zone.expect("zone");
            (z.optimal_zone, z.critical_alert)
        })
        .collect();
    assert_eq!(
        zones,
        vec![
            (true, false),
            (true, false),
            (false, true),
            (false, false),
            (false, false),
        ]
    );
}

#[test]
fn peak_window_is_half_open() {
    let (_dir, result, _) = run(&[
        "2025-12-01,16:59,18:00,10,17,100000,8,2,20000",
        "2025-12-02,17:00,18:00,10,17,100000,8,2,20000",
        "2025-12-03,20:59,22:00,10,17,100000,8,2,20000",
        "2025-12-04,21:00,22:00,10,17,100000,8,2,20000",
    ]);
    let peaks: Vec<bool> = result
        .records
        .iter()
        .map(|r| r.time.expect("time").peak_window)
        .collect();
    assert_eq!(peaks, vec![false, true, true, false]);
}

// ============================================================================
// File-level properties
// ============================================================================

#[test]
fn rerun_produces_byte_identical_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(
        dir.path(),
        &[
            "2025-12-01,17:00,21:00,10,17.3,100000,8,2,20000",
            "2025-12-02,23:30,00:15,3.3,4.1,25000,2,1,",
            "2025-12-03,10:00,14:00,12.5,26,140000,9,4,31000",
        ],
    );
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    let pipeline = Pipeline::standard(CalibrationConfig::default());
    let first = pipeline.run(&raw, &a).expect("first run");
    let second = pipeline.run(&raw, &b).expect("second run");

    assert_eq!(
        std::fs::read(&a).expect("read a"),
        std::fs::read(&b).expect("read b")
    );
    assert_eq!(first.invariants, second.invariants);
}

#[test]
fn custom_calibration_flows_through() {
    let mut calibration = CalibrationConfig::default();
    calibration.ratio.optimal_min = 1.60;
    calibration.ratio.low_activation = 1.20;
    calibration.income.base_share = 0.5;

    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(dir.path(), &["2025-12-06,10:00,12:00,10,16.5,100000,8,2,20000"]);
    let result = Pipeline::standard(calibration)
        .run(&raw, &dir.path().join("out.csv"))
        .expect("run");
    let r = &result.records[0];
    assert!(r.zone.expect("zone").optimal_zone);
    assert_eq!(r.income.expect("income").base_income, 50_000);
}

// ============================================================================
// Fatal input errors
// ============================================================================

#[test]
fn missing_columns_abort_before_any_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = dir.path().join("raw.csv");
    std::fs::write(
        &raw,
        "date,start_time,end_time,km_reference,gross_income,orders_rocket\n2025-12-06,17:00,21:00,10,100000,8\n",
    )
    .expect("write");
    let processed = dir.path().join("out/processed.csv");

    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &processed)
        .expect_err("schema error");
    match err {
        PipelineError::Schema { missing, .. } => {
            assert_eq!(missing, vec!["km_platform", "orders_normal", "expense"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!processed.exists());
}

#[test]
fn malformed_time_reports_its_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(
        dir.path(),
        &[
            "2025-12-01,17:00,21:00,10,17.3,100000,8,2,20000",
            "2025-12-02,17h00,21:00,10,17.3,100000,8,2,20000",
        ],
    );
    let processed = dir.path().join("processed.csv");
    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &processed)
        .expect_err("format error");
    assert!(matches!(err, PipelineError::Format { line: 3, .. }), "got {err}");
    assert!(!processed.exists());
}

#[test]
fn header_only_file_is_an_empty_dataset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(dir.path(), &[]);
    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &dir.path().join("processed.csv"))
        .expect_err("empty");
    assert!(matches!(err, PipelineError::EmptyDataset(_)));
}

#[test]
fn failed_run_keeps_previous_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(dir.path(), &["2025-12-01,17:00,21:00,10,17.3,100000,8,2,20000"]);
    let processed = dir.path().join("processed.csv");
    let pipeline = Pipeline::standard(CalibrationConfig::default());
    pipeline.run(&raw, &processed).expect("first run");
    let before = std::fs::read(&processed).expect("read");

    write_raw(dir.path(), &["2025-13-45,17:00,21:00,10,17.3,100000,8,2,20000"]);
    assert!(pipeline.run(&raw, &processed).is_err());
    assert_eq!(std::fs::read(&processed).expect("read"), before);
}

#[test]
fn format_error_names_the_real_file_line_after_blank_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = dir.path().join("raw.csv");
    std::fs::write(
        &raw,
        format!(
            "{HEADER}\n2025-12-01,17:00,21:00,10,17.3,100000,8,2,20000\n\n2025-12-02,17h00,21:00,10,17.3,100000,8,2,20000\n"
        ),
    )
    .expect("write");
    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &dir.path().join("processed.csv"))
        .expect_err("format error");
    match err {
        PipelineError::Format { line, column, .. } => {
            assert_eq!(line, 4);
            assert_eq!(column, "start_time");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn saturated_order_counts_fail_instead_of_overflowing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(
        dir.path(),
        &["2025-12-01,17:00,21:00,10,17.3,100000,4294967295,1,20000"],
    );
    let processed = dir.path().join("processed.csv");
    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &processed)
        .expect_err("order total overflows");
    assert!(
        matches!(err, PipelineError::Format { line: 2, ref column, .. } if column == "orders_normal"),
        "got {err}"
    );
    assert!(!processed.exists());
}

#[test]
fn oversized_expense_is_rejected_at_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_raw(
        dir.path(),
        &[
            "2025-12-01,17:00,21:00,10,17.3,100000,8,2,1e19",
            "2025-12-02,17:00,21:00,10,17.3,100000,8,2,1e19",
        ],
    );
    let err = Pipeline::standard(CalibrationConfig::default())
        .run(&raw, &dir.path().join("processed.csv"))
        .expect_err("expense out of range");
    assert!(
        matches!(err, PipelineError::Format { line: 2, ref column, .. } if column == "expense"),
        "got {err}"
    );
}
