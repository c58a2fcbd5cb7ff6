//! Dashboard Data Contract
//!
//! Everything the advisory dashboard displays, computed from the processed
//! rows: sample counts, period ROI, ratio location, distance asymmetry,
//! zone and peak shares, per-zone completion efficiency and the daily ROI
//! distribution. Rendering is out of scope; [`DashboardSummary`] serializes
//! to JSON for whatever front end consumes it.

pub mod processed;

use serde::Serialize;

use crate::etl::{ratio, round_to};
use crate::invariants::statistics::{mean, median};
pub use processed::{load_or_regenerate, load_processed, LoadedRows, ProcessedRow, RowsOrigin};

/// Count of flagged shifts and its share of the sample (1 dp).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShareOfPeriod {
    pub count: usize,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub n_total: usize,
    pub n_valid_roi: usize,
    pub integrity_gap: usize,
    pub period_roi: Option<f64>,

    pub ratio_mean: Option<f64>,
    pub ratio_median: Option<f64>,

    pub km_phantom_total: f64,
    /// Phantom km as a percentage of reference km
    pub km_phantom_pct: Option<f64>,
    /// Bonus component as a percentage of gross income
    pub bonus_share_pct: Option<f64>,

    pub optimal_shifts: ShareOfPeriod,
    pub critical_shifts: ShareOfPeriod,
    pub peak_shifts: ShareOfPeriod,

    /// Mean completion efficiency of optimal-zone shifts
    pub efficiency_optimal: Option<f64>,
    /// Mean completion efficiency of critical-alert shifts
    pub efficiency_critical: Option<f64>,

    pub roi_mean: Option<f64>,
    pub roi_median: Option<f64>,
    pub roi_null_count: usize,
}

#[allow(clippy::cast_precision_loss)]
fn share(count: usize, total: usize) -> ShareOfPeriod {
    ShareOfPeriod {
        count,
        percent: ratio(count as f64 * 100.0, total as f64, 1),
    }
}

impl DashboardSummary {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_rows(rows: &[ProcessedRow]) -> Self {
        let n_total = rows.len();
        let valid: Vec<&ProcessedRow> = rows.iter().filter(|r| !r.has_zero_expense()).collect();
        let valid_net: i64 = valid.iter().map(|r| r.net_profit).sum();
        let valid_expense: i64 = valid.iter().map(|r| r.operating_expense).sum();

        let ratios: Vec<f64> = rows.iter().filter_map(|r| r.optimization_ratio).collect();
        let rois: Vec<f64> = rows.iter().filter_map(|r| r.daily_roi).collect();

        let km_reference: f64 = rows.iter().map(|r| r.km_reference).sum();
        let km_phantom: f64 = rows.iter().map(|r| r.km_phantom).sum();
        let bonus: i64 = rows.iter().map(|r| r.bonus_income).sum();
        let gross: i64 = rows.iter().map(|r| r.guaranteed_income).sum();

        let zone_efficiency = |pick: fn(&ProcessedRow) -> bool| {
            let values: Vec<f64> = rows
                .iter()
                .filter(|r| pick(r))
                .filter_map(|r| r.completion_efficiency)
                .collect();
            mean(&values).map(|m| round_to(m, 4))
        };

        Self {
            n_total,
            n_valid_roi: valid.len(),
            integrity_gap: n_total - valid.len(),
            period_roi: (valid_expense != 0)
                .then(|| round_to(valid_net as f64 / valid_expense as f64 * 100.0, 2)),
            ratio_mean: mean(&ratios).map(|m| round_to(m, 3)),
            ratio_median: median(&ratios).map(|m| round_to(m, 3)),
            km_phantom_total: round_to(km_phantom, 1),
            km_phantom_pct: ratio(km_phantom * 100.0, km_reference, 1),
            bonus_share_pct: ratio(bonus as f64 * 100.0, gross as f64, 1),
            optimal_shifts: share(rows.iter().filter(|r| r.is_optimal()).count(), n_total),
            critical_shifts: share(rows.iter().filter(|r| r.is_critical()).count(), n_total),
            peak_shifts: share(rows.iter().filter(|r| r.is_peak()).count(), n_total),
            efficiency_optimal: zone_efficiency(ProcessedRow::is_optimal),
            efficiency_critical: zone_efficiency(ProcessedRow::is_critical),
            roi_mean: mean(&rois).map(|m| round_to(m, 2)),
            roi_median: median(&rois).map(|m| round_to(m, 2)),
            roi_null_count: n_total - rois.len(),
        }
    }
}
