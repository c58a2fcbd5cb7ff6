//! Shift ETL Pipeline
//!
//! Linear, batch-oriented feature engineering over the whole record set.
//! Each stage sees every record and finishes before the next one starts.
//!
//! ## Stages
//! - `loader`: read the raw file, enforce the 9-column schema
//! - `time`: normalize times, midnight-corrected duration, peak flag
//! - `distance`: phantom km and optimization ratio
//! - `income`: base/bonus split (sums exactly to gross)
//! - `cost`: expense coercion, zero-expense integrity flag
//! - `outcome`: net profit, hourly profit, ROI (null on zero expense)
//! - `production`: order totals and per-order/per-hour ratios
//! - `ratio_zone`: optimal-zone / critical-alert classification
//! - `export`: 28-column canonical projection with atomic write
//!
//! Nothing is written until every stage and the invariant calculator have
//! succeeded, so a failed run leaves no partial output.

pub mod cost;
pub mod distance;
pub mod export;
pub mod income;
pub mod loader;
pub mod outcome;
pub mod production;
pub mod ratio_zone;
pub mod time;

use std::path::Path;

use tracing::{debug, info};

use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::invariants::{InvariantCalculator, InvariantSet};
use crate::types::{RawShift, ShiftRecord};

pub use cost::CostStage;
pub use distance::DistanceStage;
pub use income::IncomeStage;
pub use outcome::OutcomeStage;
pub use production::ProductionStage;
pub use ratio_zone::RatioZoneStage;
pub use time::TimeStage;

// ============================================================================
// Stage Trait
// ============================================================================

/// One whole-sample transform.
pub trait Stage: Send + Sync {
    /// Short identifier used in logs and ordering errors.
    fn name(&self) -> &'static str;

    /// Enrich every record in place.
    fn apply(
        &self,
        records: &mut [ShiftRecord],
        calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError>;
}

/// Borrow a prerequisite stage block or report the ordering violation.
pub(crate) fn require<'a, T>(
    block: &'a Option<T>,
    stage: &'static str,
    requires: &'static str,
) -> Result<&'a T, PipelineError> {
    block
        .as_ref()
        .ok_or(PipelineError::StageOrder { stage, requires })
}

// ============================================================================
// Numeric Helpers
// ============================================================================

/// Round half-to-even at `decimals` places on the scaled binary value.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// `numerator / denominator` rounded, or `None` for a zero denominator.
pub fn ratio(numerator: f64, denominator: f64, decimals: i32) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(round_to(numerator / denominator, decimals))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Result of one full pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub records: Vec<ShiftRecord>,
    pub invariants: InvariantSet,
    /// Number of columns written to the processed file
    pub exported_columns: usize,
}

/// Ordered list of stages plus the calibration they read.
pub struct Pipeline {
    calibration: CalibrationConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// All seven feature stages in canonical order.
    pub fn standard(calibration: CalibrationConfig) -> Self {
        Self::with_stages(
            calibration,
            vec![
                Box::new(TimeStage),
                Box::new(DistanceStage),
                Box::new(IncomeStage),
                Box::new(CostStage),
                Box::new(OutcomeStage),
                Box::new(ProductionStage),
                Box::new(RatioZoneStage),
            ],
        )
    }

    /// Custom stage list (used for partial pipelines).
    pub fn with_stages(calibration: CalibrationConfig, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            calibration,
            stages,
        }
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over the raw shifts.
    pub fn transform(&self, raw: Vec<RawShift>) -> Result<Vec<ShiftRecord>, PipelineError> {
        let mut records: Vec<ShiftRecord> = raw.into_iter().map(ShiftRecord::from).collect();
        for stage in &self.stages {
            stage.apply(&mut records, &self.calibration)?;
            debug!(stage = stage.name(), records = records.len(), "Stage complete");
        }
        Ok(records)
    }

    /// Load, transform, recompute invariants, then export.
    pub fn run(&self, raw_path: &Path, processed_path: &Path) -> Result<PipelineRun, PipelineError> {
        info!(path = %raw_path.display(), "Starting shift pipeline");

        let raw = loader::load_raw_shifts(raw_path)?;
        let records = self.transform(raw)?;
        let invariants = InvariantCalculator::compute(&records)?;
        let exported_columns = export::export_processed(&records, processed_path)?;

        info!(
            records = records.len(),
            columns = exported_columns,
            path = %processed_path.display(),
            "Pipeline complete"
        );

        Ok(PipelineRun {
            records,
            invariants,
            exported_columns,
        })
    }
}
