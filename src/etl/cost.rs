//! Cost and integrity: expense coercion and the zero-expense flag.
//!
//! Zero-expense shifts are a known data-integrity gap. They are kept in the
//! sample and flagged; the outcome stage leaves their ROI null.

use super::loader::MAX_WHOLE_UNITS;
use super::Stage;
use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::types::{CostFeatures, ShiftRecord};

/// Missing expense becomes 0; fractional expense truncates to whole units.
#[allow(clippy::cast_possible_truncation)]
pub fn cost_features(expense: Option<f64>) -> CostFeatures {
    let operating_expense = expense.map_or(0, |e| e.trunc() as i64);
    CostFeatures {
        operating_expense,
        zero_expense: operating_expense == 0,
    }
}

/// Expense must be a finite amount in `[0, 2^53]` so it truncates to `i64`
/// without saturating.
fn check_expense(expense: Option<f64>) -> Result<(), PipelineError> {
    match expense {
        Some(e) if !(0.0..=MAX_WHOLE_UNITS).contains(&e) => Err(PipelineError::format(
            "expense",
            format!("expense {e} is outside [0, {MAX_WHOLE_UNITS}]"),
        )),
        _ => Ok(()),
    }
}

pub struct CostStage;

impl Stage for CostStage {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        _calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        let mut zero_expense = 0usize;
        for (idx, record) in records.iter_mut().enumerate() {
            check_expense(record.raw.expense).map_err(|e| e.at_line(record.source_line(idx)))?;
            let features = cost_features(record.raw.expense);
            zero_expense += usize::from(features.zero_expense);
            record.cost = Some(features);
        }
        if zero_expense > 0 {
            tracing::warn!(
                shifts = zero_expense,
                "Integrity gap: shifts with zero operating expense, ROI kept null (not imputed)"
            );
        }
        Ok(())
    }
}
