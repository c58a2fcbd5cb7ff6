//! Income decomposition into base (work) and bonus (arbitrage) components.
//!
//! Only the base component is rounded; the bonus is the exact remainder, so
//! `base + bonus == gross` holds for every record regardless of rounding.

use super::Stage;
use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::types::{IncomeSplit, ShiftRecord};

/// Split `gross` with a fixed base proportion.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn split_income(gross: i64, base_share: f64) -> IncomeSplit {
    let base_income = (gross as f64 * base_share).round_ties_even() as i64;
    IncomeSplit {
        base_income,
        bonus_income: gross - base_income,
        guaranteed_income: gross,
    }
}

pub struct IncomeStage;

impl Stage for IncomeStage {
    fn name(&self) -> &'static str {
        "income"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        let share = calibration.income.base_share;
        for record in records.iter_mut() {
            record.income = Some(split_income(record.raw.gross_income, share));
        }
        Ok(())
    }
}
