//! Outcome metrics: net profit, hourly profit, daily ROI, profitability.

use super::{ratio, require, round_to, Stage};
use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::types::{CostFeatures, IncomeSplit, OutcomeMetrics, ShiftRecord, TimeFeatures};

/// Derive outcome metrics from the upstream blocks.
///
/// ROI is `None` exactly when the expense is zero. It is never imputed.
#[allow(clippy::cast_precision_loss)]
pub fn outcome_metrics(
    time: &TimeFeatures,
    income: &IncomeSplit,
    cost: &CostFeatures,
) -> OutcomeMetrics {
    let net_profit = income.guaranteed_income - cost.operating_expense;
    let daily_roi = if cost.zero_expense {
        None
    } else {
        Some(round_to(
            net_profit as f64 / cost.operating_expense as f64 * 100.0,
            2,
        ))
    };

    OutcomeMetrics {
        net_profit,
        profit_per_hour: ratio(net_profit as f64, time.duration_hours, 2),
        daily_roi,
        profitable: net_profit > 0,
    }
}

pub struct OutcomeStage;

impl Stage for OutcomeStage {
    fn name(&self) -> &'static str {
        "outcome"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        _calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        for record in records.iter_mut() {
            let time = require(&record.time, self.name(), "time")?;
            let income = require(&record.income, self.name(), "income")?;
            let cost = require(&record.cost, self.name(), "cost")?;
            record.outcome = Some(outcome_metrics(time, income, cost));
        }
        Ok(())
    }
}
