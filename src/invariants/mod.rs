//! Invariant Calculator
//!
//! Recomputes the period-level invariants from a fully enriched record set.
//! The result is never persisted: every run recalibrates from the current
//! sample, so adding shift N+1 updates the period ROI, ratio statistics and
//! regression model in one pass.
//!
//! ## Reported Precision
//! - period ROI, distance totals: 2 dp
//! - ratio mean / median / CI: 3 dp
//! - slope, intercept, residual sigma: 2 dp
//! - r, R²: 3 dp
//! - p-value: 6 dp

pub mod report;
pub mod statistics;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::etl::{require, round_to};
use crate::types::ShiftRecord;
use statistics::{ConfidenceInterval, LinearFit};

/// Confidence level of the ratio interval.
pub const RATIO_CONFIDENCE: f64 = 0.95;

// ============================================================================
// Invariant Set
// ============================================================================

/// Regression of net profit on total orders, rounded for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    /// Currency per additional order
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub residual_sigma: f64,
}

impl From<LinearFit> for RegressionModel {
    fn from(fit: LinearFit) -> Self {
        Self {
            slope: round_to(fit.slope, 2),
            intercept: round_to(fit.intercept, 2),
            r: round_to(fit.r, 3),
            r_squared: round_to(fit.r_squared(), 3),
            p_value: round_to(fit.p_value, 6),
            residual_sigma: round_to(fit.residual_sigma, 2),
        }
    }
}

/// Period-level summary recomputed on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantSet {
    pub n_total: usize,
    /// Shifts with non-zero expense (ROI defined)
    pub n_valid_roi: usize,

    pub gross_income_total: i64,
    pub expense_total: i64,
    pub net_profit_total: i64,
    /// `sum(net) / sum(expense) * 100` over the valid subset only
    pub period_roi: Option<f64>,

    pub km_reference_total: f64,
    pub km_platform_total: f64,
    pub km_phantom_total: f64,

    pub ratio_mean: Option<f64>,
    pub ratio_median: Option<f64>,
    pub ratio_ci95: Option<ConfidenceInterval>,

    /// Absent below three shifts or when order counts are constant
    pub regression: Option<RegressionModel>,
}

impl InvariantSet {
    /// Shifts excluded from ROI because their expense is zero.
    pub fn integrity_gap(&self) -> usize {
        self.n_total - self.n_valid_roi
    }
}

// ============================================================================
// Calculator
// ============================================================================

pub struct InvariantCalculator;

impl InvariantCalculator {
    /// Compute the invariant set.
    ///
    /// Requires the distance, income, cost, outcome and production stages
    /// to have run on every record.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(records: &[ShiftRecord]) -> Result<InvariantSet, PipelineError> {
        const NAME: &str = "invariants";

        // Summed wide, narrowed once at the end.
        let mut gross_income_total = 0i128;
        let mut expense_total = 0i128;
        let mut net_profit_total = 0i128;
        let mut valid_expense = 0i128;
        let mut valid_net = 0i128;
        let mut n_valid_roi = 0usize;
        let mut km_reference = 0.0;
        let mut km_platform = 0.0;
        let mut ratios = Vec::with_capacity(records.len());
        let mut orders = Vec::with_capacity(records.len());
        let mut profits = Vec::with_capacity(records.len());

        for record in records {
            let distance = require(&record.distance, NAME, "distance")?;
            let income = require(&record.income, NAME, "income")?;
            let cost = require(&record.cost, NAME, "cost")?;
            let outcome = require(&record.outcome, NAME, "outcome")?;
            let production = require(&record.production, NAME, "production")?;

            gross_income_total += i128::from(income.guaranteed_income);
            expense_total += i128::from(cost.operating_expense);
            net_profit_total += i128::from(outcome.net_profit);
            if !cost.zero_expense {
                n_valid_roi += 1;
                valid_expense += i128::from(cost.operating_expense);
                valid_net += i128::from(outcome.net_profit);
            }

            km_reference += record.raw.km_reference;
            km_platform += record.raw.km_platform;
            if let Some(r) = distance.optimization_ratio {
                ratios.push(r);
            }

            orders.push(f64::from(production.total_orders));
            profits.push(outcome.net_profit as f64);
        }

        let period_roi = if valid_expense == 0 {
            None
        } else {
            Some(round_to(valid_net as f64 / valid_expense as f64 * 100.0, 2))
        };

        let km_reference_total = round_to(km_reference, 2);
        let km_platform_total = round_to(km_platform, 2);

        let ratio_ci95 = statistics::t_interval(&ratios, RATIO_CONFIDENCE).map(|ci| {
            ConfidenceInterval {
                lo: round_to(ci.lo, 3),
                hi: round_to(ci.hi, 3),
            }
        });

        let regression = LinearFit::fit(&orders, &profits).map(RegressionModel::from);

        debug!(
            records = records.len(),
            defined_ratios = ratios.len(),
            has_regression = regression.is_some(),
            "Invariants recomputed"
        );

        Ok(InvariantSet {
            n_total: records.len(),
            n_valid_roi,
            gross_income_total: narrow(gross_income_total, "gross_income_total")?,
            expense_total: narrow(expense_total, "expense_total")?,
            net_profit_total: narrow(net_profit_total, "net_profit_total")?,
            period_roi,
            km_reference_total,
            km_platform_total,
            km_phantom_total: round_to(km_platform_total - km_reference_total, 2),
            ratio_mean: statistics::mean(&ratios).map(|m| round_to(m, 3)),
            ratio_median: statistics::median(&ratios).map(|m| round_to(m, 3)),
            ratio_ci95,
            regression,
        })
    }
}

fn narrow(total: i128, quantity: &'static str) -> Result<i64, PipelineError> {
    i64::try_from(total).map_err(|_| PipelineError::Overflow { quantity })
}
