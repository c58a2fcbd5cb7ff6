//! Decision-Rule Evaluator
//!
//! Classifies a hypothetical shift from three inputs: projected orders,
//! observed optimization ratio and projected start time. The regression
//! model comes from the calibration file or from a freshly recomputed
//! [`InvariantSet`], so both surfaces read one set of constants.
//!
//! ## Verdict precedence
//! 1. ratio >= critical             -> do not operate
//! 2. optimal_min <= ratio <= max   -> operate
//! 3. ratio < low_activation        -> evaluate viability
//! 4. otherwise                     -> monitor

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{CalibrationConfig, ModelCalibration, PeakWindow, RatioThresholds};
use crate::error::PipelineError;
use crate::etl::time::is_peak_start;
use crate::etl::ratio_zone::classify_ratio;
use crate::invariants::InvariantSet;
use crate::types::RatioZone;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Operate,
    Monitor,
    EvaluateViability,
    DoNotOperate,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Self::Operate => "OPERATE",
            Self::Monitor => "MONITOR",
            Self::EvaluateViability => "EVALUATE VIABILITY",
            Self::DoNotOperate => "DO NOT OPERATE",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A hypothetical shift to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftQuery {
    pub orders: u32,
    pub ratio: f64,
    /// Projected start, `HH:MM`
    pub start_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: String,
    pub peak_window: bool,
    pub zone: RatioZone,
    pub efficiency_factor: f64,
    /// `trunc(slope * orders + intercept)`
    pub expected_profit: i64,
    /// `trunc(expected_profit * efficiency_factor)`
    pub adjusted_profit: i64,
}

// ============================================================================
// Recalibration
// ============================================================================

/// Replace slope, intercept and residual sigma with the values recomputed
/// from `invariants`. Keeps `base` when the sample has no regression.
pub fn recalibrate(base: &ModelCalibration, invariants: &InvariantSet) -> ModelCalibration {
    match &invariants.regression {
        Some(fit) => ModelCalibration {
            order_slope: fit.slope,
            intercept: fit.intercept,
            residual_sigma: fit.residual_sigma,
            critical_efficiency_factor: base.critical_efficiency_factor,
        },
        None => {
            warn!(
                shifts = invariants.n_total,
                "Sample too small for a regression; keeping configured model"
            );
            *base
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

pub struct DecisionEvaluator {
    model: ModelCalibration,
    thresholds: RatioThresholds,
    peak: PeakWindow,
}

impl DecisionEvaluator {
    pub fn new(calibration: &CalibrationConfig) -> Self {
        Self {
            model: calibration.model,
            thresholds: calibration.ratio,
            peak: calibration.peak,
        }
    }

    /// Evaluator whose regression model comes from a recomputed sample.
    pub fn recalibrated(calibration: &CalibrationConfig, invariants: &InvariantSet) -> Self {
        let mut evaluator = Self::new(calibration);
        evaluator.model = recalibrate(&calibration.model, invariants);
        evaluator
    }

    pub fn model(&self) -> &ModelCalibration {
        &self.model
    }

    /// Point estimate of net profit for `orders`, truncated toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn expected_profit(&self, orders: u32) -> i64 {
        (self.model.order_slope * f64::from(orders) + self.model.intercept).trunc() as i64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn evaluate(&self, query: &ShiftQuery) -> Result<Decision, PipelineError> {
        if !query.ratio.is_finite() || query.ratio < 0.0 {
            return Err(PipelineError::format(
                "ratio",
                format!("expected a non-negative ratio, got {}", query.ratio),
            ));
        }

        let t = &self.thresholds;
        let ratio = query.ratio;
        let peak_window = is_peak_start(&query.start_time, &self.peak)?;
        let zone = classify_ratio(Some(ratio), t);

        let efficiency_factor = if zone.critical_alert {
            self.model.critical_efficiency_factor
        } else {
            1.0
        };
        let expected_profit = self.expected_profit(query.orders);
        let adjusted_profit = (expected_profit as f64 * efficiency_factor).trunc() as i64;

        let (verdict, reason) = if zone.critical_alert {
            (
                Verdict::DoNotOperate,
                format!(
                    "ratio {ratio:.2} >= {} : completion efficiency expected to drop ~{:.1}%, change zone",
                    t.critical,
                    (1.0 - self.model.critical_efficiency_factor) * 100.0
                ),
            )
        } else if zone.optimal_zone {
            (
                Verdict::Operate,
                format!(
                    "ratio {ratio:.2} inside optimal zone [{}, {}]: maximum expected profit",
                    t.optimal_min, t.optimal_max
                ),
            )
        } else if ratio < t.low_activation {
            (
                Verdict::EvaluateViability,
                format!(
                    "ratio {ratio:.2} < {} : algorithmic under-activation, bonus at risk",
                    t.low_activation
                ),
            )
        } else {
            (
                Verdict::Monitor,
                format!("ratio {ratio:.2} outside optimal zone: keep watching the ratio"),
            )
        };

        debug!(
            verdict = %verdict,
            orders = query.orders,
            ratio,
            expected_profit,
            adjusted_profit,
            "Shift evaluated"
        );

        Ok(Decision {
            verdict,
            reason,
            peak_window,
            zone,
            efficiency_factor,
            expected_profit,
            adjusted_profit,
        })
    }
}
