//! Sample statistics behind the invariant set
//!
//! Location and spread of the optimization ratio, its t-based confidence
//! interval, and the ordinary-least-squares fit of net profit on orders.
//! Distribution functions come from the statrs crate.
//!
//! ## Key Features
//! - Mean, median and standard error of the mean (ddof = 1)
//! - Two-sided Student's t confidence interval with n-1 degrees of freedom
//! - Simple linear regression with Pearson r, R² and slope p-value
//! - Residual standard deviation (ddof = 1) under the fitted line

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::{Data, Median, Statistics};

/// Offsets `1 ± r` so a perfect fit yields a finite, huge t statistic.
const TINY: f64 = 1.0e-20;

// ============================================================================
// Location / Interval
// ============================================================================

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lo: f64,
    pub hi: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(Median::median(&Data::new(values.to_vec())))
    }
}

/// Sample standard deviation (n-1 denominator); `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else {
        Some(values.iter().std_dev())
    }
}

/// Two-sided t interval for the population mean at `confidence` (e.g. 0.95).
///
/// Uses the sample mean and the standard error of the mean. Needs at least
/// two values; a zero-spread sample collapses to the point `[mean, mean]`.
#[allow(clippy::cast_precision_loss)]
pub fn t_interval(values: &[f64], confidence: f64) -> Option<ConfidenceInterval> {
    let n = values.len();
    let sd = sample_std_dev(values)?;
    let center = mean(values)?;
    let sem = sd / (n as f64).sqrt();

    let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).ok()?;
    let t_crit = dist.inverse_cdf(0.5 + confidence / 2.0);

    Some(ConfidenceInterval {
        lo: center - t_crit * sem,
        hi: center + t_crit * sem,
    })
}

// ============================================================================
// Regression
// ============================================================================

/// Ordinary-least-squares fit of `y` on `x`, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient
    pub r: f64,
    /// Two-sided p-value for `slope != 0`
    pub p_value: f64,
    /// Standard deviation of `y - (slope*x + intercept)`, n-1 denominator
    pub residual_sigma: f64,
    pub sample_count: usize,
}

impl LinearFit {
    /// Fit `y = slope * x + intercept`.
    ///
    /// Returns `None` with fewer than three points, mismatched lengths, or
    /// constant `x` (slope undefined). Sums are taken around the means so
    /// exactly linear integer data recovers its slope without drift.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 3 || n != y.len() {
            return None;
        }

        let mean_x = x.iter().mean();
        let mean_y = y.iter().mean();

        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for (xi, yi) in x.iter().zip(y) {
            let dx = xi - mean_x;
            let dy = yi - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let r = if syy == 0.0 {
            0.0
        } else {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        };

        let residuals: Vec<f64> = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| yi - (slope * xi + intercept))
            .collect();

        Some(Self {
            slope,
            intercept,
            r,
            p_value: Self::p_value_for_r(r, n),
            residual_sigma: sample_std_dev(&residuals).unwrap_or(0.0),
            sample_count: n,
        })
    }

    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }

    /// Two-tailed p-value from Student's t with n-2 degrees of freedom.
    ///
    /// t = r * sqrt(df / ((1 - r)(1 + r)))
    #[allow(clippy::cast_precision_loss)]
    fn p_value_for_r(r: f64, n: usize) -> f64 {
        let df = (n - 2) as f64;
        let t_stat = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();

        match StudentsT::new(0.0, 1.0, df) {
            Ok(t_dist) => (2.0 * (1.0 - t_dist.cdf(t_stat.abs()))).clamp(0.0, 1.0),
            Err(_) => 1.0,
        }
    }
}
