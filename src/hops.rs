//! Hypothetical Outcome Plots
//!
//! Seeded simulation of plausible regression outcomes. Each trajectory adds
//! independent `N(0, residual_sigma)` noise to the fitted line at every grid
//! point; the 5th/95th percentiles per grid point give a 90% outcome band.
//! The same seed and calibration always produce the same output.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{HopsConfig, ModelCalibration};

pub const LOWER_PERCENTILE: f64 = 5.0;
pub const UPPER_PERCENTILE: f64 = 95.0;

#[derive(Error, Debug)]
pub enum HopsError {
    #[error("Residual sigma must be finite and non-negative, got {0}")]
    InvalidSigma(f64),

    #[error("{field} must be at least 2, got {value}")]
    TooFew { field: &'static str, value: usize },

    #[error("Order range is empty: {min} >= {max}")]
    EmptyRange { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopsSimulation {
    /// Evenly spaced order counts
    pub grid: Vec<f64>,
    /// Fitted line at each grid point
    pub mean_line: Vec<f64>,
    /// One simulated profit path per row
    pub trajectories: Vec<Vec<f64>>,
    pub band_lower: Vec<f64>,
    pub band_upper: Vec<f64>,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Run the simulation.
pub fn simulate(model: &ModelCalibration, config: &HopsConfig) -> Result<HopsSimulation, HopsError> {
    if config.trajectories < 2 {
        return Err(HopsError::TooFew {
            field: "trajectories",
            value: config.trajectories,
        });
    }
    if config.grid_points < 2 {
        return Err(HopsError::TooFew {
            field: "grid_points",
            value: config.grid_points,
        });
    }
    if config.orders_min >= config.orders_max {
        return Err(HopsError::EmptyRange {
            min: config.orders_min,
            max: config.orders_max,
        });
    }
    if !model.residual_sigma.is_finite() || model.residual_sigma < 0.0 {
        return Err(HopsError::InvalidSigma(model.residual_sigma));
    }
    let noise = Normal::new(0.0, model.residual_sigma)
        .map_err(|_| HopsError::InvalidSigma(model.residual_sigma))?;

    let grid = linspace(config.orders_min, config.orders_max, config.grid_points);
    let mean_line: Vec<f64> = grid
        .iter()
        .map(|x| model.order_slope * x + model.intercept)
        .collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let trajectories: Vec<Vec<f64>> = (0..config.trajectories)
        .map(|_| mean_line.iter().map(|y| y + noise.sample(&mut rng)).collect())
        .collect();

    let mut band_lower = Vec::with_capacity(grid.len());
    let mut band_upper = Vec::with_capacity(grid.len());
    let mut column = Vec::with_capacity(trajectories.len());
    for i in 0..grid.len() {
        column.clear();
        column.extend(trajectories.iter().map(|t| t[i]));
        // Column is never empty: trajectories >= 2 was checked above.
        band_lower.push(percentile(&column, LOWER_PERCENTILE).unwrap_or(mean_line[i]));
        band_upper.push(percentile(&column, UPPER_PERCENTILE).unwrap_or(mean_line[i]));
    }

    debug!(
        trajectories = config.trajectories,
        grid_points = config.grid_points,
        seed = config.seed,
        "HOPs simulated"
    );

    Ok(HopsSimulation {
        grid,
        mean_line,
        trajectories,
        band_lower,
        band_upper,
    })
}
