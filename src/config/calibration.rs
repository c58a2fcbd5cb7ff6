//! Calibration Configuration - every model constant as an overridable TOML value
//!
//! Each struct implements `Default` with the values calibrated on the
//! historical sample, so running without a file reproduces the reference
//! behaviour exactly. The defaults here are the single source of truth: the
//! decision evaluator and the outcome simulator read the same structs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable pointing at a calibration TOML file.
pub const CONFIG_ENV_VAR: &str = "SHIFT_DSS_CONFIG";

/// File looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "calibration.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root calibration for the pipeline, decision rules and simulator.
///
/// Load with `CalibrationConfig::load()` which searches:
/// 1. `$SHIFT_DSS_CONFIG` env var
/// 2. `./calibration.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Regression model used for projected profit
    #[serde(default)]
    pub model: ModelCalibration,

    /// Optimization-ratio bands
    #[serde(default)]
    pub ratio: RatioThresholds,

    /// Peak-hour window
    #[serde(default)]
    pub peak: PeakWindow,

    /// Income decomposition
    #[serde(default)]
    pub income: IncomeSplitConfig,

    /// Outcome simulation
    #[serde(default)]
    pub hops: HopsConfig,

    /// Default file locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl CalibrationConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SHIFT_DSS_CONFIG` environment variable
    /// 2. `./calibration.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded calibration from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load calibration from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded calibration from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No calibration file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file, so consumers can share one calibration artifact.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Calibration saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - optimal_min <= optimal_max < critical (zone flags stay exclusive)
    /// - low_activation < optimal_min
    /// - 0 <= peak start < end <= 24
    /// - 0 < base_share < 1, 0 < critical_efficiency_factor <= 1
    /// - residual_sigma > 0; simulator sizes >= 2; orders_min < orders_max
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let floats = [
            ("model.order_slope", self.model.order_slope),
            ("model.intercept", self.model.intercept),
            ("model.residual_sigma", self.model.residual_sigma),
            (
                "model.critical_efficiency_factor",
                self.model.critical_efficiency_factor,
            ),
            ("ratio.optimal_min", self.ratio.optimal_min),
            ("ratio.optimal_max", self.ratio.optimal_max),
            ("ratio.critical", self.ratio.critical),
            ("ratio.low_activation", self.ratio.low_activation),
            ("income.base_share", self.income.base_share),
            ("hops.orders_min", self.hops.orders_min),
            ("hops.orders_max", self.hops.orders_max),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                errors.push(format!("{name} must be a finite number (got {value})"));
            }
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let r = &self.ratio;
        if r.optimal_min > r.optimal_max {
            errors.push(format!(
                "ratio.optimal_min ({:.3}) must be <= optimal_max ({:.3})",
                r.optimal_min, r.optimal_max
            ));
        }
        if r.critical <= r.optimal_max {
            errors.push(format!(
                "ratio.critical ({:.3}) must be > optimal_max ({:.3})",
                r.critical, r.optimal_max
            ));
        }
        if r.low_activation >= r.optimal_min {
            errors.push(format!(
                "ratio.low_activation ({:.3}) must be < optimal_min ({:.3})",
                r.low_activation, r.optimal_min
            ));
        }

        let p = &self.peak;
        if p.start_hour >= p.end_hour || p.end_hour > 24 {
            errors.push(format!(
                "peak window [{}, {}) must satisfy start < end <= 24",
                p.start_hour, p.end_hour
            ));
        }

        let share = self.income.base_share;
        if share <= 0.0 || share >= 1.0 {
            errors.push(format!(
                "income.base_share ({share}) must be strictly between 0 and 1"
            ));
        }

        let m = &self.model;
        if m.residual_sigma <= 0.0 {
            errors.push("model.residual_sigma must be > 0".to_string());
        }
        if m.critical_efficiency_factor <= 0.0 || m.critical_efficiency_factor > 1.0 {
            errors.push(format!(
                "model.critical_efficiency_factor ({}) must be in (0, 1]",
                m.critical_efficiency_factor
            ));
        }

        let h = &self.hops;
        if h.trajectories < 2 {
            errors.push("hops.trajectories must be >= 2".to_string());
        }
        if h.grid_points < 2 {
            errors.push("hops.grid_points must be >= 2".to_string());
        }
        if h.orders_min >= h.orders_max {
            errors.push(format!(
                "hops.orders_min ({}) must be < orders_max ({})",
                h.orders_min, h.orders_max
            ));
        }

        if errors.is_empty() {
            for w in super::validation::validate_plausible_ranges(self) {
                warn!("{}", w);
            }
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Regression Model
// ============================================================================

/// Closed-form model `net_profit = order_slope * orders + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelCalibration {
    /// Currency per additional physical order
    #[serde(default = "default_order_slope")]
    pub order_slope: f64,

    #[serde(default = "default_intercept")]
    pub intercept: f64,

    /// Standard deviation of the model residuals (currency)
    #[serde(default = "default_residual_sigma")]
    pub residual_sigma: f64,

    /// Projected-profit multiplier applied only when the ratio is critical.
    /// Empirical; re-derive whenever the historical sample changes.
    #[serde(default = "default_critical_efficiency_factor")]
    pub critical_efficiency_factor: f64,
}

fn default_order_slope() -> f64 { 14_940.0 }
fn default_intercept() -> f64 { -54_378.0 }
fn default_residual_sigma() -> f64 { 51_320.0 }
fn default_critical_efficiency_factor() -> f64 { 0.973 }

impl Default for ModelCalibration {
    fn default() -> Self {
        Self {
            order_slope: default_order_slope(),
            intercept: default_intercept(),
            residual_sigma: default_residual_sigma(),
            critical_efficiency_factor: default_critical_efficiency_factor(),
        }
    }
}

// ============================================================================
// Ratio Thresholds
// ============================================================================

/// Bands applied to the optimization ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioThresholds {
    /// Inclusive lower bound of the optimal zone
    #[serde(default = "default_optimal_min")]
    pub optimal_min: f64,

    /// Inclusive upper bound of the optimal zone
    #[serde(default = "default_optimal_max")]
    pub optimal_max: f64,

    /// Inclusive lower bound of the critical alert
    #[serde(default = "default_critical")]
    pub critical: f64,

    /// Below this the decision rules ask to evaluate viability
    #[serde(default = "default_low_activation")]
    pub low_activation: f64,
}

fn default_optimal_min() -> f64 { 1.73 }
fn default_optimal_max() -> f64 { 1.84 }
fn default_critical() -> f64 { 2.00 }
fn default_low_activation() -> f64 { 1.30 }

impl Default for RatioThresholds {
    fn default() -> Self {
        Self {
            optimal_min: default_optimal_min(),
            optimal_max: default_optimal_max(),
            critical: default_critical(),
            low_activation: default_low_activation(),
        }
    }
}

impl RatioThresholds {
    pub fn is_optimal(&self, ratio: f64) -> bool {
        ratio >= self.optimal_min && ratio <= self.optimal_max
    }

    pub fn is_critical(&self, ratio: f64) -> bool {
        ratio >= self.critical
    }
}

// ============================================================================
// Peak Window
// ============================================================================

/// Half-open start-hour window `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    #[serde(default = "default_peak_start")]
    pub start_hour: u32,

    #[serde(default = "default_peak_end")]
    pub end_hour: u32,
}

fn default_peak_start() -> u32 { 17 }
fn default_peak_end() -> u32 { 21 }

impl Default for PeakWindow {
    fn default() -> Self {
        Self {
            start_hour: default_peak_start(),
            end_hour: default_peak_end(),
        }
    }
}

impl PeakWindow {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

// ============================================================================
// Income Split
// ============================================================================

/// Fixed base/bonus proportion.
///
/// Historical-sample average; replace with per-shift values once the
/// platform exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomeSplitConfig {
    #[serde(default = "default_base_share")]
    pub base_share: f64,
}

fn default_base_share() -> f64 { 0.521 }

impl Default for IncomeSplitConfig {
    fn default() -> Self {
        Self {
            base_share: default_base_share(),
        }
    }
}

// ============================================================================
// Outcome Simulation
// ============================================================================

/// Hypothetical outcome plot parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HopsConfig {
    #[serde(default = "default_trajectories")]
    pub trajectories: usize,

    #[serde(default = "default_grid_points")]
    pub grid_points: usize,

    #[serde(default = "default_orders_min")]
    pub orders_min: f64,

    #[serde(default = "default_orders_max")]
    pub orders_max: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_trajectories() -> usize { 50 }
fn default_grid_points() -> usize { 50 }
fn default_orders_min() -> f64 { 1.0 }
fn default_orders_max() -> f64 { 25.0 }
fn default_seed() -> u64 { 42 }

impl Default for HopsConfig {
    fn default() -> Self {
        Self {
            trajectories: default_trajectories(),
            grid_points: default_grid_points(),
            orders_min: default_orders_min(),
            orders_max: default_orders_max(),
            seed: default_seed(),
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw shift file (source of truth)
    #[serde(default = "default_raw_path")]
    pub raw: PathBuf,

    /// Enriched 28-column export
    #[serde(default = "default_processed_path")]
    pub processed: PathBuf,
}

fn default_raw_path() -> PathBuf {
    PathBuf::from("data/raw/shifts.csv")
}
fn default_processed_path() -> PathBuf {
    PathBuf::from("data/processed/shifts_processed.csv")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_path(),
            processed: default_processed_path(),
        }
    }
}
