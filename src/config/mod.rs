//! Calibration Configuration Module
//!
//! Provides the model constants (regression coefficients, ratio bands, peak
//! window, income split, simulator sizes) loaded from TOML, replacing
//! hardcoded literals with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `SHIFT_DSS_CONFIG` environment variable (path to TOML file)
//! 2. `calibration.toml` in the current working directory
//! 3. Built-in defaults (the calibrated values)
//!
//! ## Usage
//!
//! The config is an explicit value, passed to whatever needs it:
//!
//! ```ignore
//! let calibration = CalibrationConfig::load();
//! let run = Pipeline::standard(calibration.clone()).run(&raw, &processed)?;
//! ```

mod calibration;
pub mod validation;

pub use calibration::*;
