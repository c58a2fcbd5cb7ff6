//! Shift-DSS: Delivery Shift Decision Support
//!
//! Batch ETL over a gig-delivery driver's shift log, followed by period-level
//! recalibration and an operate / do-not-operate advisory.
//!
//! ## Architecture
//!
//! - **ETL Pipeline**: loader, seven feature stages, 28-column exporter
//! - **Invariant Calculator**: period ROI, ratio statistics, profit-on-orders regression
//! - **Decision Evaluator**: verdict for a hypothetical shift
//! - **HOPs**: seeded simulation of plausible regression outcomes
//! - **Dashboard contract**: KPIs read back from the processed file

pub mod config;
pub mod error;
pub mod types;
pub mod etl;
pub mod invariants;
pub mod decision;
pub mod hops;
pub mod dashboard;

// Re-export configuration
pub use config::{CalibrationConfig, ConfigError};

// Re-export errors and record types
pub use error::PipelineError;
pub use types::{RawShift, ShiftRecord};

// Re-export pipeline entry points
pub use etl::{Pipeline, PipelineRun, Stage};
pub use invariants::{InvariantCalculator, InvariantSet};

// Re-export advisory components
pub use decision::{Decision, DecisionEvaluator, ShiftQuery, Verdict};
pub use hops::{HopsError, HopsSimulation};
pub use dashboard::DashboardSummary;
