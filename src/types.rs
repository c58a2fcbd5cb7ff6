//! Shared data structures for the shift ETL pipeline
//!
//! A [`ShiftRecord`] carries the raw input row plus one optional block per
//! feature stage. A block is `None` until its stage has run, which lets the
//! exporter project partial pipelines without confusing "not computed" with
//! "undefined". Inside a block, undefined ratios (zero denominators) are
//! themselves `Option<f64>`.

use serde::{Deserialize, Serialize};

// ============================================================================
// Raw Input
// ============================================================================

/// The nine columns every raw shift file must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "date",
    "start_time",
    "end_time",
    "km_reference",
    "km_platform",
    "gross_income",
    "orders_rocket",
    "orders_normal",
    "expense",
];

/// One operating shift as read from the raw file.
///
/// Date and time fields stay exact strings so leading zeros and literal
/// formatting survive until the time stage normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawShift {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// Distance from the independent map source (km)
    pub km_reference: f64,
    /// Distance reported by the delivery platform (km)
    pub km_platform: f64,
    /// Gross income in whole currency units
    pub gross_income: i64,
    /// Orders counted toward the platform's bonus goal
    pub orders_rocket: u32,
    pub orders_normal: u32,
    /// Operating expense; `None` when the cell was empty
    pub expense: Option<f64>,
    /// 1-based line in the source file, when loaded from one
    #[serde(skip)]
    pub source_line: Option<usize>,
}

// ============================================================================
// Stage Outputs
// ============================================================================

/// Time stage output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeFeatures {
    /// Shift length in hours (2 dp), midnight-corrected
    pub duration_hours: f64,
    /// Start hour inside the configured peak window
    pub peak_window: bool,
}

/// Distance stage output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceFeatures {
    /// `km_platform - km_reference` (2 dp)
    pub km_phantom: f64,
    /// `km_platform / km_reference` (4 dp); `None` when reference is zero
    pub optimization_ratio: Option<f64>,
}

/// Income decomposition. `base_income + bonus_income == guaranteed_income` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSplit {
    pub base_income: i64,
    pub bonus_income: i64,
    pub guaranteed_income: i64,
}

impl IncomeSplit {
    /// Bonus share of the guaranteed income (4 dp); `None` when income is zero.
    pub fn bonus_share(&self) -> Option<f64> {
        crate::etl::ratio(self.bonus_income as f64, self.guaranteed_income as f64, 4)
    }
}

/// Cost / integrity stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostFeatures {
    /// Expense coerced to whole currency units (missing -> 0)
    pub operating_expense: i64,
    /// Expense is zero: ROI will be null for this shift
    pub zero_expense: bool,
}

/// Outcome stage output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMetrics {
    pub net_profit: i64,
    /// Net profit per hour (2 dp); `None` for zero-length shifts
    pub profit_per_hour: Option<f64>,
    /// `(net / expense) * 100` (2 dp); `None` iff expense is zero
    pub daily_roi: Option<f64>,
    pub profitable: bool,
}

/// Production / efficiency stage output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionMetrics {
    pub total_orders: u32,
    pub progress_units: u32,
    /// `progress_units / total_orders` (4 dp)
    pub completion_efficiency: Option<f64>,
    pub km_per_order_reference: Option<f64>,
    pub km_per_order_platform: Option<f64>,
    /// Guaranteed income per reference km (2 dp)
    pub income_per_km_reference: Option<f64>,
    /// Guaranteed income per hour (2 dp)
    pub income_per_hour: Option<f64>,
}

/// Ratio-threshold classification. Never both true for a valid calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatioZone {
    pub optimal_zone: bool,
    pub critical_alert: bool,
}

// ============================================================================
// Shift Record
// ============================================================================

/// A raw shift enriched by whichever stages have run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub raw: RawShift,
    pub time: Option<TimeFeatures>,
    pub distance: Option<DistanceFeatures>,
    pub income: Option<IncomeSplit>,
    pub cost: Option<CostFeatures>,
    pub outcome: Option<OutcomeMetrics>,
    pub production: Option<ProductionMetrics>,
    pub zone: Option<RatioZone>,
}

impl From<RawShift> for ShiftRecord {
    fn from(raw: RawShift) -> Self {
        Self {
            raw,
            time: None,
            distance: None,
            income: None,
            cost: None,
            outcome: None,
            production: None,
            zone: None,
        }
    }
}

impl ShiftRecord {
    /// Optimization ratio, if the distance stage ran and the ratio is defined.
    pub fn optimization_ratio(&self) -> Option<f64> {
        self.distance.and_then(|d| d.optimization_ratio)
    }

    /// File line for error messages. Records built in memory fall back to
    /// `index + 2` (header on line 1).
    pub fn source_line(&self, index: usize) -> usize {
        self.raw.source_line.unwrap_or(index + 2)
    }
}
