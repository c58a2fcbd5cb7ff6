//! Production and efficiency: order totals and per-unit ratios.

use super::{ratio, require, Stage};
use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::types::{IncomeSplit, ProductionMetrics, RawShift, ShiftRecord, TimeFeatures};

/// Every ratio is `None` when its denominator is zero. Fails when the two
/// order counts do not fit in one total.
#[allow(clippy::cast_precision_loss)]
pub fn production_metrics(
    raw: &RawShift,
    time: &TimeFeatures,
    income: &IncomeSplit,
) -> Result<ProductionMetrics, PipelineError> {
    let total_orders = raw
        .orders_rocket
        .checked_add(raw.orders_normal)
        .ok_or_else(|| {
            PipelineError::format(
                "orders_normal",
                format!(
                    "order total {} + {} overflows",
                    raw.orders_rocket, raw.orders_normal
                ),
            )
        })?;
    let orders = f64::from(total_orders);
    let guaranteed = income.guaranteed_income as f64;

    Ok(ProductionMetrics {
        total_orders,
        progress_units: raw.orders_rocket,
        completion_efficiency: ratio(f64::from(raw.orders_rocket), orders, 4),
        km_per_order_reference: ratio(raw.km_reference, orders, 4),
        km_per_order_platform: ratio(raw.km_platform, orders, 4),
        income_per_km_reference: ratio(guaranteed, raw.km_reference, 2),
        income_per_hour: ratio(guaranteed, time.duration_hours, 2),
    })
}

pub struct ProductionStage;

impl Stage for ProductionStage {
    fn name(&self) -> &'static str {
        "production"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        _calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        for (idx, record) in records.iter_mut().enumerate() {
            let time = require(&record.time, self.name(), "time")?;
            let income = require(&record.income, self.name(), "income")?;
            let metrics = production_metrics(&record.raw, time, income)
                .map_err(|e| e.at_line(record.source_line(idx)))?;
            record.production = Some(metrics);
        }
        Ok(())
    }
}
