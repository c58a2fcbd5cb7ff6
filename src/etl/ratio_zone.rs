//! Ratio-threshold features: optimal zone and critical alert.
//!
//! Both bands are closed on their lower side; the optimal band is also
//! closed on top. Config validation keeps `critical > optimal_max`, so a
//! record is never in both bands. An undefined ratio is in neither.

use super::{require, Stage};
use crate::config::{CalibrationConfig, RatioThresholds};
use crate::error::PipelineError;
use crate::types::{RatioZone, ShiftRecord};

pub fn classify_ratio(ratio: Option<f64>, thresholds: &RatioThresholds) -> RatioZone {
    ratio.map_or_else(RatioZone::default, |r| RatioZone {
        optimal_zone: thresholds.is_optimal(r),
        critical_alert: thresholds.is_critical(r),
    })
}

pub struct RatioZoneStage;

impl Stage for RatioZoneStage {
    fn name(&self) -> &'static str {
        "ratio_zone"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        for record in records.iter_mut() {
            let distance = require(&record.distance, self.name(), "distance")?;
            record.zone = Some(classify_ratio(
                distance.optimization_ratio,
                &calibration.ratio,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let t = RatioThresholds::default();
        assert!(classify_ratio(Some(1.73), &t).optimal_zone);
        assert!(classify_ratio(Some(1.84), &t).optimal_zone);
        assert!(classify_ratio(Some(2.0), &t).critical_alert);
        assert!(!classify_ratio(Some(2.0), &t).optimal_zone);
    }

    #[test]
    fn gap_between_bands_is_neutral() {
        let t = RatioThresholds::default();
        assert_eq!(classify_ratio(Some(1.9), &t), RatioZone::default());
        assert_eq!(classify_ratio(Some(1.7299), &t), RatioZone::default());
        assert_eq!(classify_ratio(Some(1.8401), &t), RatioZone::default());
    }

    #[test]
    fn undefined_ratio_is_in_no_band() {
        assert_eq!(
            classify_ratio(None, &RatioThresholds::default()),
            RatioZone::default()
        );
    }

    #[test]
    fn custom_thresholds_apply() {
        let t = RatioThresholds {
            optimal_min: 1.5,
            optimal_max: 1.6,
            critical: 1.8,
            low_activation: 1.2,
        };
        assert!(classify_ratio(Some(1.55), &t).optimal_zone);
        assert!(classify_ratio(Some(1.85), &t).critical_alert);
    }
}
