//! Distance features: phantom km and the optimization ratio.

use super::{ratio, round_to, Stage};
use crate::config::CalibrationConfig;
use crate::error::PipelineError;
use crate::types::{DistanceFeatures, RawShift, ShiftRecord};

/// Platform km minus reference km (2 dp), plus platform/reference (4 dp).
///
/// A zero reference distance leaves the ratio undefined (`None`).
pub fn distance_features(raw: &RawShift) -> DistanceFeatures {
    DistanceFeatures {
        km_phantom: round_to(raw.km_platform - raw.km_reference, 2),
        optimization_ratio: ratio(raw.km_platform, raw.km_reference, 4),
    }
}

pub struct DistanceStage;

impl Stage for DistanceStage {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        _calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        let mut undefined = 0usize;
        for record in records.iter_mut() {
            let features = distance_features(&record.raw);
            if features.optimization_ratio.is_none() {
                undefined += 1;
            }
            record.distance = Some(features);
        }
        if undefined > 0 {
            tracing::warn!(
                shifts = undefined,
                "Zero reference distance: optimization ratio undefined for these shifts"
            );
        }
        Ok(())
    }
}
