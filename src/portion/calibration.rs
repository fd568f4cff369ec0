//! Scale calibration
//!
//! Derives cm² per pixel² from cutlery of known size lying next to the plate.

use serde::Serialize;

use super::config::{EngineConfig, MarkerAreas};
use crate::catalog::normalize_category;
use crate::models::Detection;

/// Reference objects of known physical size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMarker {
    Fork,
    Spoon,
}

impl CalibrationMarker {
    /// Recognize a marker from a detector label.
    ///
    /// Accepts both the English and the Turkish detector labels
    /// ("catal", "kasik").
    pub fn from_category(category: &str) -> Option<Self> {
        match normalize_category(category).as_str() {
            "fork" | "catal" => Some(CalibrationMarker::Fork),
            "spoon" | "kasik" => Some(CalibrationMarker::Spoon),
            _ => None,
        }
    }

    pub fn area_cm2(&self, areas: &MarkerAreas) -> f64 {
        match self {
            CalibrationMarker::Fork => areas.fork_cm2,
            CalibrationMarker::Spoon => areas.spoon_cm2,
        }
    }
}

/// Median of a non-empty slice; mean of the middle pair for even lengths
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Scale candidate of one marker detection, if usable.
///
/// The bounding box is used instead of the outline: the box of a fork is far
/// more stable than its segmentation.
fn candidate(detection: &Detection, areas: &MarkerAreas) -> Option<f64> {
    let marker = CalibrationMarker::from_category(&detection.category)?;
    let bbox = detection.bbox?;
    let pixel_area = bbox.area();
    if !(pixel_area.is_finite() && pixel_area > 0.0) {
        return None;
    }
    Some(marker.area_cm2(areas) / pixel_area)
}

/// Compute the cm²/px² scale factor from marker detections.
///
/// Non-marker detections and markers with an empty box are ignored. With no
/// usable marker the configured default is returned, so the result is always
/// strictly positive.
pub fn compute_scale_factor(detections: &[Detection], config: &EngineConfig) -> f64 {
    let mut candidates: Vec<f64> = detections
        .iter()
        .filter_map(|d| candidate(d, &config.marker_areas))
        .collect();

    match median(&mut candidates) {
        Some(scale) => {
            tracing::debug!(
                "Scale factor {:.6} cm²/px² from {} marker(s)",
                scale,
                candidates.len()
            );
            scale
        }
        None => {
            tracing::debug!(
                "No calibration markers, using default scale factor {}",
                config.default_scale_factor
            );
            config.default_scale_factor
        }
    }
}
