//! Volume model
//!
//! Approximates a serving's volume from its footprint and estimated height.

use std::f64::consts::PI;

use super::geometry::GeometryInfo;
use super::shape::ShapeGroup;

/// Smallest volume ever reported, in cm³
pub const MIN_VOLUME_CM3: f64 = 0.1;

const FLATNESS_FACTOR: f64 = 0.85;
const IRREGULARITY_FACTOR: f64 = 0.75;
/// Above this circularity an irregular dish is treated as a mound
const ROUND_THRESHOLD: f64 = 0.7;

/// (2/3)·π·r²·h over the equivalent-area radius
fn half_ellipsoid(area_cm2: f64, height_cm: f64) -> f64 {
    let radius = (area_cm2 / PI).sqrt();
    (2.0 / 3.0) * PI * radius * radius * height_cm
}

impl ShapeGroup {
    /// Volume in cm³, never below [`MIN_VOLUME_CM3`]
    pub fn compute_volume(&self, area_cm2: f64, height_cm: f64, geometry: &GeometryInfo) -> f64 {
        let prism = area_cm2 * height_cm;
        let volume = match self {
            ShapeGroup::Liquid => prism,
            ShapeGroup::Flat(_) => prism * FLATNESS_FACTOR,
            ShapeGroup::Dome => half_ellipsoid(area_cm2, height_cm),
            ShapeGroup::Irregular(_) => {
                if geometry.circularity > ROUND_THRESHOLD {
                    half_ellipsoid(area_cm2, height_cm)
                } else {
                    prism * IRREGULARITY_FACTOR
                }
            }
            ShapeGroup::Default => prism,
        };
        volume.max(MIN_VOLUME_CM3)
    }
}

/// Volume of a serving of `category` (normalized id)
pub fn compute_volume(category: &str, area_cm2: f64, height_cm: f64, geometry: &GeometryInfo) -> f64 {
    ShapeGroup::for_category(category).compute_volume(area_cm2, height_cm, geometry)
}
