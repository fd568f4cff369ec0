//! Height estimation
//!
//! A top-down photo shows only the footprint of a serving. Its height is the
//! catalog's base height scaled by a per-group multiplier derived from the
//! footprint size and roundness.

use super::geometry::GeometryInfo;
use super::shape::{FlatDish, IrregularDish, ShapeGroup};

pub const MIN_HEIGHT_MULTIPLIER: f64 = 0.4;
pub const MAX_HEIGHT_MULTIPLIER: f64 = 1.8;

impl ShapeGroup {
    /// Unclamped height multiplier for a footprint in real units (cm²)
    pub fn height_multiplier(&self, geometry: &GeometryInfo) -> f64 {
        let area = geometry.area;
        let circularity = geometry.circularity;
        let diameter = geometry.equivalent_diameter();

        match self {
            // wide shallow plates read thinner, small deep bowls thicker
            ShapeGroup::Liquid => {
                if diameter > 8.0 {
                    0.6
                } else if diameter > 5.0 {
                    0.8
                } else {
                    1.3
                }
            }
            ShapeGroup::Flat(FlatDish::Pasta) => 0.6 + circularity * 0.4,
            ShapeGroup::Flat(FlatDish::Salad) => 0.8 + circularity * 0.3,
            ShapeGroup::Flat(FlatDish::Other) => 0.5 + circularity * 0.3,
            // larger mounds pile higher, capped at 1.5x the 8cm reference
            ShapeGroup::Dome => 0.9 + (diameter / 8.0).min(1.5) * 0.4,
            ShapeGroup::Irregular(IrregularDish::ChickenLeg) => 1.1 + (area / 20.0).min(0.5),
            ShapeGroup::Irregular(IrregularDish::Beans) => 0.8 + circularity * 0.3,
            ShapeGroup::Irregular(IrregularDish::Other) => 1.0,
            ShapeGroup::Default => 1.0,
        }
    }

    /// Estimated serving height in cm
    pub fn estimate_height(&self, geometry: &GeometryInfo, base_height_cm: f64) -> f64 {
        let multiplier = self
            .height_multiplier(geometry)
            .clamp(MIN_HEIGHT_MULTIPLIER, MAX_HEIGHT_MULTIPLIER);
        base_height_cm * multiplier
    }
}

/// Estimate the height of a serving of `category` (normalized id).
///
/// `geometry` must already be in real units: area in cm², circularity as
/// measured in pixel space.
pub fn estimate_height(category: &str, geometry: &GeometryInfo, base_height_cm: f64) -> f64 {
    ShapeGroup::for_category(category).estimate_height(geometry, base_height_cm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Geometry whose equivalent diameter is `d` cm
    fn disc(d: f64, circularity: f64) -> GeometryInfo {
        GeometryInfo {
            area: PI * (d / 2.0).powi(2),
            perimeter: PI * d,
            circularity,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_liquid_steps() {
        assert!(close(estimate_height("corba", &disc(10.0, 0.9), 2.0), 1.2));
        assert!(close(estimate_height("corba", &disc(6.0, 0.9), 2.0), 1.6));
        assert!(close(estimate_height("corba", &disc(7.9, 0.9), 2.0), 1.6));
        assert!(close(estimate_height("corba", &disc(4.0, 0.9), 2.0), 2.6));
        assert!(close(estimate_height("corba", &disc(4.9, 0.9), 2.0), 2.6));
    }

    #[test]
    fn test_flat_dishes_follow_circularity() {
        assert!(close(estimate_height("makarna", &disc(12.0, 0.5), 2.0), 2.0 * 0.8));
        assert!(close(estimate_height("salata", &disc(12.0, 1.0), 2.0), 2.0 * 1.1));
        assert!(close(estimate_height("cig_kofte", &disc(12.0, 0.0), 2.0), 2.0 * 0.5));
        assert!(close(estimate_height("tavuk_kul_basti", &disc(12.0, 1.0), 1.0), 0.8));
    }

    #[test]
    fn test_dome_grows_with_size_then_caps() {
        assert!(close(estimate_height("pirinc_pilav", &disc(8.0, 0.8), 3.0), 3.0 * 1.3));
        assert!(close(estimate_height("bulgur_pilav", &disc(4.0, 0.8), 3.0), 3.0 * 1.1));
        assert!(close(estimate_height("pirinc_pilav", &disc(40.0, 0.8), 3.0), 3.0 * 1.5));
    }

    #[test]
    fn test_irregular_rules() {
        let small = GeometryInfo { area: 4.0, perimeter: 8.0, circularity: 0.6 };
        assert!(close(estimate_height("tavuk_but", &small, 2.0), 2.0 * 1.3));
        let large = GeometryInfo { area: 200.0, perimeter: 60.0, circularity: 0.6 };
        assert!(close(estimate_height("tavuk_but", &large, 2.0), 2.0 * 1.6));

        assert!(close(estimate_height("kuru_fasulye", &disc(10.0, 1.0), 2.0), 2.0 * 1.1));
        assert!(close(estimate_height("tavuk_sote", &disc(10.0, 0.2), 2.0), 2.0));
    }

    #[test]
    fn test_unknown_category_is_unadjusted() {
        assert!(close(estimate_height("baklava", &disc(3.0, 0.1), 2.5), 2.5));
    }

    #[test]
    fn test_multiplier_is_clamped() {
        // circularity above 1 from a coarse outline can push multipliers past the cap
        let noisy = GeometryInfo { area: 50.0, perimeter: 20.0, circularity: 5.0 };
        assert!(close(estimate_height("makarna", &noisy, 1.0), MAX_HEIGHT_MULTIPLIER));

        let zero = GeometryInfo::default();
        assert!(close(estimate_height("cig_kofte", &zero, 1.0), 0.5));
        assert!(close(estimate_height("corba", &zero, 1.0), 1.3));
    }
}
