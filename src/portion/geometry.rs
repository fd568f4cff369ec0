//! Polygon geometry
//!
//! Area, perimeter and circularity of a segmentation outline.

use std::f64::consts::PI;

use serde::Serialize;

use crate::models::Polygon;

/// Shape descriptors of one outline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeometryInfo {
    pub area: f64,
    pub perimeter: f64,
    /// 4π·area/perimeter². 1.0 for a circle; may exceed 1.0 slightly on
    /// coarse outlines.
    pub circularity: f64,
}

impl GeometryInfo {
    /// Convert pixel-space measurements to cm using a cm²/px² scale factor.
    /// Circularity is scale-invariant and is carried over as-is.
    pub fn to_real_units(&self, scale_factor: f64) -> GeometryInfo {
        GeometryInfo {
            area: self.area * scale_factor,
            perimeter: self.perimeter * scale_factor.sqrt(),
            circularity: self.circularity,
        }
    }

    /// Diameter of the circle with the same area
    pub fn equivalent_diameter(&self) -> f64 {
        2.0 * (self.area / PI).sqrt()
    }
}

/// Absolute shoelace area of a closed vertex ring
pub fn polygon_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    (twice_signed / 2.0).abs()
}

/// Closed perimeter, including the edge back to the first vertex
pub fn polygon_perimeter(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            (x2 - x1).hypot(y2 - y1)
        })
        .sum()
}

pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Analyze a detector outline.
///
/// Malformed vertices are dropped first; fewer than three remaining vertices
/// yield an all-zero result rather than an error.
pub fn analyze(polygon: &Polygon) -> GeometryInfo {
    let points = polygon.points();
    if points.len() < 3 {
        return GeometryInfo::default();
    }

    let area = polygon_area(&points);
    let perimeter = polygon_perimeter(&points);

    GeometryInfo {
        area,
        perimeter,
        circularity: circularity(area, perimeter),
    }
}
