//! Portion estimation engine
//!
//! Turns detector output into priced, nutrition-scaled plate items:
//!
//! outline -> geometry -> real area (via cutlery calibration) -> height ->
//! volume -> mass -> quantized portion -> price / calories / nutrients.
//!
//! The engine holds only immutable configuration, so one instance can serve
//! any number of concurrent requests.

pub mod calibration;
pub mod config;
pub mod geometry;
pub mod height;
pub mod quantity;
pub mod shape;
pub mod volume;

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

pub use calibration::{compute_scale_factor, CalibrationMarker};
pub use config::{EngineConfig, MarkerAreas};
pub use geometry::GeometryInfo;
pub use shape::ShapeGroup;

use crate::catalog::{self, normalize_category, FoodLookup};
use crate::db::DbError;
use crate::models::{BoundingBox, Detection, FoodRecord, ItemError, MalformedDetection, NutrientMap, Polygon};
use crate::nutrition::scale_nutrients;

/// Request-level failures
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Food catalog lookup failed: {0}")]
    Lookup(#[from] DbError),
}

/// Portion-adjusted values for one portion-based item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortionResult {
    pub portion: f64,
    pub scaled_price: f64,
    pub scaled_calories: i64,
    pub scaled_nutrients: NutrientMap,
}

/// Intermediate quantities behind a portion estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortionMeasurement {
    pub shape_group: &'static str,
    pub pixel_area: f64,
    pub real_area_cm2: f64,
    pub circularity: f64,
    pub estimated_height_cm: f64,
    pub volume_cm3: f64,
    pub mass_g: f64,
    pub raw_portion: f64,
}

/// A priced detection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDetection {
    #[serde(rename = "class")]
    pub category: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    #[serde(rename = "segments")]
    pub polygon: Polygon,
    /// Catalog entry as stored (unit price and calories)
    pub food_info: FoodRecord,
    /// What this item adds to the totals
    pub price: f64,
    pub calories: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portion: Option<PortionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<PortionMeasurement>,
}

/// A detection left out of the result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub index: usize,
    pub category: String,
    pub error: String,
}

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortionReport {
    pub data: Vec<EnrichedDetection>,
    pub failures: Vec<ItemFailure>,
    pub scale_factor: f64,
    pub total_price: f64,
    pub total_calories: i64,
    /// Seconds spent in the engine
    pub processing_time: f64,
}

/// Physical parameters of a portion-based record after defaults
#[derive(Debug, Clone, Copy, PartialEq)]
struct PhysicalParams {
    base_height_cm: f64,
    density_g_per_cm3: f64,
    reference_mass_g: f64,
}

/// Round a price to cents
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default)]
pub struct PortionEngine {
    config: EngineConfig,
}

impl PortionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fill in missing physical parameters from the configured defaults.
    ///
    /// Height and density must be positive to be used. The reference mass is
    /// kept even when non-positive; portion calculation treats that as a
    /// neutral single serving.
    fn physical_params(&self, record: &FoodRecord) -> PhysicalParams {
        let positive_or = |value: Option<f64>, default: f64, what: &str| match value {
            Some(v) if v > 0.0 => v,
            Some(v) => {
                tracing::warn!("'{}' has non-positive {} ({}), using default {}", record.id, what, v, default);
                default
            }
            None => default,
        };

        PhysicalParams {
            base_height_cm: positive_or(record.base_height_cm, self.config.default_height_cm, "base height"),
            density_g_per_cm3: positive_or(
                record.density_g_per_cm3,
                self.config.default_density_g_per_cm3,
                "density",
            ),
            reference_mass_g: record
                .reference_mass_g
                .unwrap_or(self.config.default_reference_mass_g),
        }
    }

    /// Estimate the portion of one portion-based item
    pub fn estimate_portion(
        &self,
        category: &str,
        polygon: &Polygon,
        record: &FoodRecord,
        scale_factor: f64,
    ) -> (PortionResult, PortionMeasurement) {
        let params = self.physical_params(record);
        let group = ShapeGroup::for_category(&normalize_category(category));

        let pixel_geometry = geometry::analyze(polygon);
        let real_geometry = pixel_geometry.to_real_units(scale_factor);

        let height_cm = group.estimate_height(&real_geometry, params.base_height_cm);
        let volume_cm3 = group.compute_volume(real_geometry.area, height_cm, &real_geometry);
        let quantity = quantity::calculate(volume_cm3, params.density_g_per_cm3, params.reference_mass_g);
        let portion = quantity.portion;

        tracing::debug!(
            "{}: group={} area={:.2}px² real={:.2}cm² height={:.2}cm volume={:.2}cm³ mass={:.2}g raw={:.2} portion={}",
            record.name,
            group.name(),
            pixel_geometry.area,
            real_geometry.area,
            height_cm,
            volume_cm3,
            quantity.mass_g,
            quantity.raw_portion,
            portion
        );

        let result = PortionResult {
            portion,
            scaled_price: round2(record.price * portion),
            scaled_calories: (record.calories as f64 * portion) as i64,
            scaled_nutrients: scale_nutrients(&record.nutrition, portion),
        };
        let measurement = PortionMeasurement {
            shape_group: group.name(),
            pixel_area: pixel_geometry.area,
            real_area_cm2: real_geometry.area,
            circularity: real_geometry.circularity,
            estimated_height_cm: height_cm,
            volume_cm3,
            mass_g: quantity.mass_g,
            raw_portion: quantity.raw_portion,
        };
        (result, measurement)
    }

    fn process_one(&self, detection: &Detection, scale_factor: f64) -> Result<EnrichedDetection, ItemError> {
        let bbox = detection.validate()?;
        let record = detection
            .food_info
            .clone()
            .ok_or_else(|| ItemError::MissingFoodRecord(detection.category.clone()))?;

        let (price, calories, portion, measurement) = if record.portion_based {
            let (result, measurement) =
                self.estimate_portion(&detection.category, &detection.polygon, &record, scale_factor);
            (result.scaled_price, result.scaled_calories, Some(result), Some(measurement))
        } else {
            (record.price, record.calories, None, None)
        };

        Ok(EnrichedDetection {
            category: detection.category.clone(),
            confidence: detection.confidence,
            bbox,
            polygon: detection.polygon.clone(),
            food_info: record,
            price,
            calories,
            portion,
            measurement,
        })
    }

    /// Price every detection.
    ///
    /// The scale factor is computed once from `references`. Detections are
    /// handled independently: one that fails validation is reported in
    /// `failures`, left out of the totals, and does not affect the others.
    pub fn process(&self, detections: &[Detection], references: &[Detection]) -> PortionReport {
        self.process_items(detections.iter().map(Ok), references)
    }

    /// Like [`process`](Self::process), for request entries some of which
    /// could not be read. Those become failures at their original index.
    pub fn process_items<'a, I>(&self, items: I, references: &[Detection]) -> PortionReport
    where
        I: IntoIterator<Item = Result<&'a Detection, &'a MalformedDetection>>,
    {
        let start = Instant::now();
        let scale_factor = compute_scale_factor(references, &self.config);

        let mut data = Vec::new();
        let mut failures = Vec::new();
        let mut total_price = 0.0;
        let mut total_calories: i64 = 0;

        for (index, item) in items.into_iter().enumerate() {
            let (category, outcome) = match item {
                Ok(detection) => (&detection.category, self.process_one(detection, scale_factor)),
                Err(malformed) => (&malformed.category, Err(malformed.error.clone())),
            };
            match outcome {
                Ok(item) => {
                    total_price += item.price;
                    total_calories = total_calories.saturating_add(item.calories);
                    data.push(item);
                }
                Err(e) => {
                    tracing::warn!("Skipping detection #{} ('{}'): {}", index, category, e);
                    failures.push(ItemFailure {
                        index,
                        category: category.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        PortionReport {
            data,
            failures,
            scale_factor,
            total_price: round2(total_price),
            total_calories,
            processing_time: start.elapsed().as_secs_f64(),
        }
    }

    /// Attach catalog records to raw detections, then [`process`](Self::process) them.
    ///
    /// Calibration markers are priced like any other item and also feed the
    /// scale factor. Detections without a category get no record and fail
    /// validation individually. A storage error aborts the whole request.
    pub fn estimate<L: FoodLookup + ?Sized>(
        &self,
        detections: Vec<Detection>,
        lookup: &L,
    ) -> Result<PortionReport, EngineError> {
        self.estimate_items(detections.into_iter().map(Ok).collect(), lookup)
    }

    /// [`estimate`](Self::estimate) over request entries that may include
    /// unreadable ones; those are reported in `failures` in request order.
    pub fn estimate_items<L: FoodLookup + ?Sized>(
        &self,
        items: Vec<Result<Detection, MalformedDetection>>,
        lookup: &L,
    ) -> Result<PortionReport, EngineError> {
        let mut annotated = Vec::with_capacity(items.len());
        let mut references = Vec::new();

        for item in items {
            let mut detection = match item {
                Ok(detection) => detection,
                Err(malformed) => {
                    annotated.push(Err(malformed));
                    continue;
                }
            };
            if detection.food_info.is_none() && !detection.category.trim().is_empty() {
                detection.food_info = Some(catalog::resolve(lookup, &detection.category, detection.confidence)?);
            }
            if CalibrationMarker::from_category(&detection.category).is_some() {
                references.push(detection.clone());
            }
            annotated.push(Ok(detection));
        }

        Ok(self.process_items(annotated.iter().map(Result::as_ref), &references))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::NutrientValue;

    /// Axis-aligned square outline of the given side, in pixels
    fn square(side: f64) -> Polygon {
        vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)].into()
    }

    fn soup_record() -> FoodRecord {
        let mut record = catalog::generic_record("corba", 1.0);
        record.name = "Mercimek Corbasi".into();
        record.price = 35.0;
        record.calories = 181;
        record.portion_based = true;
        record.base_height_cm = Some(2.0);
        record.density_g_per_cm3 = Some(0.8);
        record.reference_mass_g = Some(150.0);
        record.nutrition = NutrientMap::new();
        record.nutrition.insert("protein".into(), "9g".into());
        record
    }

    fn soup(side_px: f64) -> Detection {
        Detection::new("corba", 0.93, BoundingBox::new(0.0, 0.0, side_px, side_px), square(side_px))
            .with_food(soup_record())
    }

    #[test]
    fn test_liquid_end_to_end() {
        // 100px square at 0.01 cm²/px² is 100 cm², diameter ≈ 11.3cm
        let engine = PortionEngine::new(EngineConfig {
            default_scale_factor: 0.01,
            ..EngineConfig::default()
        });
        let report = engine.process(&[soup(100.0)], &[]);

        assert!(report.failures.is_empty());
        let item = &report.data[0];
        let m = item.measurement.unwrap();
        assert!((m.real_area_cm2 - 100.0).abs() < 1e-9);
        assert!((m.estimated_height_cm - 1.2).abs() < 1e-9);
        assert!((m.volume_cm3 - 120.0).abs() < 1e-9);
        assert!((m.mass_g - 96.0).abs() < 1e-9);
        assert!((m.raw_portion - 0.64).abs() < 1e-9);

        let portion = item.portion.as_ref().unwrap();
        assert_eq!(portion.portion, 0.5);
        assert_eq!(portion.scaled_price, 17.5);
        assert_eq!(portion.scaled_calories, 90);
        assert_eq!(portion.scaled_nutrients["protein"], NutrientValue::Text("4.5g".into()));

        assert_eq!(report.total_price, 17.5);
        assert_eq!(report.total_calories, 90);
        // stored unit values are untouched
        assert_eq!(item.food_info.price, 35.0);
    }

    #[test]
    fn test_fork_calibration_drives_the_scale() {
        let engine = PortionEngine::default();
        // fork box of 4875 px² -> 0.01 cm²/px²
        let fork = Detection::new("fork", 0.8, BoundingBox::new(0.0, 0.0, 195.0, 25.0), Polygon::default())
            .with_food(catalog::generic_record("fork", 0.0));
        let report = engine.process(&[soup(100.0), fork.clone()], &[fork]);

        assert!((report.scale_factor - 0.01).abs() < 1e-12);
        assert_eq!(report.data[0].portion.as_ref().unwrap().portion, 0.5);
        // the fork itself is priced as a plain item
        assert_eq!(report.data[1].price, 15.0);
        assert_eq!(report.total_price, 32.5);
        assert_eq!(report.total_calories, 190);
    }

    #[test]
    fn test_plain_items_pass_through() {
        let engine = PortionEngine::default();
        let det = Detection::new("ayran", 0.5, BoundingBox::new(0.0, 0.0, 10.0, 10.0), square(10.0))
            .with_food(catalog::generic_record("ayran", 0.5));
        let report = engine.process(&[det], &[]);

        let item = &report.data[0];
        assert!(item.portion.is_none());
        assert!(item.measurement.is_none());
        assert_eq!(item.price, 30.0);
        assert_eq!(item.calories, 200);
    }

    #[test]
    fn test_malformed_detection_is_isolated() {
        let engine = PortionEngine::new(EngineConfig {
            default_scale_factor: 0.01,
            ..EngineConfig::default()
        });
        let mut broken = soup(100.0);
        broken.bbox = None;

        let report = engine.process(&[soup(100.0), broken, soup(100.0)], &[]);

        assert_eq!(report.data.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].error, ItemError::MissingBoundingBox.to_string());
        assert_eq!(report.total_price, 35.0);
        assert_eq!(report.total_calories, 180);
    }

    #[test]
    fn test_degenerate_outline_floors_to_half_portion() {
        let engine = PortionEngine::default();
        let mut det = soup(100.0);
        det.polygon = Polygon(vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
        let report = engine.process(&[det], &[]);

        let item = &report.data[0];
        let m = item.measurement.unwrap();
        assert_eq!(m.pixel_area, 0.0);
        assert_eq!(m.volume_cm3, volume::MIN_VOLUME_CM3);
        assert_eq!(item.portion.as_ref().unwrap().portion, 0.5);
    }

    #[test]
    fn test_missing_physical_parameters_use_defaults() {
        let engine = PortionEngine::default();
        let mut record = soup_record();
        record.base_height_cm = None;
        record.density_g_per_cm3 = Some(-1.0);
        record.reference_mass_g = Some(0.0);

        let params = engine.physical_params(&record);
        assert_eq!(params.base_height_cm, 2.0);
        assert_eq!(params.density_g_per_cm3, 0.8);
        assert_eq!(params.reference_mass_g, 0.0);

        // zero reference mass means exactly one portion
        let (result, _) = engine.estimate_portion("corba", &square(100.0), &record, 0.01);
        assert_eq!(result.portion, 1.0);
        assert_eq!(result.scaled_price, 35.0);
    }

    #[test]
    fn test_estimate_attaches_records_and_markers() {
        let engine = PortionEngine::default();
        let mut catalog_map = HashMap::new();
        catalog_map.insert("corba".to_string(), soup_record());

        let detections = vec![
            Detection::new("Corba", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0), square(100.0)),
            Detection::new("Catal", 0.7, BoundingBox::new(0.0, 0.0, 195.0, 25.0), Polygon::default()),
            Detection {
                category: String::new(),
                confidence: 0.4,
                bbox: None,
                polygon: Polygon::default(),
                food_info: None,
            },
        ];

        let report = engine.estimate(detections, &catalog_map).unwrap();

        assert!((report.scale_factor - 0.01).abs() < 1e-12);
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.data[0].food_info.name, "Mercimek Corbasi");
        assert_eq!(report.data[1].food_info.name, "Catal");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error, ItemError::MissingCategory.to_string());
    }

    #[test]
    fn test_huge_calories_saturate_instead_of_overflowing() {
        let engine = PortionEngine::default();
        let mut record = catalog::generic_record("ayran", 0.0);
        record.calories = i64::MAX;
        let det = Detection::new("ayran", 0.5, BoundingBox::new(0.0, 0.0, 10.0, 10.0), square(10.0))
            .with_food(record);

        let report = engine.process(&[det.clone(), det], &[]);
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.total_calories, i64::MAX);
    }

    #[test]
    fn test_unreadable_entries_keep_their_index() {
        let engine = PortionEngine::new(EngineConfig {
            default_scale_factor: 0.01,
            ..EngineConfig::default()
        });
        let mut catalog_map = HashMap::new();
        catalog_map.insert("corba".to_string(), soup_record());

        let unreadable = MalformedDetection {
            category: "corba".into(),
            error: ItemError::Malformed("bbox must be [x1, y1, x2, y2]".into()),
        };
        let good = || Detection::new("corba", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0), square(100.0));

        let report = engine
            .estimate_items(vec![Ok(good()), Err(unreadable), Ok(good())], &catalog_map)
            .unwrap();

        assert_eq!(report.data.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].category, "corba");
        assert_eq!(report.total_price, 35.0);
    }
}
