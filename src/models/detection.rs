//! Detection model
//!
//! One object instance reported by the upstream detector, in pixel space.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::FoodRecord;

/// Axis-aligned box `[x1, y1, x2, y2]` in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox(pub [f64; 4]);

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self([x1, y1, x2, y2])
    }

    pub fn width(&self) -> f64 {
        self.0[2] - self.0[0]
    }

    pub fn height(&self) -> f64 {
        self.0[3] - self.0[1]
    }

    /// Pixel area. Negative or zero when the corners are inverted or collapsed.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Segmentation outline as raw `[x, y]` pairs.
///
/// Entries are kept as the detector sent them; malformed entries are skipped
/// by [`Polygon::points`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(pub Vec<Vec<f64>>);

impl Polygon {
    /// Well-formed vertices: exactly two finite coordinates
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.0
            .iter()
            .filter(|p| p.len() == 2 && p[0].is_finite() && p[1].is_finite())
            .map(|p| (p[0], p[1]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(f64, f64)>> for Polygon {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Polygon(points.into_iter().map(|(x, y)| vec![x, y]).collect())
    }
}

/// Reasons a single detection cannot be priced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("detection has no category")]
    MissingCategory,

    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("detection has no bounding box")]
    MissingBoundingBox,

    #[error("bounding box has non-finite coordinates")]
    InvalidBoundingBox,

    #[error("no food record attached to '{0}'")]
    MissingFoodRecord(String),

    #[error("malformed detection: {0}")]
    Malformed(String),
}

/// A request entry that could not be read as a [`Detection`]
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedDetection {
    /// Class label, when one could be read
    pub category: String,
    pub error: ItemError,
}

/// A detector result with its optional catalog entry attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class", default)]
    pub category: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(rename = "segments", default)]
    pub polygon: Polygon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_info: Option<FoodRecord>,
}

impl Detection {
    pub fn new(category: impl Into<String>, confidence: f64, bbox: BoundingBox, polygon: Polygon) -> Self {
        Self {
            category: category.into(),
            confidence,
            bbox: Some(bbox),
            polygon,
            food_info: None,
        }
    }

    pub fn with_food(mut self, record: FoodRecord) -> Self {
        self.food_info = Some(record);
        self
    }

    /// Read one detection from loosely typed request JSON.
    ///
    /// A missing `bbox` is left for [`validate`](Self::validate) to report;
    /// a present but unreadable `bbox`, `confidence` or `class` makes the
    /// entry malformed. Outline points that are not `[x, y]` number pairs are
    /// dropped.
    pub fn from_value(value: &Value) -> Result<Self, MalformedDetection> {
        let object = value.as_object().ok_or_else(|| MalformedDetection {
            category: String::new(),
            error: ItemError::Malformed("expected an object".into()),
        })?;

        let (category, class_error) = match object.get("class") {
            None | Some(Value::Null) => (String::new(), None),
            Some(Value::String(s)) => (s.clone(), None),
            Some(other) => (String::new(), Some(format!("class must be a string, got {}", other))),
        };
        let malformed = |message: String| MalformedDetection {
            category: category.clone(),
            error: ItemError::Malformed(message),
        };
        if let Some(message) = class_error {
            return Err(malformed(message));
        }

        let confidence = match object.get("confidence") {
            None => 0.0,
            Some(v) => v
                .as_f64()
                .ok_or_else(|| malformed(format!("confidence must be a number, got {}", v)))?,
        };

        let bbox = match object.get("bbox") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                read_numbers(v)
                    .and_then(|n| <[f64; 4]>::try_from(n).ok())
                    .map(BoundingBox)
                    .ok_or_else(|| malformed(format!("bbox must be [x1, y1, x2, y2], got {}", v)))?,
            ),
        };

        let polygon = match object.get("segments") {
            Some(Value::Array(points)) => Polygon(
                points
                    .iter()
                    .filter_map(read_numbers)
                    .filter(|p| p.len() == 2)
                    .collect(),
            ),
            _ => Polygon::default(),
        };

        Ok(Detection {
            category,
            confidence,
            bbox,
            polygon,
            food_info: None,
        })
    }

    /// Check the fields every downstream step relies on
    pub fn validate(&self) -> Result<BoundingBox, ItemError> {
        if self.category.trim().is_empty() {
            return Err(ItemError::MissingCategory);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ItemError::InvalidConfidence(self.confidence));
        }
        let bbox = self.bbox.ok_or(ItemError::MissingBoundingBox)?;
        if !bbox.is_finite() {
            return Err(ItemError::InvalidBoundingBox);
        }
        Ok(bbox)
    }
}

/// All elements of a JSON array as numbers, or None
fn read_numbers(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}
