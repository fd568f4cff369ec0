//! Data models
//!
//! Detector input, catalog entries and nutrient values.

mod detection;
mod food_record;
mod nutrient;

pub use detection::{BoundingBox, Detection, ItemError, MalformedDetection, Polygon};
pub use food_record::{FoodRecord, FoodRecordUpdate, FoodStats, ValueRange};
pub use nutrient::{deserialize_nutrients, NutrientMap, NutrientValue};
