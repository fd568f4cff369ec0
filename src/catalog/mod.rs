//! Food catalog lookup
//!
//! Read-only access to food records by normalized category. The portion
//! engine only sees the [`FoodLookup`] trait; the SQLite database and plain
//! in-memory maps both implement it.

use std::collections::HashMap;

use crate::db::{Database, DbResult};
use crate::models::{FoodRecord, NutrientMap};
use crate::portion::round2;

/// Catalog key for a detector label: lowercase, spaces -> underscores
pub fn normalize_category(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Keyed lookup of food records
pub trait FoodLookup {
    /// `id` is already normalized. A miss is `Ok(None)`.
    fn find_food(&self, id: &str) -> DbResult<Option<FoodRecord>>;
}

impl FoodLookup for Database {
    fn find_food(&self, id: &str) -> DbResult<Option<FoodRecord>> {
        self.with_conn(|conn| FoodRecord::get_by_id(conn, id))
    }
}

impl FoodLookup for HashMap<String, FoodRecord> {
    fn find_food(&self, id: &str) -> DbResult<Option<FoodRecord>> {
        Ok(self.get(id).cloned())
    }
}

/// Placeholder record for a category missing from the catalog.
///
/// Price and calories grow with detector confidence; the record is never
/// portion-scaled.
pub fn generic_record(category: &str, confidence: f64) -> FoodRecord {
    let grams = |base: f64, span: f64| format!("{}g", (base + confidence * span) as i64);

    let mut nutrition = NutrientMap::new();
    nutrition.insert("protein".into(), grams(5.0, 15.0).into());
    nutrition.insert("carbs".into(), grams(10.0, 30.0).into());
    nutrition.insert("fat".into(), grams(3.0, 12.0).into());
    nutrition.insert("fiber".into(), grams(1.0, 4.0).into());

    FoodRecord {
        id: normalize_category(category),
        name: category.to_string(),
        price: round2(15.0 + confidence * 30.0),
        calories: (100.0 + confidence * 200.0) as i64,
        portion_based: false,
        food_category: None,
        base_height_cm: None,
        density_g_per_cm3: None,
        reference_mass_g: None,
        volume_method: None,
        nutrition,
        ingredients: vec!["Unknown".to_string()],
        allergens: Vec::new(),
    }
}

/// Find the record for a detector label, synthesizing one on a miss
pub fn resolve<L: FoodLookup + ?Sized>(lookup: &L, category: &str, confidence: f64) -> DbResult<FoodRecord> {
    let id = normalize_category(category);
    match lookup.find_food(&id)? {
        Some(record) => Ok(record),
        None => {
            tracing::info!("'{}' not in food catalog, using generic record", id);
            Ok(generic_record(category, confidence))
        }
    }
}
