//! Food Catalog MCP Tools
//!
//! Tools for managing the food records that detections are priced against.

use serde::Serialize;

use crate::catalog::normalize_category;
use crate::db::Database;
use crate::models::{FoodRecord, FoodRecordUpdate, FoodStats};

/// Response for add_food
#[derive(Debug, Serialize)]
pub struct AddFoodResponse {
    pub id: String,
    pub name: String,
    pub portion_based: bool,
}

/// Summary of a food record for list/search results
#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub calories: i64,
    pub portion_based: bool,
}

impl From<&FoodRecord> for FoodSummary {
    fn from(record: &FoodRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            price: record.price,
            calories: record.calories,
            portion_based: record.portion_based,
        }
    }
}

/// Response for search_foods
#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub items: Vec<FoodSummary>,
    pub total: usize,
}

/// Response for list_foods
#[derive(Debug, Serialize)]
pub struct ListFoodsResponse {
    pub items: Vec<FoodSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for update_food
#[derive(Debug, Serialize)]
pub struct UpdateFoodResponse {
    pub success: bool,
    pub food: FoodRecord,
}

/// Response for delete_food
#[derive(Debug, Serialize)]
pub struct DeleteFoodResponse {
    pub success: bool,
    pub deleted_id: String,
}

fn check_non_negative(field: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if v < 0.0 || !v.is_finite() => Err(format!("{} must be a non-negative number", field)),
        _ => Ok(()),
    }
}

fn check_positive(field: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if v <= 0.0 || !v.is_finite() => Err(format!("{} must be greater than 0", field)),
        _ => Ok(()),
    }
}

/// Add a new food record. The id defaults to the normalized name.
pub fn add_food(db: &Database, mut data: FoodRecord) -> Result<AddFoodResponse, String> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err("Food name cannot be empty".to_string());
    }
    data.name = name;

    let id = if data.id.trim().is_empty() { &data.name } else { &data.id };
    data.id = normalize_category(id);

    check_non_negative("price", Some(data.price))?;
    if data.calories < 0 {
        return Err("calories cannot be negative".to_string());
    }
    check_positive("base_height_cm", data.base_height_cm)?;
    check_positive("density_g_per_cm3", data.density_g_per_cm3)?;
    check_positive("reference_mass_g", data.reference_mass_g)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if FoodRecord::get_by_id(&conn, &data.id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Food already exists with id: {}", data.id));
    }

    let record = FoodRecord::create(&conn, &data)
        .map_err(|e| format!("Failed to create food: {}", e))?;

    Ok(AddFoodResponse {
        id: record.id,
        name: record.name,
        portion_based: record.portion_based,
    })
}

/// Get a food record by id (normalized before lookup)
pub fn get_food(db: &Database, id: &str) -> Result<Option<FoodRecord>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    FoodRecord::get_by_id(&conn, &normalize_category(id))
        .map_err(|e| format!("Failed to get food: {}", e))
}

/// Search food records by id or name
pub fn search_foods(db: &Database, query: &str, limit: i64) -> Result<SearchFoodsResponse, String> {
    let limit = limit.clamp(1, 100);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let records = FoodRecord::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Search failed: {}", e))?;

    let items: Vec<FoodSummary> = records.iter().map(FoodSummary::from).collect();
    let total = items.len();

    Ok(SearchFoodsResponse { items, total })
}

/// List food records with optional portion-based filter and pagination
pub fn list_foods(
    db: &Database,
    portion_based: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<ListFoodsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let records = FoodRecord::list(&conn, portion_based, limit, offset)
        .map_err(|e| format!("Failed to list foods: {}", e))?;

    let total = FoodRecord::count(&conn, portion_based)
        .map_err(|e| format!("Failed to count foods: {}", e))?;

    Ok(ListFoodsResponse {
        items: records.iter().map(FoodSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Update a food record
pub fn update_food(db: &Database, id: &str, data: FoodRecordUpdate) -> Result<UpdateFoodResponse, String> {
    if let Some(name) = &data.name {
        if name.trim().is_empty() {
            return Err("Food name cannot be empty".to_string());
        }
    }
    check_non_negative("price", data.price)?;
    if data.calories.is_some_and(|c| c < 0) {
        return Err("calories cannot be negative".to_string());
    }
    check_positive("base_height_cm", data.base_height_cm)?;
    check_positive("density_g_per_cm3", data.density_g_per_cm3)?;
    check_positive("reference_mass_g", data.reference_mass_g)?;

    let id = normalize_category(id);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = FoodRecord::update(&conn, &id, &data)
        .map_err(|e| format!("Failed to update food: {}", e))?;

    match updated {
        Some(food) => Ok(UpdateFoodResponse { success: true, food }),
        None => Err(format!("Food not found with id: {}", id)),
    }
}

/// Delete a food record together with its nutrients, ingredients and allergens
pub fn delete_food(db: &Database, id: &str) -> Result<DeleteFoodResponse, String> {
    let id = normalize_category(id);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = FoodRecord::delete(&conn, &id)
        .map_err(|e| format!("Failed to delete food: {}", e))?;

    if !deleted {
        return Err(format!("Food not found with id: {}", id));
    }

    Ok(DeleteFoodResponse {
        success: true,
        deleted_id: id,
    })
}

/// Catalog statistics
pub fn food_database_stats(db: &Database) -> Result<FoodStats, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    FoodRecord::stats(&conn).map_err(|e| format!("Failed to compute statistics: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::generic_record;
    use crate::db::migrations;

    fn setup_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(migrations::run_migrations).unwrap();
        db
    }

    fn pilav() -> FoodRecord {
        FoodRecord {
            id: String::new(),
            name: "Pirinc Pilav".into(),
            price: 40.0,
            calories: 250,
            portion_based: true,
            base_height_cm: Some(3.0),
            ..generic_record("pirinc_pilav", 0.0)
        }
    }

    #[test]
    fn test_add_and_get_food() {
        let db = setup_db();
        let added = add_food(&db, pilav()).unwrap();
        assert_eq!(added.id, "pirinc_pilav");
        assert!(added.portion_based);

        let found = get_food(&db, "Pirinc Pilav").unwrap().unwrap();
        assert_eq!(found.price, 40.0);
        assert_eq!(found.base_height_cm, Some(3.0));

        assert!(add_food(&db, pilav()).unwrap_err().contains("already exists"));
    }

    #[test]
    fn test_add_food_validation() {
        let db = setup_db();

        let mut blank = pilav();
        blank.name = "  ".into();
        assert!(add_food(&db, blank).is_err());

        let mut negative = pilav();
        negative.price = -1.0;
        assert!(add_food(&db, negative).is_err());

        let mut flat = pilav();
        flat.density_g_per_cm3 = Some(0.0);
        assert!(add_food(&db, flat).unwrap_err().contains("density_g_per_cm3"));
    }

    #[test]
    fn test_update_and_delete_food() {
        let db = setup_db();
        add_food(&db, pilav()).unwrap();

        let update = FoodRecordUpdate {
            price: Some(45.5),
            ..Default::default()
        };
        let response = update_food(&db, "pirinc_pilav", update).unwrap();
        assert_eq!(response.food.price, 45.5);
        assert_eq!(response.food.calories, 250);

        assert!(update_food(&db, "ayran", FoodRecordUpdate::default()).is_err());

        let deleted = delete_food(&db, "pirinc_pilav").unwrap();
        assert_eq!(deleted.deleted_id, "pirinc_pilav");
        assert!(delete_food(&db, "pirinc_pilav").is_err());
    }

    #[test]
    fn test_list_search_and_stats() {
        let db = setup_db();
        add_food(&db, pilav()).unwrap();
        add_food(&db, generic_record("Ayran", 0.5)).unwrap();

        let all = list_foods(&db, None, 500, -3).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.limit, 200);
        assert_eq!(all.offset, 0);

        let portioned = list_foods(&db, Some(true), 50, 0).unwrap();
        assert_eq!(portioned.total, 1);
        assert_eq!(portioned.items[0].id, "pirinc_pilav");

        let found = search_foods(&db, "pilav", 10).unwrap();
        assert_eq!(found.total, 1);

        let stats = food_database_stats(&db).unwrap();
        assert_eq!(stats.total_foods, 2);
        assert_eq!(stats.portion_based_foods, 1);
        assert_eq!(stats.price_range.max, Some(40.0));
    }
}
