//! Food Record model
//!
//! Per-category catalog entry: unit price, unit calories, nutrients and, for
//! portion-based foods, the physical parameters used for volume estimation.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::nutrient::{deserialize_nutrients, NutrientMap, NutrientValue};
use crate::db::{DbError, DbResult};

/// A food catalog entry keyed by normalized category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    /// Normalized category, e.g. "pirinc_pilav"
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub portion_based: bool,
    #[serde(default)]
    pub food_category: Option<String>,
    #[serde(default)]
    pub base_height_cm: Option<f64>,
    #[serde(default)]
    pub density_g_per_cm3: Option<f64>,
    #[serde(default)]
    pub reference_mass_g: Option<f64>,
    #[serde(default)]
    pub volume_method: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nutrients")]
    pub nutrition: NutrientMap,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// Partial update for a food record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodRecordUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub calories: Option<i64>,
    pub portion_based: Option<bool>,
    pub food_category: Option<String>,
    pub base_height_cm: Option<f64>,
    pub density_g_per_cm3: Option<f64>,
    pub reference_mass_g: Option<f64>,
    pub volume_method: Option<String>,
    /// Replaces the whole nutrient map when set
    pub nutrition: Option<NutrientMap>,
    pub ingredients: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
}

/// Catalog-wide statistics
#[derive(Debug, Clone, Serialize)]
pub struct FoodStats {
    pub total_foods: i64,
    pub portion_based_foods: i64,
    pub non_portion_foods: i64,
    pub price_range: ValueRange<f64>,
    pub calorie_range: ValueRange<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl FoodRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            price: row.get("price")?,
            calories: row.get("calories")?,
            portion_based: row.get("portion_based")?,
            food_category: row.get("food_category")?,
            base_height_cm: row.get("base_height_cm")?,
            density_g_per_cm3: row.get("density_g_per_cm3")?,
            reference_mass_g: row.get("reference_mass_g")?,
            volume_method: row.get("volume_method")?,
            nutrition: NutrientMap::new(),
            ingredients: Vec::new(),
            allergens: Vec::new(),
        })
    }

    /// Fill nutrients, ingredients and allergens from their child tables
    fn load_children(mut self, conn: &Connection) -> DbResult<Self> {
        let mut stmt = conn.prepare(
            "SELECT name, value_text, value_num FROM food_nutrients WHERE food_id = ?1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map([&self.id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (name, text, num) in rows {
            let value = match (text, num) {
                (Some(t), None) => NutrientValue::Text(t),
                (None, Some(n)) => NutrientValue::Number(n),
                _ => {
                    return Err(DbError::InvalidData(format!(
                        "nutrient '{}' of food '{}' has no single value",
                        name, self.id
                    )))
                }
            };
            self.nutrition.insert(name, value);
        }

        self.ingredients = Self::child_strings(conn, "food_ingredients", "ingredient", &self.id)?;
        self.allergens = Self::child_strings(conn, "food_allergens", "allergen", &self.id)?;
        Ok(self)
    }

    fn child_strings(conn: &Connection, table: &str, column: &str, food_id: &str) -> DbResult<Vec<String>> {
        let sql = format!("SELECT {} FROM {} WHERE food_id = ?1 ORDER BY id", column, table);
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([food_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    fn replace_nutrition(conn: &Connection, food_id: &str, nutrition: &NutrientMap) -> DbResult<()> {
        conn.execute("DELETE FROM food_nutrients WHERE food_id = ?1", [food_id])?;
        let mut stmt = conn.prepare(
            "INSERT INTO food_nutrients (food_id, name, value_text, value_num) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (name, value) in nutrition {
            let (text, num) = match value {
                NutrientValue::Text(t) => (Some(t.as_str()), None),
                NutrientValue::Number(n) => (None, Some(*n)),
            };
            stmt.execute(params![food_id, name, text, num])?;
        }
        Ok(())
    }

    fn replace_strings(conn: &Connection, table: &str, column: &str, food_id: &str, values: &[String]) -> DbResult<()> {
        conn.execute(&format!("DELETE FROM {} WHERE food_id = ?1", table), [food_id])?;
        let sql = format!("INSERT INTO {} (food_id, {}) VALUES (?1, ?2)", table, column);
        let mut stmt = conn.prepare(&sql)?;
        for value in values {
            stmt.execute(params![food_id, value])?;
        }
        Ok(())
    }

    fn replace_children(&self, conn: &Connection) -> DbResult<()> {
        Self::replace_nutrition(conn, &self.id, &self.nutrition)?;
        Self::replace_strings(conn, "food_ingredients", "ingredient", &self.id, &self.ingredients)?;
        Self::replace_strings(conn, "food_allergens", "allergen", &self.id, &self.allergens)?;
        Ok(())
    }

    /// Insert a new food record
    pub fn create(conn: &Connection, data: &FoodRecord) -> DbResult<Self> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO foods (
                id, name, price, calories, portion_based, food_category,
                base_height_cm, density_g_per_cm3, reference_mass_g, volume_method
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                data.id,
                data.name,
                data.price,
                data.calories,
                data.portion_based,
                data.food_category,
                data.base_height_cm,
                data.density_g_per_cm3,
                data.reference_mass_g,
                data.volume_method,
            ],
        )?;
        data.replace_children(&tx)?;
        tx.commit()?;

        Self::get_by_id(conn, &data.id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Insert or fully replace a food record (used by catalog import)
    pub fn upsert(conn: &Connection, data: &FoodRecord) -> DbResult<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO foods (
                id, name, price, calories, portion_based, food_category,
                base_height_cm, density_g_per_cm3, reference_mass_g, volume_method
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                calories = excluded.calories,
                portion_based = excluded.portion_based,
                food_category = excluded.food_category,
                base_height_cm = excluded.base_height_cm,
                density_g_per_cm3 = excluded.density_g_per_cm3,
                reference_mass_g = excluded.reference_mass_g,
                volume_method = excluded.volume_method,
                updated_at = datetime('now')
            "#,
            params![
                data.id,
                data.name,
                data.price,
                data.calories,
                data.portion_based,
                data.food_category,
                data.base_height_cm,
                data.density_g_per_cm3,
                data.reference_mass_g,
                data.volume_method,
            ],
        )?;
        data.replace_children(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Get a food record by normalized id
    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let record = conn
            .query_row("SELECT * FROM foods WHERE id = ?1", [id], Self::from_row)
            .optional()?;

        match record {
            Some(record) => Ok(Some(record.load_children(conn)?)),
            None => Ok(None),
        }
    }

    /// Search by name or id
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM foods
            WHERE name LIKE ?1 OR id LIKE ?1
            ORDER BY name ASC
            LIMIT ?2
            "#,
        )?;

        let records = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        records.into_iter().map(|r| r.load_children(conn)).collect()
    }

    /// List food records, optionally filtered on portion_based
    pub fn list(conn: &Connection, portion_based: Option<bool>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let records = if let Some(flag) = portion_based {
            let mut stmt = conn.prepare(
                "SELECT * FROM foods WHERE portion_based = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![flag, limit, offset], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare("SELECT * FROM foods ORDER BY id ASC LIMIT ?1 OFFSET ?2")?;
            let rows = stmt
                .query_map(params![limit, offset], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        records.into_iter().map(|r| r.load_children(conn)).collect()
    }

    /// Apply a partial update. Returns None if the record does not exist.
    pub fn update(conn: &Connection, id: &str, data: &FoodRecordUpdate) -> DbResult<Option<Self>> {
        if Self::get_by_id(conn, id)?.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", stringify!($field), params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name);
        add_update!(price);
        add_update!(calories);
        add_update!(portion_based);
        add_update!(food_category);
        add_update!(base_height_cm);
        add_update!(density_g_per_cm3);
        add_update!(reference_mass_g);
        add_update!(volume_method);

        let tx = conn.unchecked_transaction()?;

        if !updates.is_empty() {
            updates.push("updated_at = datetime('now')".to_string());
            let sql = format!(
                "UPDATE foods SET {} WHERE id = ?{}",
                updates.join(", "),
                params_vec.len() + 1
            );
            params_vec.push(Box::new(id.to_string()));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            tx.execute(&sql, params_refs.as_slice())?;
        }

        if let Some(ref nutrition) = data.nutrition {
            Self::replace_nutrition(&tx, id, nutrition)?;
        }
        if let Some(ref ingredients) = data.ingredients {
            Self::replace_strings(&tx, "food_ingredients", "ingredient", id, ingredients)?;
        }
        if let Some(ref allergens) = data.allergens {
            Self::replace_strings(&tx, "food_allergens", "allergen", id, allergens)?;
        }

        tx.commit()?;
        Self::get_by_id(conn, id)
    }

    /// Delete a food record and its children. Returns false if not found.
    pub fn delete(conn: &Connection, id: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM foods WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Count food records, optionally filtered on portion_based
    pub fn count(conn: &Connection, portion_based: Option<bool>) -> DbResult<i64> {
        let count = match portion_based {
            Some(flag) => conn.query_row(
                "SELECT COUNT(*) FROM foods WHERE portion_based = ?1",
                [flag],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Catalog statistics: totals, price range and calorie range
    pub fn stats(conn: &Connection) -> DbResult<FoodStats> {
        let total_foods = Self::count(conn, None)?;
        let portion_based_foods = Self::count(conn, Some(true))?;

        let price_range = conn.query_row(
            "SELECT MIN(price), MAX(price) FROM foods WHERE price > 0",
            [],
            |row| Ok(ValueRange { min: row.get(0)?, max: row.get(1)? }),
        )?;
        let calorie_range = conn.query_row(
            "SELECT MIN(calories), MAX(calories) FROM foods WHERE calories > 0",
            [],
            |row| Ok(ValueRange { min: row.get(0)?, max: row.get(1)? }),
        )?;

        Ok(FoodStats {
            total_foods,
            portion_based_foods,
            non_portion_foods: total_foods - portion_based_foods,
            price_range,
            calorie_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrations, Database};

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(migrations::run_migrations).unwrap();
        db
    }

    fn pilav() -> FoodRecord {
        let mut nutrition = NutrientMap::new();
        nutrition.insert("protein".into(), "4g".into());
        nutrition.insert("sodium".into(), 120.0.into());
        FoodRecord {
            id: "pirinc_pilav".into(),
            name: "Pirinc Pilavi".into(),
            price: 40.0,
            calories: 250,
            portion_based: true,
            food_category: Some("dome".into()),
            base_height_cm: Some(3.0),
            density_g_per_cm3: Some(0.85),
            reference_mass_g: Some(150.0),
            volume_method: None,
            nutrition,
            ingredients: vec!["rice".into(), "butter".into()],
            allergens: vec!["milk".into()],
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let conn = db.get_conn().unwrap();

        let created = FoodRecord::create(&conn, &pilav()).unwrap();
        assert_eq!(created, pilav());

        assert!(FoodRecord::get_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_update_replaces_only_given_fields() {
        let db = setup();
        let conn = db.get_conn().unwrap();
        FoodRecord::create(&conn, &pilav()).unwrap();

        let update = FoodRecordUpdate {
            price: Some(45.5),
            allergens: Some(vec![]),
            ..Default::default()
        };
        let updated = FoodRecord::update(&conn, "pirinc_pilav", &update).unwrap().unwrap();
        assert_eq!(updated.price, 45.5);
        assert!(updated.allergens.is_empty());
        assert_eq!(updated.ingredients.len(), 2);
        assert_eq!(updated.calories, 250);

        assert!(FoodRecord::update(&conn, "missing", &update).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_children() {
        let db = setup();
        let conn = db.get_conn().unwrap();
        FoodRecord::upsert(&conn, &pilav()).unwrap();

        let mut changed = pilav();
        changed.nutrition.clear();
        changed.nutrition.insert("fat".into(), "7g".into());
        changed.price = 42.0;
        FoodRecord::upsert(&conn, &changed).unwrap();

        let stored = FoodRecord::get_by_id(&conn, "pirinc_pilav").unwrap().unwrap();
        assert_eq!(stored, changed);
        assert_eq!(FoodRecord::count(&conn, None).unwrap(), 1);
    }

    #[test]
    fn test_delete_cascades() {
        let db = setup();
        let conn = db.get_conn().unwrap();
        FoodRecord::create(&conn, &pilav()).unwrap();

        assert!(FoodRecord::delete(&conn, "pirinc_pilav").unwrap());
        assert!(!FoodRecord::delete(&conn, "pirinc_pilav").unwrap());

        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM food_nutrients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_search_list_and_stats() {
        let db = setup();
        let conn = db.get_conn().unwrap();
        FoodRecord::create(&conn, &pilav()).unwrap();
        let ayran = FoodRecord {
            id: "ayran".into(),
            name: "Ayran".into(),
            price: 15.0,
            calories: 80,
            portion_based: false,
            food_category: None,
            base_height_cm: None,
            density_g_per_cm3: None,
            reference_mass_g: None,
            volume_method: None,
            nutrition: NutrientMap::new(),
            ingredients: vec![],
            allergens: vec![],
        };
        FoodRecord::create(&conn, &ayran).unwrap();

        let found = FoodRecord::search(&conn, "pilav", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "pirinc_pilav");

        let portion_only = FoodRecord::list(&conn, Some(true), 50, 0).unwrap();
        assert_eq!(portion_only.len(), 1);
        assert_eq!(FoodRecord::list(&conn, None, 50, 0).unwrap().len(), 2);

        let stats = FoodRecord::stats(&conn).unwrap();
        assert_eq!(stats.total_foods, 2);
        assert_eq!(stats.portion_based_foods, 1);
        assert_eq!(stats.non_portion_foods, 1);
        assert_eq!(stats.price_range.min, Some(15.0));
        assert_eq!(stats.price_range.max, Some(40.0));
        assert_eq!(stats.calorie_range.max, Some(250));
    }
}
