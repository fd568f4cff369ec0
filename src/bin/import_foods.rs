//! Import a JSON food database into SQLite
//! Usage: cargo run --bin import_foods -- path/to/foodsDB.json
//!
//! The file is an object keyed by food id. Existing records with the same id
//! are replaced, including their nutrients, ingredients and allergens.

use std::collections::BTreeMap;
use std::path::PathBuf;

use plateful::catalog::normalize_category;
use plateful::models::FoodRecord;

fn get_database_path() -> PathBuf {
    std::env::var("PLATEFUL_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            std::fs::create_dir_all(&path).ok();
            path.push("plateful.db");
            path
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json_path = std::env::args()
        .nth(1)
        .ok_or("usage: import_foods <foods.json>")?;

    let raw = std::fs::read_to_string(&json_path)?;
    let foods: BTreeMap<String, FoodRecord> = serde_json::from_str(&raw)?;
    println!("Read {} foods from {}", foods.len(), json_path);

    let db_path = get_database_path();
    println!("Database: {}", db_path.display());

    let database = plateful::db::Database::new(&db_path)?;

    database.with_conn(|conn| {
        plateful::db::migrations::run_migrations(conn)?;

        for (key, mut food) in foods {
            food.id = normalize_category(&key);
            if food.name.trim().is_empty() {
                food.name = key.clone();
            }
            FoodRecord::upsert(conn, &food)?;
            println!(
                "  {} - {} ({:.2}, {} kcal{})",
                food.id,
                food.name,
                food.price,
                food.calories,
                if food.portion_based { ", portion-based" } else { "" }
            );
        }

        let stats = FoodRecord::stats(conn)?;
        println!(
            "Catalog now holds {} foods ({} portion-based)",
            stats.total_foods, stats.portion_based_foods
        );
        Ok(())
    })?;

    Ok(())
}
