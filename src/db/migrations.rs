//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: food catalog
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FOODS
        -- One row per detector category (normalized id)
        -- ============================================
        CREATE TABLE foods (
            id TEXT PRIMARY KEY,                 -- normalized category, e.g. "pirinc_pilav"
            name TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0,       -- unit price
            calories INTEGER NOT NULL DEFAULT 0, -- unit calories
            portion_based INTEGER NOT NULL DEFAULT 0,

            -- Physical parameters, only meaningful when portion_based = 1
            food_category TEXT,
            base_height_cm REAL,
            density_g_per_cm3 REAL,
            reference_mass_g REAL,
            volume_method TEXT,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_foods_name ON foods(name);
        CREATE INDEX idx_foods_portion_based ON foods(portion_based);

        -- ============================================
        -- FOOD NUTRIENTS
        -- Either value_text ("10g") or value_num (10.0) is set
        -- ============================================
        CREATE TABLE food_nutrients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            food_id TEXT NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            value_text TEXT,
            value_num REAL,
            UNIQUE(food_id, name),
            CHECK ((value_text IS NOT NULL AND value_num IS NULL) OR
                   (value_text IS NULL AND value_num IS NOT NULL))
        );

        CREATE INDEX idx_food_nutrients_food ON food_nutrients(food_id);

        CREATE TABLE food_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            food_id TEXT NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
            ingredient TEXT NOT NULL
        );

        CREATE INDEX idx_food_ingredients_food ON food_ingredients(food_id);

        CREATE TABLE food_allergens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            food_id TEXT NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
            allergen TEXT NOT NULL
        );

        CREATE INDEX idx_food_allergens_food ON food_allergens(food_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
