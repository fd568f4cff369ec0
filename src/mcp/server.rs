//! Plateful MCP Server Implementation
//!
//! Exposes portion estimation and food catalog management as MCP tools.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{FoodRecord, FoodRecordUpdate, NutrientMap, NutrientValue};
use crate::portion::PortionEngine;
use crate::tools::estimate;
use crate::tools::foods;
use crate::tools::status::StatusTracker;

/// Plateful MCP Service
#[derive(Clone)]
pub struct PlatefulService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    engine: PortionEngine,
    tool_router: ToolRouter<PlatefulService>,
}

impl PlatefulService {
    pub fn new(database_path: PathBuf, database: Database, engine: PortionEngine) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path, engine.config().clone()))),
            database,
            engine,
            tool_router: Self::tool_router(),
        }
    }
}

/// Convert free-form JSON nutrient values; anything but numbers and strings is dropped
fn to_nutrient_map(raw: BTreeMap<String, serde_json::Value>) -> NutrientMap {
    raw.into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::Number(n) => n.as_f64().map(|v| (name, NutrientValue::Number(v))),
            serde_json::Value::String(s) => Some((name, NutrientValue::Text(s))),
            _ => None,
        })
        .collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Estimation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EstimatePortionsParams {
    /// All detections on the tray, including forks/spoons used for scale.
    /// Each is {"class", "confidence", "bbox": [x1, y1, x2, y2], "segments": [[x, y], ...]}
    pub detections: Vec<serde_json::Value>,
    /// Only estimate these classes (matched after normalization); omit or leave empty for all
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

// ============================================================================
// Food Catalog Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFoodParams {
    /// Catalog id (defaults to the name lowercased with spaces as underscores)
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Calories per unit
    pub calories: i64,
    /// Whether price/calories scale with the estimated portion
    #[serde(default)]
    pub portion_based: bool,
    /// Free-form grouping, e.g. "main", "side", "soup"
    pub food_category: Option<String>,
    /// Typical serving height in cm (portion-based foods)
    pub base_height_cm: Option<f64>,
    /// Density in g/cm³ (portion-based foods)
    pub density_g_per_cm3: Option<f64>,
    /// Mass of one serving in grams (portion-based foods)
    pub reference_mass_g: Option<f64>,
    /// Informational volume model label
    pub volume_method: Option<String>,
    /// Nutrients as numbers or unit strings, e.g. {"protein": "12g", "sodium_mg": 340}
    #[serde(default)]
    pub nutrition: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFoodParams {
    /// Food id or display name
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFoodsParams {
    /// Only portion-based (true) or only fixed-price (false) foods
    pub portion_based: Option<bool>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateFoodParams {
    pub id: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub calories: Option<i64>,
    pub portion_based: Option<bool>,
    pub food_category: Option<String>,
    pub base_height_cm: Option<f64>,
    pub density_g_per_cm3: Option<f64>,
    pub reference_mass_g: Option<f64>,
    pub volume_method: Option<String>,
    /// Replaces all nutrients when given
    pub nutrition: Option<BTreeMap<String, serde_json::Value>>,
    /// Replaces all ingredients when given
    pub ingredients: Option<Vec<String>>,
    /// Replaces all allergens when given
    pub allergens: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteFoodParams {
    /// Food id to delete
    pub id: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl PlatefulService {
    // --- Status ---

    #[tool(description = "Get the current status of the Plateful service including build info, database status, estimation defaults and process information")]
    async fn plateful_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        to_json(&status)
    }

    #[tool(description = "Get instructions for estimating portions from detector output. Call this before the first estimate_portions call.")]
    fn estimation_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::ESTIMATION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(ESTIMATION_INSTRUCTIONS)]))
    }

    // --- Estimation ---

    #[tool(description = "Estimate portion sizes, prices, calories and nutrients for detected food items. Include fork/spoon detections for scale calibration.")]
    fn estimate_portions(&self, Parameters(p): Parameters<EstimatePortionsParams>) -> Result<CallToolResult, McpError> {
        let result = estimate::estimate_portions(&self.database, &self.engine, &p.detections, p.classes.as_deref());
        to_json(&result)
    }

    // --- Food Catalog ---

    #[tool(description = "Add a food to the catalog. Portion-based foods should include base_height_cm, density_g_per_cm3 and reference_mass_g.")]
    fn add_food(&self, Parameters(p): Parameters<AddFoodParams>) -> Result<CallToolResult, McpError> {
        let data = FoodRecord {
            id: p.id.unwrap_or_default(),
            name: p.name, price: p.price, calories: p.calories, portion_based: p.portion_based,
            food_category: p.food_category, base_height_cm: p.base_height_cm,
            density_g_per_cm3: p.density_g_per_cm3, reference_mass_g: p.reference_mass_g,
            volume_method: p.volume_method, nutrition: to_nutrient_map(p.nutrition),
            ingredients: p.ingredients, allergens: p.allergens,
        };
        let result = foods::add_food(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a food record with nutrients, ingredients and allergens")]
    fn get_food(&self, Parameters(p): Parameters<GetFoodParams>) -> Result<CallToolResult, McpError> {
        let result = foods::get_food(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(food) => serde_json::to_string_pretty(&food),
            None => serde_json::to_string_pretty(&serde_json::json!({"error": "Food not found", "id": p.id})),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Search foods by id or name")]
    fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        let result = foods::search_foods(&self.database, &p.query, p.limit).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List foods with optional portion-based filter and pagination")]
    fn list_foods(&self, Parameters(p): Parameters<ListFoodsParams>) -> Result<CallToolResult, McpError> {
        let result = foods::list_foods(&self.database, p.portion_based, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a food record. Only the given fields change; nutrition, ingredients and allergens are replaced as a whole.")]
    fn update_food(&self, Parameters(p): Parameters<UpdateFoodParams>) -> Result<CallToolResult, McpError> {
        let data = FoodRecordUpdate {
            name: p.name, price: p.price, calories: p.calories, portion_based: p.portion_based,
            food_category: p.food_category, base_height_cm: p.base_height_cm,
            density_g_per_cm3: p.density_g_per_cm3, reference_mass_g: p.reference_mass_g,
            volume_method: p.volume_method, nutrition: p.nutrition.map(to_nutrient_map),
            ingredients: p.ingredients, allergens: p.allergens,
        };
        let result = foods::update_food(&self.database, &p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a food record")]
    fn delete_food(&self, Parameters(p): Parameters<DeleteFoodParams>) -> Result<CallToolResult, McpError> {
        let result = foods::delete_food(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get catalog statistics: food counts and price/calorie ranges")]
    fn food_database_stats(&self) -> Result<CallToolResult, McpError> {
        let result = foods::food_database_stats(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for PlatefulService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "plateful".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Plateful Portion Estimator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Plateful - portion, price and nutrition estimation for photographed food trays. \
                 Call estimation_instructions first. \
                 Estimation: estimate_portions (detections with class, confidence, bbox, segments; include forks/spoons for scale). \
                 Catalog: add_food/get_food/search_foods/list_foods/update_food/delete_food, food_database_stats. \
                 Status: plateful_status."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_params_accept_bad_entries() {
        let json = r#"{"detections": [
            {"class": "Corba", "confidence": 0.7, "bbox": [0, 0, 100, 100],
             "segments": [[0, 0], [100, 0], [100, 100], "oops", null]},
            {"class": "corba", "confidence": 0.7, "bbox": [1, 2, 3]},
            {"class": "ayran", "confidence": 0.6, "bbox": [200, 0, 240, 60]}
        ]}"#;
        let params: EstimatePortionsParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.detections.len(), 3);
        assert!(params.classes.is_none());

        let db = Database::in_memory().unwrap();
        db.with_conn(crate::db::migrations::run_migrations).unwrap();
        let response = estimate::estimate_portions(
            &db,
            &PortionEngine::default(),
            &params.detections,
            params.classes.as_deref(),
        );

        assert!(response.success);
        let report = response.report.unwrap();
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.data[0].polygon.points().len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
    }

    #[test]
    fn test_estimate_params_classes() {
        let json = r#"{"detections": [], "classes": ["pirinc_pilav"]}"#;
        let params: EstimatePortionsParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.classes.as_deref(), Some(&["pirinc_pilav".to_string()][..]));
    }

    #[test]
    fn test_to_nutrient_map() {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(r#"{"protein": "12g", "sodium": 340, "notes": null, "tags": ["a"]}"#).unwrap();
        let map = to_nutrient_map(raw);
        assert_eq!(map.len(), 2);
        assert_eq!(map["protein"], NutrientValue::Text("12g".into()));
        assert_eq!(map["sodium"], NutrientValue::Number(340.0));
    }
}
