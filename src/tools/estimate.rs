//! Portion Estimation MCP Tool
//!
//! Prices one tray of detections against the food catalog.

use serde::Serialize;
use serde_json::{json, Value};

use crate::catalog::normalize_category;
use crate::db::Database;
use crate::models::{Detection, MalformedDetection};
use crate::portion::{PortionEngine, PortionReport};

/// Response for estimate_portions
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: Option<PortionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EstimateResponse {
    fn ok(report: PortionReport) -> Self {
        Self {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(error),
        }
    }
}

/// Keep only entries whose class is in `classes` (compared after
/// normalization). An empty or missing filter keeps everything.
fn keep_class(item: &Result<Detection, MalformedDetection>, classes: &[String]) -> bool {
    if classes.is_empty() {
        return true;
    }
    let category = match item {
        Ok(detection) => &detection.category,
        Err(malformed) => &malformed.category,
    };
    let category = normalize_category(category);
    classes.iter().any(|c| normalize_category(c) == category)
}

/// Estimate portions, prices and nutrients for raw request detections.
///
/// Each entry is read on its own, so one unreadable entry ends up in
/// `failures` instead of rejecting the request. Never fails as a whole: a
/// request-level error (e.g. the catalog is unreachable) is reported as
/// `success: false`.
pub fn estimate_portions(
    db: &Database,
    engine: &PortionEngine,
    detections: &[Value],
    classes: Option<&[String]>,
) -> EstimateResponse {
    let classes = classes.unwrap_or_default();
    let items: Vec<_> = detections
        .iter()
        .map(Detection::from_value)
        .filter(|item| keep_class(item, classes))
        .collect();
    let count = items.len();
    if count < detections.len() {
        tracing::debug!("Class filter kept {} of {} detections", count, detections.len());
    }

    match engine.estimate_items(items, db) {
        Ok(report) => {
            tracing::info!(
                "Estimated {} of {} detections: total_price={:.2} total_calories={} ({:.3}s)",
                report.data.len(),
                count,
                report.total_price,
                report.total_calories,
                report.processing_time
            );
            EstimateResponse::ok(report)
        }
        Err(e) => {
            tracing::error!("Portion estimation failed: {}", e);
            EstimateResponse::failed(e.to_string())
        }
    }
}
