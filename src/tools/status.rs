//! Plateful Status Tool
//!
//! Runtime status of the service and usage notes for MCP clients.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::portion::EngineConfig;

/// How to drive the estimation tools, for AI assistants
pub const ESTIMATION_INSTRUCTIONS: &str = r#"
# Plateful Portion Estimation

`estimate_portions` prices a photographed tray from detector output.

## Input

One entry per detected object:

```json
{
  "class": "pirinc_pilav",
  "confidence": 0.91,
  "bbox": [120, 80, 360, 300],
  "segments": [[130, 90], [350, 95], [355, 290], [125, 285]]
}
```

- `class` is matched against the food catalog after lowercasing and replacing
  spaces with underscores ("Pirinc Pilav" -> "pirinc_pilav").
- `bbox` is `[x1, y1, x2, y2]` in pixels and is required.
- `segments` is the outline polygon in pixels. It only matters for
  portion-based foods. Points that are not `[x, y]` number pairs are skipped.
- An entry with an unreadable `bbox` or `confidence` is reported in
  `failures`; the rest of the tray is still estimated.

Pass `classes: ["pirinc_pilav", "fork"]` to estimate only those classes
(normalized the same way). Markers left out by the filter do not calibrate.

## Calibration

Include any detected cutlery. `fork`/`catal` and `spoon`/`kasik` boxes set the
cm²-per-pixel² scale (median over all markers). Without them a configured
default scale is used and portions are less reliable.

Markers are also priced like any other item.

## Output

- `data`: priced items. Portion-based foods carry `portion` (0.5 to 3.0 in half
  steps) with scaled price, calories and nutrients, plus a `measurement`
  breakdown (area, height, volume, mass).
- `failures`: detections that could not be priced (e.g. missing bbox). They
  are excluded from the totals.
- `total_price`, `total_calories`.

Unknown classes get a generic record whose price grows with confidence.

## Catalog

Use `add_food`, `update_food`, `get_food`, `search_foods`, `list_foods`,
`delete_food` and `food_database_stats` to maintain the catalog. Set
`portion_based: true` together with `base_height_cm`, `density_g_per_cm3` and
`reference_mass_g` for foods served by volume (rice, soup, salad).
"#;

/// Runtime status of the Plateful service
#[derive(Debug, Clone, Serialize)]
pub struct PlatefulStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Estimation defaults in effect
    pub engine: EngineConfig,

    /// Process information
    pub started_at: String,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    started_at: DateTime<Utc>,
    database_path: PathBuf,
    engine: EngineConfig,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, engine: EngineConfig) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: Utc::now(),
            database_path,
            engine,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> PlatefulStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        PlatefulStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            engine: self.engine.clone(),
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
