//! Engine configuration
//!
//! Physical defaults and calibration-marker sizes. Values can be overridden
//! through `PLATEFUL_*` environment variables.

use serde::Serialize;

/// Known physical size of each calibration marker, in cm²
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerAreas {
    pub fork_cm2: f64,
    pub spoon_cm2: f64,
}

impl Default for MarkerAreas {
    fn default() -> Self {
        // 19.5cm x 2.5cm fork, 19.5cm x 4.5cm spoon
        Self {
            fork_cm2: 48.75,
            spoon_cm2: 87.75,
        }
    }
}

/// Constants consumed by the portion engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub default_height_cm: f64,
    pub default_density_g_per_cm3: f64,
    pub default_reference_mass_g: f64,
    /// cm² per pixel² used when no marker is visible
    pub default_scale_factor: f64,
    pub marker_areas: MarkerAreas,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_height_cm: 2.0,
            default_density_g_per_cm3: 0.8,
            default_reference_mass_g: 150.0,
            default_scale_factor: 0.003,
            marker_areas: MarkerAreas::default(),
        }
    }
}

/// Read a strictly positive float from the environment
fn positive_env(key: &str) -> Option<f64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            tracing::warn!("Ignoring {}={:?}: expected a positive number", key, raw);
            None
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by any valid `PLATEFUL_*` variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = positive_env("PLATEFUL_DEFAULT_HEIGHT_CM") {
            config.default_height_cm = v;
        }
        if let Some(v) = positive_env("PLATEFUL_DEFAULT_DENSITY") {
            config.default_density_g_per_cm3 = v;
        }
        if let Some(v) = positive_env("PLATEFUL_DEFAULT_REFERENCE_MASS_G") {
            config.default_reference_mass_g = v;
        }
        if let Some(v) = positive_env("PLATEFUL_DEFAULT_SCALE_FACTOR") {
            config.default_scale_factor = v;
        }
        if let Some(v) = positive_env("PLATEFUL_FORK_AREA_CM2") {
            config.marker_areas.fork_cm2 = v;
        }
        if let Some(v) = positive_env("PLATEFUL_SPOON_AREA_CM2") {
            config.marker_areas.spoon_cm2 = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_height_cm, 2.0);
        assert_eq!(config.default_density_g_per_cm3, 0.8);
        assert_eq!(config.default_reference_mass_g, 150.0);
        assert_eq!(config.default_scale_factor, 0.003);
        assert_eq!(config.marker_areas.fork_cm2, 48.75);
        assert_eq!(config.marker_areas.spoon_cm2, 87.75);
    }

    #[test]
    fn test_env_overrides_ignore_invalid_values() {
        std::env::set_var("PLATEFUL_DEFAULT_DENSITY", "1.05");
        std::env::set_var("PLATEFUL_DEFAULT_REFERENCE_MASS_G", "-3");
        let config = EngineConfig::from_env();
        std::env::remove_var("PLATEFUL_DEFAULT_DENSITY");
        std::env::remove_var("PLATEFUL_DEFAULT_REFERENCE_MASS_G");

        assert_eq!(config.default_density_g_per_cm3, 1.05);
        assert_eq!(config.default_reference_mass_g, 150.0);
    }
}
