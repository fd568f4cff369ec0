//! Nutrient values
//!
//! A food's nutrient map holds either plain numbers or numeric strings with a
//! unit suffix ("10g", "3.5mg"), exactly as they were entered in the catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A single nutrient value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutrientValue {
    Number(f64),
    Text(String),
}

/// Nutrient name -> value, ordered by name
pub type NutrientMap = BTreeMap<String, NutrientValue>;

impl From<f64> for NutrientValue {
    fn from(value: f64) -> Self {
        NutrientValue::Number(value)
    }
}

impl From<&str> for NutrientValue {
    fn from(value: &str) -> Self {
        NutrientValue::Text(value.to_string())
    }
}

impl From<String> for NutrientValue {
    fn from(value: String) -> Self {
        NutrientValue::Text(value)
    }
}

impl fmt::Display for NutrientValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NutrientValue::Number(n) => write!(f, "{}", n),
            NutrientValue::Text(s) => f.write_str(s),
        }
    }
}

/// Deserialize a nutrient map, dropping null entries.
///
/// Older catalog exports carry `"fiber": null` for nutrients that were never
/// measured.
pub fn deserialize_nutrients<'de, D>(deserializer: D) -> Result<NutrientMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<NutrientValue>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_nutrients")]
        nutrition: NutrientMap,
    }

    #[test]
    fn test_untagged_values() {
        let map: NutrientMap =
            serde_json::from_str(r#"{"protein": "10g", "sodium": 120.5}"#).unwrap();
        assert_eq!(map["protein"], NutrientValue::Text("10g".into()));
        assert_eq!(map["sodium"], NutrientValue::Number(120.5));
    }

    #[test]
    fn test_null_nutrients_are_dropped() {
        let h: Holder =
            serde_json::from_str(r#"{"nutrition": {"protein": "4g", "fiber": null}}"#).unwrap();
        assert_eq!(h.nutrition.len(), 1);
        assert!(h.nutrition.contains_key("protein"));

        let h: Holder = serde_json::from_str(r#"{"nutrition": null}"#).unwrap();
        assert!(h.nutrition.is_empty());

        let h: Holder = serde_json::from_str("{}").unwrap();
        assert!(h.nutrition.is_empty());
    }
}
