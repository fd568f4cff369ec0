//! Nutrient scaling
//!
//! Multiplies a food's nutrient map by a portion count while keeping each
//! value in the format it was stored in.

use crate::models::{NutrientMap, NutrientValue};

/// Round to one decimal place
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Split "12.5mg" into ("12.5", "mg")
fn split_quantity(text: &str) -> (&str, &str) {
    let idx = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    text.split_at(idx)
}

/// Scale a single value.
///
/// Numbers are multiplied as-is. Strings are multiplied through their
/// leading numeric part, rounded to one decimal, and keep their unit suffix;
/// strings without a parsable leading number pass through unchanged.
pub fn scale_value(value: &NutrientValue, portion: f64) -> NutrientValue {
    match value {
        NutrientValue::Number(n) => NutrientValue::Number(n * portion),
        NutrientValue::Text(text) => {
            let (number, unit) = split_quantity(text);
            match number.parse::<f64>() {
                Ok(n) => NutrientValue::Text(format!("{:.1}{}", round1(n * portion), unit)),
                Err(_) => NutrientValue::Text(text.clone()),
            }
        }
    }
}

/// Scale every entry of a nutrient map by `portion`
pub fn scale_nutrients(nutrients: &NutrientMap, portion: f64) -> NutrientMap {
    nutrients
        .iter()
        .map(|(name, value)| (name.clone(), scale_value(value, portion)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, NutrientValue)]) -> NutrientMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_scale_unit_string() {
        let scaled = scale_nutrients(&map(&[("protein", "10g".into())]), 2.0);
        assert_eq!(scaled, map(&[("protein", "20.0g".into())]));
    }

    #[test]
    fn test_unparsable_string_passes_through() {
        let scaled = scale_nutrients(&map(&[("protein", "bad".into())]), 2.0);
        assert_eq!(scaled, map(&[("protein", "bad".into())]));

        let scaled = scale_nutrients(&map(&[("fat", "1.2.3g".into())]), 2.0);
        assert_eq!(scaled["fat"], NutrientValue::Text("1.2.3g".into()));
    }

    #[test]
    fn test_rounds_to_one_decimal_and_keeps_unit() {
        assert_eq!(scale_value(&"3.3 mg".into(), 2.0), NutrientValue::Text("6.6 mg".into()));
        assert_eq!(scale_value(&"1.04g".into(), 3.0), NutrientValue::Text("3.1g".into()));
        assert_eq!(scale_value(&"7g".into(), 0.5), NutrientValue::Text("3.5g".into()));
        assert_eq!(scale_value(&"12".into(), 2.5), NutrientValue::Text("30.0".into()));
    }

    #[test]
    fn test_numbers_scale_without_rounding() {
        assert_eq!(scale_value(&NutrientValue::Number(1.234), 2.0), NutrientValue::Number(2.468));
    }
}
