//! Nutrition module
//!
//! Portion scaling of nutrient maps.

pub mod scaler;

pub use scaler::{scale_nutrients, scale_value};
