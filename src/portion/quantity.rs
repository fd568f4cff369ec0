//! Portion quantization
//!
//! Converts an estimated volume into servings of the catalog's reference
//! mass, quantized to half portions between 0.5 and 3.0.

pub const MIN_PORTION: f64 = 0.5;
pub const MAX_PORTION: f64 = 3.0;

/// Raw values below this are floored to [`MIN_PORTION`] without rounding
const FLOOR_THRESHOLD: f64 = 0.3;

/// Mass in grams
pub fn compute_mass(volume_cm3: f64, density_g_per_cm3: f64) -> f64 {
    volume_cm3 * density_g_per_cm3
}

/// Unrounded servings. A non-positive reference mass yields a neutral 1.0.
pub fn raw_portion(mass_g: f64, reference_mass_g: f64) -> f64 {
    if reference_mass_g <= 0.0 {
        return 1.0;
    }
    mass_g / reference_mass_g
}

/// Quantize to {0.5, 1.0, ..., 3.0}.
///
/// Everything below 0.75 lands on 0.5: values under 0.3 are floored outright
/// and 0.3..0.75 rounds down to the same step. Ties round to the even half
/// step.
pub fn round_portion(raw: f64) -> f64 {
    if raw < FLOOR_THRESHOLD || raw.is_nan() {
        return MIN_PORTION;
    }
    if raw > MAX_PORTION {
        return MAX_PORTION;
    }
    (raw * 2.0).round_ties_even() / 2.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortionQuantity {
    pub mass_g: f64,
    pub raw_portion: f64,
    pub portion: f64,
}

/// Volume -> mass -> raw portion -> quantized portion
pub fn calculate(volume_cm3: f64, density_g_per_cm3: f64, reference_mass_g: f64) -> PortionQuantity {
    let mass_g = compute_mass(volume_cm3, density_g_per_cm3);
    let raw = raw_portion(mass_g, reference_mass_g);
    PortionQuantity {
        mass_g,
        raw_portion: raw,
        portion: round_portion(raw),
    }
}
