//! Shape groups
//!
//! Every food category is served in a characteristic shape. The group decides
//! how tall a serving of a given footprint is and which solid approximates
//! its volume (see `height.rs` and `volume.rs`).

use serde::Serialize;

/// Flat dishes with their own thickness curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatDish {
    /// makarna
    Pasta,
    /// salata
    Salad,
    /// tavuk_kul_basti, cig_kofte
    Other,
}

/// Irregular dishes with bespoke height rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrregularDish {
    /// tavuk_but
    ChickenLeg,
    /// kuru_fasulye
    Beans,
    /// tavuk_sote
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeGroup {
    /// Soups, filling their bowl
    Liquid,
    /// Spread out on the plate
    Flat(FlatDish),
    /// Heaped into a mound (pilafs)
    Dome,
    Irregular(IrregularDish),
    /// Anything not listed: plain prism, no height adjustment
    Default,
}

impl ShapeGroup {
    /// Group for a normalized category id
    pub fn for_category(category: &str) -> Self {
        match category {
            "corba" => ShapeGroup::Liquid,

            "makarna" => ShapeGroup::Flat(FlatDish::Pasta),
            "salata" => ShapeGroup::Flat(FlatDish::Salad),
            "tavuk_kul_basti" | "cig_kofte" => ShapeGroup::Flat(FlatDish::Other),

            "pirinc_pilav" | "bulgur_pilav" => ShapeGroup::Dome,

            "tavuk_but" => ShapeGroup::Irregular(IrregularDish::ChickenLeg),
            "kuru_fasulye" => ShapeGroup::Irregular(IrregularDish::Beans),
            "tavuk_sote" => ShapeGroup::Irregular(IrregularDish::Other),

            _ => ShapeGroup::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeGroup::Liquid => "liquid",
            ShapeGroup::Flat(_) => "flat",
            ShapeGroup::Dome => "dome",
            ShapeGroup::Irregular(_) => "irregular",
            ShapeGroup::Default => "default",
        }
    }
}
