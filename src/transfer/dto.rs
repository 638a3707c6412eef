use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::{ingredients::model::Category, recipes::model::DEFAULT_SERVINGS, validation::not_blank};

pub const FORMAT_VERSION: u32 = 1;

fn default_servings() -> i32 {
    DEFAULT_SERVINGS
}

/// Interchange document holding every recipe, plus the ingredients no
/// recipe uses.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ExportDocument {
    pub version: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub exported_at: Option<OffsetDateTime>,
    #[validate(nested)]
    pub recipes: Vec<ExportedRecipe>,
    #[serde(default)]
    #[validate(nested)]
    pub ingredients: Vec<ExportedIngredient>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ExportedRecipe {
    #[validate(
        length(min = 1, max = 200, message = "must be between 1 and 200 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1440, message = "must be between 0 and 1440 minutes"))]
    pub prep_minutes: Option<i32>,
    #[serde(default = "default_servings")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub servings: i32,
    #[serde(default)]
    #[validate(nested)]
    pub ingredients: Vec<ExportedLine>,
}

/// A recipe line carrying its ingredient by name. `unit` is the
/// ingredient's default unit, `line_unit` the unit of this quantity.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ExportedLine {
    #[validate(
        length(min = 1, max = 100, message = "must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "not_blank")
    )]
    pub unit: String,
    #[serde(default)]
    pub category: Category,
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub quantity: f64,
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "not_blank")
    )]
    pub line_unit: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ExportedIngredient {
    #[validate(
        length(min = 1, max = 100, message = "must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "not_blank")
    )]
    pub unit: String,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub recipes_created: usize,
    pub ingredients_created: usize,
    pub ingredients_reused: usize,
}
