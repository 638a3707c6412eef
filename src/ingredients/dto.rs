use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::model::{Category, Ingredient};
use crate::validation::not_blank;

#[derive(Debug, Deserialize, Validate)]
pub struct IngredientInput {
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

/// Body of `PUT /ingredients/:id`. An omitted category keeps the stored one.
#[derive(Debug, Deserialize, Validate)]
pub struct IngredientUpdate {
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
    pub category: Option<Category>,
}

#[derive(Debug, Serialize)]
pub struct IngredientView {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub category: Category,
}

impl From<Ingredient> for IngredientView {
    fn from(i: Ingredient) -> Self {
        Self {
            id: i.id,
            name: i.name,
            unit: i.unit,
            category: i.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedIngredient {
    pub id: Uuid,
    pub recipes_affected: usize,
    pub slots_refreshed: usize,
}
