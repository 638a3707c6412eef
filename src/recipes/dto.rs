use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::model::{Recipe, RecipeLine, DEFAULT_SERVINGS};
use crate::{
    balance::classifier::BalanceVerdict, ingredients::model::Category, validation::not_blank,
};

fn default_servings() -> i32 {
    DEFAULT_SERVINGS
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecipeInput {
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
    pub lines: Vec<LineInput>,
}

/// `unit` falls back to the ingredient's default unit when omitted.
#[derive(Debug, Deserialize, Validate)]
pub struct LineInput {
    pub ingredient_id: Uuid,
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub quantity: f64,
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "not_blank")
    )]
    pub unit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LineView {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub category: Category,
    pub quantity: f64,
    pub unit: String,
}

impl From<RecipeLine> for LineView {
    fn from(l: RecipeLine) -> Self {
        Self {
            ingredient_id: l.ingredient_id,
            ingredient_name: l.ingredient_name,
            category: l.category,
            quantity: l.quantity,
            unit: l.unit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub prep_minutes: Option<i32>,
    pub servings: i32,
    pub lines: Vec<LineView>,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<BalanceVerdict>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl RecipeView {
    pub fn with_balance(recipe: Recipe, balance: Option<BalanceVerdict>) -> Self {
        let categories = recipe.categories_present().into_iter().collect();
        Self {
            id: recipe.id,
            name: recipe.name,
            description: recipe.description,
            prep_minutes: recipe.prep_minutes,
            servings: recipe.servings,
            lines: recipe.lines.into_iter().map(LineView::from).collect(),
            categories,
            balance,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

impl From<Recipe> for RecipeView {
    fn from(recipe: Recipe) -> Self {
        Self::with_balance(recipe, None)
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedRecipe {
    pub id: Uuid,
    pub slots_detached: usize,
}
