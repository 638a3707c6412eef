use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{
    dto::{DeletedRecipe, LineInput, RecipeInput},
    model::{Recipe, RecipeLine},
};
use crate::{
    balance::{
        classifier::{classify, BalanceVerdict},
        services::refresh_after_write,
    },
    error::{AppError, AppResult},
    state::AppState,
};

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Looks up every referenced ingredient; fails before any write when one
/// is missing.
async fn resolve_lines(state: &AppState, inputs: Vec<LineInput>) -> AppResult<Vec<RecipeLine>> {
    let mut lines = Vec::with_capacity(inputs.len());
    for input in inputs {
        let ingredient = state
            .store
            .get_ingredient(input.ingredient_id)
            .await?
            .ok_or(AppError::NotFound("ingredient"))?;
        let unit = input
            .unit
            .map(|u| u.trim().to_string())
            .unwrap_or_else(|| ingredient.unit.clone());
        lines.push(RecipeLine::new(&ingredient, input.quantity, unit));
    }
    Ok(lines)
}

pub async fn list(state: &AppState) -> AppResult<Vec<Recipe>> {
    Ok(state.store.list_recipes().await?)
}

/// The recipe together with the verdict its current composition earns.
pub async fn get(state: &AppState, id: Uuid) -> AppResult<(Recipe, BalanceVerdict)> {
    let recipe = state
        .store
        .get_recipe(id)
        .await?
        .ok_or(AppError::NotFound("recipe"))?;
    let verdict = classify(&recipe.categories_present(), state.rules());
    Ok((recipe, verdict))
}

pub async fn create(state: &AppState, input: RecipeInput) -> AppResult<Recipe> {
    input.validate()?;
    let lines = resolve_lines(state, input.lines).await?;
    let now = OffsetDateTime::now_utc();
    let recipe = Recipe {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        description: clean_description(input.description),
        prep_minutes: input.prep_minutes,
        servings: input.servings,
        lines,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_recipe(&recipe).await?;
    info!(recipe_id = %recipe.id, lines = recipe.lines.len(), "recipe created");

    // Re-read so lines come back in stored order.
    Ok(state.store.get_recipe(recipe.id).await?.unwrap_or(recipe))
}

/// Replaces every field and the full line set, then refreshes the caches
/// of the slots serving this recipe.
pub async fn replace(state: &AppState, id: Uuid, input: RecipeInput) -> AppResult<Recipe> {
    input.validate()?;
    let current = state
        .store
        .get_recipe(id)
        .await?
        .ok_or(AppError::NotFound("recipe"))?;
    let lines = resolve_lines(state, input.lines).await?;

    let recipe = Recipe {
        id,
        name: input.name.trim().to_string(),
        description: clean_description(input.description),
        prep_minutes: input.prep_minutes,
        servings: input.servings,
        lines,
        created_at: current.created_at,
        updated_at: OffsetDateTime::now_utc(),
    };
    if !state.store.replace_recipe(&recipe).await? {
        return Err(AppError::NotFound("recipe"));
    }
    let slots = refresh_after_write(state.store.as_ref(), state.rules(), &[id]).await;
    info!(recipe_id = %id, slots_refreshed = slots, "recipe replaced");

    Ok(state.store.get_recipe(id).await?.unwrap_or(recipe))
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<DeletedRecipe> {
    let slots_detached = state.store.list_slots_for_recipe(id).await?.len();
    if !state.store.delete_recipe(id).await? {
        return Err(AppError::NotFound("recipe"));
    }
    info!(recipe_id = %id, slots_detached, "recipe deleted");
    Ok(DeletedRecipe { id, slots_detached })
}
