use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{
    dto::{DeletedIngredient, IngredientInput, IngredientUpdate},
    model::Ingredient,
};
use crate::{
    balance::services::refresh_after_write,
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn list(state: &AppState) -> AppResult<Vec<Ingredient>> {
    Ok(state.store.list_ingredients().await?)
}

pub async fn create(state: &AppState, input: IngredientInput) -> AppResult<Ingredient> {
    input.validate()?;
    let ingredient = Ingredient::new(
        input.name.trim().to_string(),
        input.unit.trim().to_string(),
        input.category,
    );
    state.store.insert_ingredient(&ingredient).await?;
    info!(ingredient_id = %ingredient.id, name = %ingredient.name, "ingredient created");
    Ok(ingredient)
}

/// Updates name, unit and, when given, category. A category change alters
/// the balance of every recipe using the ingredient, so their slots are
/// refreshed.
pub async fn update(state: &AppState, id: Uuid, input: IngredientUpdate) -> AppResult<Ingredient> {
    input.validate()?;
    let current = state
        .store
        .get_ingredient(id)
        .await?
        .ok_or(AppError::NotFound("ingredient"))?;

    let updated = Ingredient {
        id,
        name: input.name.trim().to_string(),
        unit: input.unit.trim().to_string(),
        category: input.category.unwrap_or(current.category),
    };
    let recipe_ids = if current.category != updated.category {
        state.store.recipe_ids_using_ingredient(id).await?
    } else {
        Vec::new()
    };
    if !state.store.update_ingredient(&updated).await? {
        return Err(AppError::NotFound("ingredient"));
    }
    refresh_after_write(state.store.as_ref(), state.rules(), &recipe_ids).await;
    info!(ingredient_id = %id, "ingredient updated");
    Ok(updated)
}

/// Deletes the ingredient and its recipe lines, then refreshes the slots of
/// every recipe that lost a line.
pub async fn delete(state: &AppState, id: Uuid) -> AppResult<DeletedIngredient> {
    let recipe_ids = state.store.recipe_ids_using_ingredient(id).await?;
    if !state.store.delete_ingredient(id).await? {
        return Err(AppError::NotFound("ingredient"));
    }
    let slots_refreshed =
        refresh_after_write(state.store.as_ref(), state.rules(), &recipe_ids).await;
    info!(ingredient_id = %id, recipes = recipe_ids.len(), "ingredient deleted");
    Ok(DeletedIngredient {
        id,
        recipes_affected: recipe_ids.len(),
        slots_refreshed,
    })
}
