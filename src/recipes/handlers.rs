use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{DeletedRecipe, RecipeInput, RecipeView},
    services,
};
use crate::{
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/:id", put(replace_recipe).delete(delete_recipe))
}

#[instrument(skip(state))]
pub async fn list_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<RecipeView>>> {
    let recipes = services::list(&state).await?;
    Ok(Json(recipes.into_iter().map(RecipeView::from).collect()))
}

/// One recipe with its categories and the balance verdict of its current
/// composition.
#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<RecipeView>> {
    let (recipe, verdict) = services::get(&state, id).await?;
    Ok(Json(RecipeView::with_balance(recipe, Some(verdict))))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AppJson(body): AppJson<RecipeInput>,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<RecipeView>)> {
    let recipe = services::create(&state, body).await?;
    let location = format!("/api/v1/recipes/{}", recipe.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(recipe.into())))
}

#[instrument(skip(state, body))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<RecipeInput>,
) -> AppResult<Json<RecipeView>> {
    let recipe = services::replace(&state, id, body).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<DeletedRecipe>> {
    Ok(Json(services::delete(&state, id).await?))
}
