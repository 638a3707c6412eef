use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{DeletedIngredient, IngredientInput, IngredientUpdate, IngredientView},
    model::Category,
    services,
};
use crate::{
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/categories", get(list_categories))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", post(create_ingredient))
        .route("/ingredients/:id", put(update_ingredient).delete(delete_ingredient))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<IngredientView>>> {
    let items = services::list(&state).await?;
    Ok(Json(items.into_iter().map(IngredientView::from).collect()))
}

pub async fn list_categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(Category::as_str).collect())
}

#[instrument(skip(state, body))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AppJson(body): AppJson<IngredientInput>,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<IngredientView>)> {
    let ingredient = services::create(&state, body).await?;
    let location = format!("/api/v1/ingredients/{}", ingredient.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ingredient.into()),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<IngredientUpdate>,
) -> AppResult<Json<IngredientView>> {
    let ingredient = services::update(&state, id, body).await?;
    Ok(Json(ingredient.into()))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<DeletedIngredient>> {
    Ok(Json(services::delete(&state, id).await?))
}
