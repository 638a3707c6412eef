use axum::{
    extract::State,
    http::{header, HeaderName},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{dto::ShoppingList, services};
use crate::{
    error::AppResult,
    extract::AppQuery,
    planner::{dto::WeekQuery, today},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping-list", get(get_shopping_list))
        .route("/shopping-list/text", get(get_shopping_list_text))
}

#[instrument(skip(state))]
pub async fn get_shopping_list(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<WeekQuery>,
) -> AppResult<Json<ShoppingList>> {
    let week_start = q.anchor(today())?;
    Ok(Json(services::shopping_list(&state, week_start).await?))
}

#[instrument(skip(state))]
pub async fn get_shopping_list_text(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<WeekQuery>,
) -> AppResult<([(HeaderName, &'static str); 1], String)> {
    let week_start = q.anchor(today())?;
    let list = services::shopping_list(&state, week_start).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        services::render_text(&list),
    ))
}
