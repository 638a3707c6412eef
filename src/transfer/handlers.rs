use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ExportDocument, ImportReport},
    services,
};
use crate::{error::AppResult, extract::AppJson, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfer/export", get(export_document))
        .route("/transfer/import", post(import_document))
}

#[instrument(skip(state))]
pub async fn export_document(State(state): State<AppState>) -> AppResult<Json<ExportDocument>> {
    Ok(Json(services::export(&state).await?))
}

#[instrument(skip(state, body))]
pub async fn import_document(
    State(state): State<AppState>,
    AppJson(body): AppJson<ExportDocument>,
) -> AppResult<Json<ImportReport>> {
    Ok(Json(services::import(&state, body).await?))
}
