use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::{
    dto::{
        BalanceQuery, BulkBalanceInput, MoveInput, MoveView, SlotInput, SlotView, WeekGrid,
        WeekQuery,
    },
    services,
};
use crate::{
    balance::classifier::BalanceVerdict,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/planner", get(get_week))
        .route("/planner/slots/:id/balance", get(get_slot_balance))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/planner/slots", put(upsert_slot))
        .route("/planner/slots/:id", delete(delete_slot))
        .route("/planner/slots/:id/move", post(move_slot))
        .route("/planner/balance", post(bulk_balance))
}

#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<WeekQuery>,
) -> AppResult<Json<WeekGrid>> {
    let week_start = q.anchor(services::today())?;
    Ok(Json(services::week_grid(&state, week_start).await?))
}

/// PUT /planner/slots: 201 when the cell was empty, 200 when overwritten.
#[instrument(skip(state, body))]
pub async fn upsert_slot(
    State(state): State<AppState>,
    AppJson(body): AppJson<SlotInput>,
) -> AppResult<(StatusCode, Json<SlotView>)> {
    let (view, created) = services::upsert_slot(&state, body).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(view)))
}

#[instrument(skip(state))]
pub async fn delete_slot(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_slot(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn move_slot(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<MoveInput>,
) -> AppResult<Json<MoveView>> {
    let outcome = services::move_slot(&state, id, body).await?;
    Ok(Json(MoveView {
        moved: outcome.moved,
        displaced: outcome.displaced,
    }))
}

#[instrument(skip(state))]
pub async fn get_slot_balance(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(q): AppQuery<BalanceQuery>,
) -> AppResult<Json<BalanceVerdict>> {
    Ok(Json(services::balance(&state, id, q.use_cache, q.refresh).await?))
}

#[instrument(skip(state, body))]
pub async fn bulk_balance(
    State(state): State<AppState>,
    AppJson(body): AppJson<BulkBalanceInput>,
) -> AppResult<Json<BTreeMap<Uuid, BalanceVerdict>>> {
    body.validate()?;
    let verdicts =
        services::bulk_balance(&state, &body.slot_ids, body.use_cache, body.refresh).await?;
    Ok(Json(verdicts))
}
