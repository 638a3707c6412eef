pub mod dto;
pub mod handlers;
mod services;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};

pub fn router() -> Router<AppState> {
    handlers::routes().layer(DefaultBodyLimit::max(8 * 1024 * 1024)) // 8MB
}
