pub mod dto;
pub mod handlers;
pub mod model;
mod services;
pub mod week;

pub use services::today;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
