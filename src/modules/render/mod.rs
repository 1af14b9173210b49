use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod composition;
pub mod dto;
pub mod handler;
pub mod model;
pub mod queue;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", post(handler::enqueue_render))
        .route("/status/{id}", get(handler::get_status))
        .route("/download/{id}", get(handler::download_render))
}
