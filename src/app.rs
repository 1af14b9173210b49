use axum::{middleware, Router};
use crate::state::AppState;
use tower_http::trace::TraceLayer;

pub async fn create_app(state: AppState) -> Router {
    crate::routes::configure_routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::client_ip::client_ip_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
