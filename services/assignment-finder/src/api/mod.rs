//! HTTP invocation transport.

pub mod error;
mod health;
mod invoke;

pub use invoke::parse_event;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router with health and invocation routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/v1", invoke::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
