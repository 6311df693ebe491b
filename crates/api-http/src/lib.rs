//! HTTP Request Surface
//!
//! Thin layer over the core: every handler does fast registry operations and
//! returns immediately; nothing here ever waits on a generation.

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

use axum::Router;
use state::ApiState;
use tower_http::trace::TraceLayer;

/// Build the application [`Router`].
///
/// Shared by the production binary and the integration tests so both see
/// the exact same surface.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::tasks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
