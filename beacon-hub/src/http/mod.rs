//! Hub HTTP API layer (SPEC_FULL §4.7): the authenticated surface that
//! fronts the dispatcher. Routes and status codes match spec §6 exactly;
//! everything here — the concrete web framework, the auth seam, the
//! request tracing — is the ambient detail the distilled spec left to the
//! implementer.

pub mod auth;
pub mod dto;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route(
            "/api/{app}/agents/{id}/commands/execute",
            post(handlers::execute_command),
        )
        .route(
            "/api/{app}/agents/{id}/commands/history",
            get(handlers::get_history),
        )
        .with_state(dispatcher)
        .layer(auth::AuthLayer)
        .layer(TraceLayer::new_for_http())
}
