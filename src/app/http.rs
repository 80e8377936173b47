use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{context::AppContext, endpoint};

pub(crate) fn build_router(context: Arc<AppContext>) -> Router {
    let router = Router::new()
        .route("/events/room", post(endpoint::room_event::handle))
        .route("/webhooks/session", post(endpoint::webhook::handle))
        .route("/actions/room-token", post(endpoint::room_token::handle));

    Router::new()
        .nest("/api/v1", router)
        .route("/healthz", get(endpoint::healthz))
        .layer(Extension(context))
        .layer(TraceLayer::new_for_http())
}
