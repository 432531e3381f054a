use std::sync::Arc;

use axum::{
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::{groups::NodeGroupStore, storage::json_file_kv::JsonFileKv};

pub mod node_groups;

/// Shared handler state: the one store owning the canonical group list.
#[derive(Clone)]
pub struct ServerState {
    pub groups: Arc<NodeGroupStore<JsonFileKv>>,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router, including static assets, health, and
/// the node-group API.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let static_dir = ServeDir::new("frontend").fallback(ServeFile::new("frontend/index.html"));

    // Public routes; anything unmatched falls through to the static assets
    let public = Router::new()
        .route("/health", get(health))
        .fallback_service(static_dir);

    // Node-group API; the method-router fallback turns any verb other than
    // GET/POST/DELETE into a structured 405 body.
    let api = Router::new().route(
        "/api/node-groups",
        get(node_groups::list_groups)
            .post(node_groups::upsert_group)
            .delete(node_groups::delete_group)
            .fallback(node_groups::method_not_allowed),
    );

    // Compose
    public
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
