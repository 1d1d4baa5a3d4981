use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{ask_handler, connect_handler, schema_handler};
use crate::service::Assistant;

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
pub struct NexusState {
    pub assistant: Arc<Assistant>,
}

impl NexusState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self { assistant }
    }
}

pub fn nexus_router(state: NexusState) -> Router {
    Router::new()
        .route("/connect", post(connect_handler))
        .route("/schema/{name}", get(schema_handler))
        .route("/ask", post(ask_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
