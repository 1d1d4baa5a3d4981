use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::types::{ConnectResponse, ConnectionProfile, SchemaQuery, SchemaSnapshot};
use crate::{NexusError, router::NexusState};

/// Register (or replace) a connection and check that it answers.
pub async fn connect_handler(
    State(state): State<NexusState>,
    Json(profile): Json<ConnectionProfile>,
) -> Result<Json<ConnectResponse>, NexusError> {
    Ok(Json(state.assistant.connect(profile).await?))
}

/// Reflected schema for a registered connection; `?refresh=true` bypasses the cache.
pub async fn schema_handler(
    State(state): State<NexusState>,
    Path(name): Path<String>,
    Query(query): Query<SchemaQuery>,
) -> Result<Json<SchemaSnapshot>, NexusError> {
    let snapshot = state.assistant.schema(&name, query.refresh).await?;
    Ok(Json(snapshot.as_ref().clone()))
}
