use axum::{Json, extract::State};

use crate::types::{AskRequest, AskResponse};
use crate::{NexusError, router::NexusState};

pub async fn ask_handler(
    State(state): State<NexusState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, NexusError> {
    Ok(Json(state.assistant.ask(req).await?))
}
