//! Route handlers for the two endpoints in spec §6.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Extension;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use beacon_protocol::CommandRequest;

use crate::dispatcher::Dispatcher;
use crate::error::HubError;
use crate::http::auth::Identity;
use crate::http::dto::ExecuteRequestDto;
use crate::http::dto::ExecuteResponseDto;
use crate::http::dto::HistoryEntryDto;
use crate::http::dto::HistoryQuery;
use crate::http::dto::HistoryResponseDto;

/// `POST /api/{app}/agents/{id}/commands/execute`.
pub async fn execute_command(
    State(dispatcher): State<Arc<Dispatcher>>,
    Extension(identity): Extension<Identity>,
    Path((_app, agent_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ExecuteResponseDto>, HubError> {
    if agent_id.is_empty() {
        return Err(HubError::BadRequest("missing agent id".to_string()));
    }

    let dto: ExecuteRequestDto = serde_json::from_slice(&body)
        .map_err(|err| HubError::BadRequest(format!("unreadable body: {err}")))?;
    if dto.command.is_empty() {
        return Err(HubError::BadRequest("command must not be empty".to_string()));
    }

    let request: CommandRequest = dto.into();
    let response = dispatcher
        .execute_command(&agent_id, &identity.0, request)
        .await?;
    Ok(Json(response.into()))
}

/// `GET /api/{app}/agents/{id}/commands/history?limit=N`.
pub async fn get_history(
    State(dispatcher): State<Arc<Dispatcher>>,
    Extension(_identity): Extension<Identity>,
    Path((_app, agent_id)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponseDto>, HubError> {
    if agent_id.is_empty() {
        return Err(HubError::BadRequest("missing agent id".to_string()));
    }

    let history = dispatcher
        .get_history(&agent_id, query.clamped_limit())
        .await?;
    Ok(Json(HistoryResponseDto {
        history: history.into_iter().map(HistoryEntryDto::from).collect(),
    }))
}
