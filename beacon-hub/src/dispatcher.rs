//! Hub dispatcher (spec §4.5): locates the session for a target agent,
//! issues an RPC with a hub-side timeout, and translates the outcome into a
//! typed result for the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::AgentRegistry;
use beacon_core::AgentStatus;
use beacon_core::Session;
use beacon_protocol::Action;
use beacon_protocol::CommandRequest;
use beacon_protocol::CommandResponse;
use beacon_protocol::ExecuteCommandRequest;
use beacon_protocol::HistoryEntry;
use beacon_protocol::HistoryRequest;
use beacon_protocol::HistoryResponse;
use beacon_protocol::RpcEnvelope;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;

use crate::error::HubError;

pub struct Dispatcher {
    registry: Arc<AgentRegistry>,
    rpc_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<AgentRegistry>, rpc_timeout: Duration) -> Self {
        Self { registry, rpc_timeout }
    }

    /// Runs `POST .../commands/execute` against `agent_id` on behalf of
    /// `client_key` (the authenticated caller's identity, plumbed through to
    /// the agent's rate limiter per SPEC_FULL §9).
    pub async fn execute_command(
        &self,
        agent_id: &str,
        client_key: &str,
        request: CommandRequest,
    ) -> Result<CommandResponse, HubError> {
        let session = self.online_session(agent_id).await?;
        let payload = encode_payload(&ExecuteCommandRequest {
            client_key: client_key.to_string(),
            request,
        })?;
        let envelope = self.rpc(&session, Action::ExecuteCommand, payload).await?;
        decode_payload(&envelope.payload)
            .map_err(|e| HubError::Internal(format!("malformed execute response: {e}")))
    }

    /// Runs `GET .../commands/history` against `agent_id`.
    pub async fn get_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HubError> {
        let session = self.online_session(agent_id).await?;
        let payload = encode_payload(&HistoryRequest { limit })?;
        let envelope = self.rpc(&session, Action::GetCommandHistory, payload).await?;
        let response: HistoryResponse = decode_payload(&envelope.payload)
            .map_err(|e| HubError::Internal(format!("malformed history response: {e}")))?;
        Ok(response.history)
    }

    async fn online_session(&self, agent_id: &str) -> Result<Arc<Session>, HubError> {
        match self.registry.get(agent_id).await {
            None => Err(HubError::NotFound(format!("unknown agent: {agent_id}"))),
            Some(AgentStatus::Offline) => {
                Err(HubError::ServiceUnavailable("agent is offline".to_string()))
            }
            Some(AgentStatus::Online(session)) => Ok(session),
        }
    }

    async fn rpc(
        &self,
        session: &Session,
        action: Action,
        payload: Vec<u8>,
    ) -> Result<RpcEnvelope, HubError> {
        let envelope = session
            .send_and_wait(action, payload, self.rpc_timeout)
            .await
            .map_err(HubError::from_session_error)?;
        if let Some(error) = envelope.error.clone() {
            return Err(HubError::Internal(error));
        }
        Ok(envelope)
    }
}
