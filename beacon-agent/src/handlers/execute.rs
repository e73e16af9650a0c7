//! Handler for [`beacon_protocol::Action::ExecuteCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::CommandExecutor;
use beacon_protocol::ExecuteCommandRequest;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;

use super::Handler;

pub struct ExecuteCommandHandler {
    executor: Arc<CommandExecutor>,
}

impl ExecuteCommandHandler {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Handler for ExecuteCommandHandler {
    async fn handle(&self, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        let request: ExecuteCommandRequest =
            decode_payload(&payload).map_err(|e| format!("malformed execute request: {e}"))?;
        let response = self
            .executor
            .execute(&request.client_key, &request.request)
            .await;
        encode_payload(&response).map_err(|e| format!("failed to encode response: {e}"))
    }
}
