//! Handler for [`beacon_protocol::Action::GetCommandHistory`]. Kept as a
//! distinct action tag from `ExecuteCommand` (SPEC_FULL §9) — the source
//! this was distilled from reused one tag for both, which spec.md §9 flags
//! as a latent bug, not intent.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::CommandExecutor;
use beacon_protocol::HistoryRequest;
use beacon_protocol::HistoryResponse;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;

use super::Handler;

pub struct HistoryHandler {
    executor: Arc<CommandExecutor>,
}

impl HistoryHandler {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Handler for HistoryHandler {
    async fn handle(&self, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        let request: HistoryRequest =
            decode_payload(&payload).map_err(|e| format!("malformed history request: {e}"))?;
        let history = self.executor.get_history(request.limit).await;
        encode_payload(&HistoryResponse { history })
            .map_err(|e| format!("failed to encode response: {e}"))
    }
}
