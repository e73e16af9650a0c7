//! Payload for [`crate::envelope::Action::Handshake`].
//!
//! The agent dials the hub and sends exactly one `Handshake` request as the
//! first envelope on a freshly opened connection, before the connection
//! enters the general request/response session loop (spec §3 "Lifecycle":
//! "A Session is created on successful handshake").

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub agent_id: String,
    pub key: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub accepted: bool,
    pub message: String,
}
