//! Payload types carried inside an [`crate::envelope::RpcEnvelope`].
//!
//! These are plain Rust domain types, not HTTP DTOs — `beacon-hub`'s HTTP
//! layer has its own camelCase JSON views and converts to/from these at the
//! boundary, so a rename here never leaks into the wire framing (`bincode`
//! serializes struct fields positionally and does not care about names).

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

fn default_timeout_seconds() -> u32 {
    30
}

/// Immutable description of a command to run on the agent host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandRequest {
    pub const MIN_TIMEOUT_SECONDS: u32 = 1;
    pub const MAX_TIMEOUT_SECONDS: u32 = 300;

    /// `timeout_seconds` clamped to `[1, 300]`. Clamping is applied at the
    /// point of use (executor construction of the child's deadline) rather
    /// than at deserialization, so a `HistoryEntry` built from this request
    /// can still record the caller's literal value if that is ever wanted.
    pub fn clamped_timeout_seconds(&self) -> u32 {
        self.timeout_seconds
            .clamp(Self::MIN_TIMEOUT_SECONDS, Self::MAX_TIMEOUT_SECONDS)
    }
}

/// Immutable result of a command execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error: String,
    pub duration_ms: u64,
}

impl CommandResponse {
    /// Validation or other internal failure that never reached the OS
    /// process-creation primitive, or a spawn/IO error.
    pub const VALIDATION_OR_INTERNAL_FAILURE: i32 = -1;
    /// The child process hit its deadline and was killed.
    pub const TIMEOUT: i32 = -2;
    /// Conventional "command not found" exit status.
    pub const NOT_FOUND: i32 = 127;

    pub fn validation_failure(reason: impl Into<String>) -> Self {
        Self {
            exit_code: Self::VALIDATION_OR_INTERNAL_FAILURE,
            stdout: String::new(),
            stderr: String::new(),
            error: format!("command validation failed: {}", reason.into()),
            duration_ms: 0,
        }
    }

    pub fn policy_limit(reason: impl Into<String>) -> Self {
        Self {
            exit_code: Self::VALIDATION_OR_INTERNAL_FAILURE,
            stdout: String::new(),
            stderr: String::new(),
            error: reason.into(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Append-only audit record for one execution attempt that reached the
/// execution stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub args: Vec<String>,
    pub started_at_unix_ms: i64,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub workdir: Option<String>,
}

/// Wire payload for [`crate::envelope::Action::ExecuteCommand`] requests.
/// `client_key` is the authenticated caller identity plumbed down from the
/// hub's HTTP boundary so the agent's rate limiter can scope per caller
/// instead of a single hard-coded bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteCommandRequest {
    pub client_key: String,
    pub request: CommandRequest,
}

/// Wire payload for [`crate::envelope::Action::GetCommandHistory`] requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub limit: usize,
}

/// Wire payload for [`crate::envelope::Action::GetCommandHistory`] responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_the_documented_range() {
        let mut req = CommandRequest {
            command: "/bin/echo".into(),
            args: vec![],
            timeout_seconds: 0,
            workdir: None,
            env: HashMap::new(),
        };
        assert_eq!(req.clamped_timeout_seconds(), 1);

        req.timeout_seconds = 10_000;
        assert_eq!(req.clamped_timeout_seconds(), 300);

        req.timeout_seconds = 45;
        assert_eq!(req.clamped_timeout_seconds(), 45);
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let json = r#"{"command":"/bin/echo"}"#;
        let req: CommandRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.timeout_seconds, 30);
    }
}
