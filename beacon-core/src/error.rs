use thiserror::Error;

pub type Result<T> = std::result::Result<T, BeaconError>;

/// The three sub-kinds of [`BeaconError::Timeout`] named in spec §7: a hub
/// RPC deadline, an agent-side handler deadline, and the executor's own
/// child-process deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    HubRpc,
    AgentHandler,
    ChildProcess,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeoutKind::HubRpc => "hub RPC deadline",
            TimeoutKind::AgentHandler => "agent handler deadline",
            TimeoutKind::ChildProcess => "child process deadline",
        };
        f.write_str(s)
    }
}

/// Error taxonomy from spec §7. Each variant maps to a documented HTTP
/// status or `CommandResponse.exit_code` at its respective boundary; see
/// `beacon-hub::error::HubError` for the HTTP mapping.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Input failed a policy rule before the OS process-creation primitive
    /// was ever invoked. Not retryable.
    #[error("{0}")]
    Validation(String),

    /// Rate or concurrency limit hit. Not retryable immediately.
    #[error("{0}")]
    PolicyLimit(String),

    /// One of the three timeout layers from spec §5 elapsed.
    #[error("{kind} elapsed")]
    Timeout { kind: TimeoutKind },

    /// The session is disconnected, or a decode/frame error terminated it.
    #[error("{0}")]
    Transport(String),

    /// Unknown agent id, or (at the executor layer) an executable that does
    /// not exist.
    #[error("{0}")]
    NotFound(String),

    /// Anything else: bugs, panics caught at a handler boundary, spawn
    /// failures that are not validation failures.
    #[error("{0}")]
    Internal(String),
}

impl BeaconError {
    pub fn timeout(kind: TimeoutKind) -> Self {
        BeaconError::Timeout { kind }
    }
}

impl From<std::io::Error> for BeaconError {
    fn from(err: std::io::Error) -> Self {
        BeaconError::Internal(err.to_string())
    }
}
