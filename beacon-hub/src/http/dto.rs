//! JSON views at the HTTP boundary (spec §6). These are deliberately
//! separate from the wire-visible types in `beacon-protocol`: a rename here
//! (e.g. `exitCode` vs. `exit_code`) never has to ripple into the binary
//! envelope format.

use std::collections::HashMap;

use beacon_protocol::CommandRequest;
use beacon_protocol::CommandResponse;
use beacon_protocol::HistoryEntry;
use serde::Deserialize;
use serde::Serialize;

fn default_history_limit() -> usize {
    10
}

pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequestDto {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout: Option<u32>,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl From<ExecuteRequestDto> for CommandRequest {
    fn from(dto: ExecuteRequestDto) -> Self {
        CommandRequest {
            command: dto.command,
            args: dto.args,
            timeout_seconds: dto.timeout.unwrap_or(30),
            workdir: dto.workdir,
            env: dto.env,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponseDto {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error: String,
    pub duration: u64,
}

impl From<CommandResponse> for ExecuteResponseDto {
    fn from(response: CommandResponse) -> Self {
        Self {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            error: response.error,
            duration: response.duration_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

impl HistoryQuery {
    /// Clamps the requested limit to `[0, MAX_HISTORY_LIMIT]` (spec §6:
    /// "default 10, max 100").
    pub fn clamped_limit(&self) -> usize {
        self.limit.min(MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryDto {
    pub command: String,
    pub args: Vec<String>,
    pub timestamp: i64,
    pub duration: u64,
    pub exit_code: i32,
    pub workdir: Option<String>,
}

impl From<HistoryEntry> for HistoryEntryDto {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            command: entry.command,
            args: entry.args,
            timestamp: entry.started_at_unix_ms,
            duration: entry.duration_ms,
            exit_code: entry.exit_code,
            workdir: entry.workdir,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponseDto {
    pub history: Vec<HistoryEntryDto>,
}
