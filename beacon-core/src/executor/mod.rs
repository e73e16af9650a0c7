//! Command executor: the hardest part of the core (spec §4.4). Turns a
//! validated [`CommandRequest`] into a [`CommandResponse`] while enforcing
//! a layered, fail-closed security and resource policy: blacklist/injection/
//! path/whitelist validation, a per-client sliding-window rate limit, a
//! non-blocking concurrency cap, bounded output capture, a child-process
//! timeout, and an append-only audit history.
//!
//! `CommandExecutor` is constructed once per agent process (spec §9 "Global
//! state" — no process-wide statics); all of its policy state (rate
//! limiter, concurrency semaphore, history ring) is an instance field.

pub mod history;
pub mod proc;
pub mod rate_limit;
pub mod validation;

use std::path::PathBuf;
use std::time::Duration;

use beacon_protocol::CommandRequest;
use beacon_protocol::CommandResponse;
use beacon_protocol::HistoryEntry;
use tokio::sync::Semaphore;
use tracing::info;
use tracing::warn;

use self::history::HistoryRing;
use self::rate_limit::SlidingWindowLimiter;
use self::validation::ValidationConfig;
use self::validation::Whitelist;

const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024;
const DEFAULT_MAX_CONCURRENT: usize = 5;
const DEFAULT_RATE_LIMIT_MAX: usize = 10;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fixed at executor construction; immutable afterward (spec §4.4).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub whitelist: Whitelist,
    pub allowed_paths: Vec<String>,
    pub max_output: usize,
    pub max_concurrent: usize,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            whitelist: Whitelist::AllowAll,
            allowed_paths: Vec::new(),
            max_output: DEFAULT_MAX_OUTPUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }
}

impl ExecutorConfig {
    /// Builds configuration from the agent environment variables named in
    /// spec §6: `COMMAND_WHITELIST`, `ALLOWED_PATHS`, `COMMAND_MAX_OUTPUT`,
    /// `COMMAND_RATE_LIMIT`, `COMMAND_MAX_CONCURRENT`. Both
    /// `COMMAND_WHITELIST` and `ALLOWED_PATHS` accept a JSON array or a
    /// comma-separated list; a JSON array is tried first, falling back to
    /// splitting on `,` and trimming whitespace (SPEC_FULL §4.4).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            whitelist: std::env::var("COMMAND_WHITELIST")
                .ok()
                .map(|raw| parse_whitelist(&raw))
                .unwrap_or(defaults.whitelist),
            allowed_paths: std::env::var("ALLOWED_PATHS")
                .ok()
                .map(|raw| parse_list(&raw))
                .unwrap_or(defaults.allowed_paths),
            max_output: std::env::var("COMMAND_MAX_OUTPUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_output),
            max_concurrent: std::env::var("COMMAND_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent),
            rate_limit_max: std::env::var("COMMAND_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_max),
            rate_limit_window: defaults.rate_limit_window,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    if let Ok(entries) = serde_json::from_str::<Vec<String>>(raw) {
        return entries;
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_whitelist(raw: &str) -> Whitelist {
    if raw.trim() == "allow_all" {
        return Whitelist::AllowAll;
    }
    Whitelist::Entries(parse_list(raw))
}

/// Fallback client key for direct (non-HTTP) callers that have no
/// authenticated caller identity to plumb through (SPEC_FULL §9). The HTTP
/// boundary always supplies the real bearer identity instead.
pub const DEFAULT_CLIENT_KEY: &str = "default";

pub struct CommandExecutor {
    config: ExecutorConfig,
    rate_limiter: SlidingWindowLimiter,
    concurrency: Semaphore,
    history: HistoryRing,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let rate_limiter = SlidingWindowLimiter::new(config.rate_limit_max, config.rate_limit_window);
        let concurrency = Semaphore::new(config.max_concurrent);
        Self {
            config,
            rate_limiter,
            concurrency,
            history: HistoryRing::new(DEFAULT_HISTORY_CAPACITY),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ExecutorConfig::from_env())
    }

    /// Runs the full pipeline from spec §4.4: validation, rate limiting,
    /// concurrency admission, execution, and audit history — in that order.
    /// Never invokes the OS process-creation primitive for a request that
    /// fails validation, rate limiting, or concurrency admission.
    pub async fn execute(&self, client_key: &str, request: &CommandRequest) -> CommandResponse {
        let validation_config = ValidationConfig {
            whitelist: self.config.whitelist.clone(),
            allowed_paths: self.config.allowed_paths.clone(),
        };
        if let Err(reason) = validation::validate_command(&request.command, &validation_config) {
            info!(command = %request.command, reason = %reason, "command rejected by validation");
            return CommandResponse::validation_failure(reason);
        }

        if !self.rate_limiter.try_acquire(client_key).await {
            let reason = format!("rate limit exceeded: {}", self.rate_limiter.describe());
            warn!(client_key, "command rejected by rate limiter");
            return CommandResponse::policy_limit(reason);
        }

        let Ok(permit) = self.concurrency.try_acquire() else {
            warn!("command rejected: concurrency limit reached");
            return CommandResponse::policy_limit(
                "maximum concurrent command execution limit reached",
            );
        };

        if let Err(reason) = validation::validate_env(&request.env) {
            drop(permit);
            return CommandResponse::validation_failure(reason);
        }

        let started_at_unix_ms = now_unix_ms();
        let timeout = Duration::from_secs(u64::from(request.clamped_timeout_seconds()));
        let workdir = request.workdir.as_ref().map(PathBuf::from);
        let (outcome, elapsed) = proc::run(proc::RunParams {
            command: request.command.clone(),
            args: request.args.clone(),
            workdir: workdir.clone(),
            env: request.env.clone(),
            timeout,
            max_output: self.config.max_output,
        })
        .await;
        drop(permit);

        let response = outcome.into_response(elapsed.as_millis() as u64);
        self.history
            .push(HistoryEntry {
                command: request.command.clone(),
                args: request.args.clone(),
                started_at_unix_ms,
                duration_ms: response.duration_ms,
                exit_code: response.exit_code,
                workdir: request.workdir.clone(),
            })
            .await;
        response
    }

    /// Returns the most recent `min(limit, size)` history entries, oldest
    /// first within the returned slice (spec §4.4 "GetHistory").
    pub async fn get_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.recent(limit).await
    }
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
