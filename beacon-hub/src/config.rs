//! Hub configuration, read once at startup from the environment
//! (SPEC_FULL §6 — ambient, not named by the distilled spec, but required
//! for the binary to start).

use std::time::Duration;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

pub struct HubConfig {
    /// Address the agent-connection TCP listener binds.
    pub listen_addr: String,
    /// Address the HTTP API listener binds.
    pub http_addr: String,
    /// Hub-side RPC deadline (spec §4.5), separate from and stricter than
    /// the command's own `timeout_seconds`, which governs the child
    /// process on the agent side.
    pub rpc_timeout: Duration,
}

impl HubConfig {
    pub fn from_env() -> Self {
        let rpc_timeout_seconds: u64 = std::env::var("HUB_RPC_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        Self {
            listen_addr: env_or("HUB_LISTEN_ADDR", "0.0.0.0:7862"),
            http_addr: env_or("HUB_HTTP_ADDR", "0.0.0.0:8090"),
            rpc_timeout: Duration::from_secs(rpc_timeout_seconds),
        }
    }
}
