//! Agent configuration, read once at startup from the environment (spec
//! §6 "Agent configuration"). Construction is the only place these
//! variables are read; everything downstream treats `AgentConfig` as
//! immutable, same discipline as `CommandExecutor` (spec §9).

use beacon_core::executor::ExecutorConfig;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

pub struct AgentConfig {
    /// Identifies this agent to the hub at handshake time. Derived from the
    /// host's reported hostname unless `AGENT_ID` is set explicitly.
    pub agent_id: String,
    pub hub_url: String,
    pub key: String,
    pub token: String,
    pub executor: ExecutorConfig,
    /// Reserved for ancillary transports (spec §6); not read by the core.
    #[allow(dead_code)]
    pub listen_port: Option<u16>,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let agent_id = std::env::var("AGENT_ID").unwrap_or_else(|_| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown-agent".to_string())
        });

        Self {
            agent_id,
            hub_url: env_or("HUB_URL", "http://127.0.0.1:7862"),
            key: env_or("KEY", ""),
            token: env_or("TOKEN", ""),
            executor: ExecutorConfig::from_env(),
            listen_port: std::env::var("LISTEN_PORT").ok().and_then(|v| v.parse().ok()),
        }
    }
}
