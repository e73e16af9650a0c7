//! Agent registry / session manager: tracks which agents are online and
//! gates RPCs on that status. Mutations are serialized through the
//! `RwLock`'s write half; readers (the hub dispatcher, on every request)
//! proceed concurrently through the read half.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::Session;

#[derive(Clone)]
pub enum AgentStatus {
    Online(Arc<Session>),
    Offline,
}

impl AgentStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, AgentStatus::Online(_))
    }
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentStatus>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the agent's current status, or `None` if the hub has never
    /// seen this agent id.
    pub async fn get(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Transitions `agent_id` to online with `session`. The only legal prior
    /// states are "never seen" and `Offline`; attaching over an existing
    /// `Online` entry replaces the stale session (the old one, if still
    /// live, will observe its own `close()` independently).
    pub async fn attach(&self, agent_id: String, session: Arc<Session>) {
        self.agents
            .write()
            .await
            .insert(agent_id, AgentStatus::Online(session));
    }

    /// Transitions `agent_id` to offline. A no-op if the agent was never
    /// seen or already offline.
    pub async fn detach(&self, agent_id: &str) {
        if let Some(entry) = self.agents.write().await.get_mut(agent_id) {
            *entry = AgentStatus::Offline;
        }
    }
}
