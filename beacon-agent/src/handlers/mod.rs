//! Action tag → handler dispatch (spec §4.3), generalizing the teacher's
//! `match client_request { ... }` in `message_processor.rs` into a table
//! populated once at startup, so a new action tag never requires touching a
//! central dispatch function.

pub mod execute;
pub mod history;
pub mod telemetry;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_protocol::Action;

/// One response envelope per inbound request, produced from its payload.
/// `Ok` carries the success payload; `Err` becomes the envelope's `error`
/// field with an empty payload (spec §4.3: "panics/exceptions are caught
/// and converted to an error envelope").
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, payload: Vec<u8>) -> Result<Vec<u8>, String>;
}

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<Action, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn get(&self, action: Action) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&action).cloned()
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<Action, Arc<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    pub fn register(mut self, action: Action, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(action, handler);
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
