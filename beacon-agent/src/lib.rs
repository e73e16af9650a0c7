//! Library half of the `beacon-agent` binary: per-host daemon state
//! (configuration, hub connector, handler registry) split from `main.rs`
//! the same way the teacher's MCP server separates `lib.rs` from `main.rs`.

pub mod config;
pub mod connector;
pub mod handlers;

pub use config::AgentConfig;
