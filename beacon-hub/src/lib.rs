//! Library half of the `beacon-hub` binary: the control plane that
//! authenticates agent connections, tracks them in the agent registry, and
//! dispatches authenticated HTTP requests down to the right agent session.
//! Split from `main.rs` the way the teacher splits its MCP server, so the
//! HTTP layer is reachable from black-box integration tests via
//! `tower::ServiceExt::oneshot` without spawning a real process.

pub mod agent_conn;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;

pub use config::HubConfig;
pub use dispatcher::Dispatcher;
