//! Shared runtime for `beacon-hub` and `beacon-agent`: the connection
//! session, agent registry, and command executor that make up the core
//! described in spec §4.
//!
//! Wire-visible types (`RpcEnvelope`, `CommandRequest`, ...) live in
//! `beacon-protocol`; this crate is the concurrency and policy machinery
//! built on top of them.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the appropriate abstraction (e.g.,
// the HTTP layer or the tracing stack).
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod error;
pub mod executor;
pub mod registry;
pub mod session;

pub use error::BeaconError;
pub use error::Result;
pub use error::TimeoutKind;
pub use executor::CommandExecutor;
pub use registry::AgentRegistry;
pub use registry::AgentStatus;
pub use session::Session;
