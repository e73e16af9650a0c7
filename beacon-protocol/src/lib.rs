//! Wire format shared by `beacon-hub` and `beacon-agent`.
//!
//! The connection between one hub and one agent carries a single stream of
//! length-prefixed, self-describing binary envelopes (see [`envelope`]).
//! Everything that travels inside an envelope's payload — command requests,
//! command responses, history queries — is defined in [`command`].

pub mod command;
pub mod envelope;
pub mod handshake;

pub use command::CommandRequest;
pub use command::CommandResponse;
pub use command::ExecuteCommandRequest;
pub use command::HistoryEntry;
pub use command::HistoryRequest;
pub use command::HistoryResponse;
pub use envelope::Action;
pub use envelope::CodecError;
pub use envelope::RpcEnvelope;
pub use envelope::decode_payload;
pub use envelope::encode_payload;
pub use handshake::HandshakeRequest;
pub use handshake::HandshakeResponse;
