//! Length-prefixed binary framing for [`RpcEnvelope`].
//!
//! Every envelope on the wire is a `u32` big-endian byte length followed by
//! that many bytes of a `bincode`-encoded [`RpcEnvelope`]. Binary framing
//! keeps small fields compact and lets `payload` carry raw command output
//! without an escaping layer, unlike a JSON-per-line scheme.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

/// Frames larger than this are rejected without being fully buffered, so a
/// misbehaving or hostile peer cannot force unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 8 * 1024 * 1024;

/// High bit of [`RpcEnvelope::action`]. Set on a response so the reader can
/// tell, from the tag alone, whether an inbound envelope is a request this
/// side must handle or a response correlated to a request it sent earlier.
/// This resolves the "reused ExecuteCommand tag" ambiguity noted against the
/// original source: requests and their responses always carry distinct tags.
const RESPONSE_BIT: u16 = 0x8000;

/// Action tags understood by the agent's handler registry (see
/// `beacon-agent::handlers`). `Handshake` is sent once, by the agent, as the
/// first envelope on a freshly dialed connection; the hub's accept loop reads
/// it out-of-band before the connection enters the general session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Action {
    Handshake = 0,
    ExecuteCommand = 1,
    GetCommandHistory = 2,
    TelemetryReport = 3,
}

impl Action {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag & !RESPONSE_BIT {
            0 => Some(Action::Handshake),
            1 => Some(Action::ExecuteCommand),
            2 => Some(Action::GetCommandHistory),
            3 => Some(Action::TelemetryReport),
            _ => None,
        }
    }

    pub fn request_tag(self) -> u16 {
        self as u16
    }

    pub fn response_tag(self) -> u16 {
        self as u16 | RESPONSE_BIT
    }
}

/// Returns whether `tag` marks an envelope as a response (vs. an inbound
/// request awaiting a handler).
pub fn is_response_tag(tag: u16) -> bool {
    tag & RESPONSE_BIT != 0
}

/// `{ id, action, payload, error? }` from spec: the one envelope shape that
/// carries every request and response on the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEnvelope {
    pub id: u64,
    pub action: u16,
    pub payload: Vec<u8>,
    pub error: Option<String>,
}

impl RpcEnvelope {
    pub fn request(id: u64, action: Action, payload: Vec<u8>) -> Self {
        Self {
            id,
            action: action.request_tag(),
            payload,
            error: None,
        }
    }

    pub fn response(id: u64, action: Action, payload: Vec<u8>, error: Option<String>) -> Self {
        Self {
            id,
            action: action.response_tag(),
            payload,
            error,
        }
    }

    pub fn is_response(&self) -> bool {
        is_response_tag(self.action)
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame of {0} bytes exceeds the {max} byte ceiling", max = MAX_FRAME_BYTES)]
    FrameTooLarge(u32),
    #[error("peer closed the connection")]
    Eof,
    #[error("failed to decode envelope: {0}")]
    Decode(#[from] Box<bincode::ErrorKind>),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encodes a payload value (e.g. [`crate::command::ExecuteCommandRequest`])
/// for use as `RpcEnvelope.payload`. Payloads are encoded independently of
/// the envelope itself so a handler can decode only the variant it expects.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(value)?)
}

/// Decodes a payload previously produced by [`encode_payload`].
pub fn decode_payload<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Writes one framed envelope. Callers are expected to serialize all writes
/// to a connection through a single task (see `beacon-core::session`), since
/// interleaving two concurrent writers would corrupt the frame boundaries.
pub async fn write_envelope<W: AsyncWrite + Unpin>(
    writer: &mut W,
    envelope: &RpcEnvelope,
) -> Result<(), CodecError> {
    let body = bincode::serialize(envelope)?;
    let len: u32 = body
        .len()
        .try_into()
        .map_err(|_| CodecError::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed envelope, rejecting oversize frames before allocating a
/// buffer for the body.
pub async fn read_envelope<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<RpcEnvelope, CodecError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(CodecError::Eof),
        Err(e) => return Err(CodecError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    let envelope = bincode::deserialize(&body)?;
    Ok(envelope)
}
