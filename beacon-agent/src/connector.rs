//! Dials the hub, performs the handshake, and runs the per-connection
//! reader/writer task pair described in spec §4.2/§5: one reader task
//! decoding frames and dispatching them (to the session's waiter table for
//! responses, to [`crate::handlers`] for inbound requests), one writer task
//! draining `Session`'s internal channel and encoding frames. Reconnects
//! with a capped exponential backoff on any transport failure — the
//! "sleeping in the reader for reconnect backoff" suspension point named in
//! spec §5.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::Session;
use beacon_protocol::Action;
use beacon_protocol::HandshakeRequest;
use beacon_protocol::HandshakeResponse;
use beacon_protocol::RpcEnvelope;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;
use beacon_protocol::envelope::read_envelope;
use beacon_protocol::envelope::write_envelope;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;

use crate::config::AgentConfig;
use crate::handlers::HandlerRegistry;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Runs forever: connect, serve, and on any disconnect reconnect after a
/// backoff that resets once a connection is successfully established.
pub async fn run(config: Arc<AgentConfig>, registry: Arc<HandlerRegistry>) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match connect_and_serve(&config, &registry).await {
            Ok(()) => backoff = INITIAL_BACKOFF,
            Err(err) => warn!(error = %err, "hub connection ended, will reconnect"),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn connect_and_serve(
    config: &AgentConfig,
    registry: &Arc<HandlerRegistry>,
) -> anyhow::Result<()> {
    let addr = hub_addr(&config.hub_url)?;
    info!(addr = %addr, "connecting to hub");
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, write_half) = stream.into_split();

    let (writer_tx, writer_rx) = mpsc::channel::<RpcEnvelope>(128);
    let session = Session::new(writer_tx);

    let mut writer_handle = tokio::spawn(writer_task(write_half, writer_rx));
    let mut reader_handle = tokio::spawn(reader_loop(read_half, session.clone(), registry.clone()));

    let handshake_payload = encode_payload(&HandshakeRequest {
        agent_id: config.agent_id.clone(),
        key: config.key.clone(),
        token: config.token.clone(),
    })?;
    let response = session
        .send_and_wait(Action::Handshake, handshake_payload, HANDSHAKE_TIMEOUT)
        .await?;
    let handshake_response: HandshakeResponse = decode_payload(&response.payload)?;
    if !handshake_response.accepted {
        anyhow::bail!("hub rejected handshake: {}", handshake_response.message);
    }
    info!(agent_id = %config.agent_id, "handshake accepted");

    tokio::select! {
        _ = &mut reader_handle => {},
        _ = &mut writer_handle => {},
    }
    session.close().await;
    reader_handle.abort();
    writer_handle.abort();
    Ok(())
}

async fn writer_task(mut write_half: OwnedWriteHalf, mut rx: mpsc::Receiver<RpcEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        if let Err(err) = write_envelope(&mut write_half, &envelope).await {
            warn!(error = %err, "failed to write envelope, closing writer task");
            break;
        }
    }
}

async fn reader_loop(
    mut read_half: OwnedReadHalf,
    session: Arc<Session>,
    registry: Arc<HandlerRegistry>,
) {
    loop {
        match read_envelope(&mut read_half).await {
            Ok(envelope) => {
                if let Some(request) = session.dispatch_inbound(envelope).await {
                    let session = session.clone();
                    let registry = registry.clone();
                    tokio::spawn(async move { handle_inbound(session, registry, request).await });
                }
            }
            Err(err) => {
                warn!(error = %err, "hub connection read failed");
                break;
            }
        }
    }
}

/// Enforces the handler's own deadline (spec §4.3) and converts a panicked
/// or overrunning handler into an error envelope instead of letting it
/// affect any other in-flight request on the same session.
async fn handle_inbound(session: Arc<Session>, registry: Arc<HandlerRegistry>, envelope: RpcEnvelope) {
    let id = envelope.id;
    let Some(action) = Action::from_tag(envelope.action) else {
        session
            .send_response(id, Action::Handshake, Vec::new(), Some("unknown action tag".into()))
            .await;
        return;
    };

    let Some(handler) = registry.get(action) else {
        session
            .send_response(id, action, Vec::new(), Some(format!("no handler registered for {action:?}")))
            .await;
        return;
    };

    let deadline = handler_deadline(action);
    let payload = envelope.payload;
    let task = tokio::spawn(async move { tokio::time::timeout(deadline, handler.handle(payload)).await });

    let (response_payload, error) = match task.await {
        Ok(Ok(Ok(payload))) => (payload, None),
        Ok(Ok(Err(reason))) => (Vec::new(), Some(reason)),
        Ok(Err(_elapsed)) => (Vec::new(), Some("agent handler deadline elapsed".to_string())),
        Err(_join_error) => (Vec::new(), Some("handler panicked".to_string())),
    };
    session.send_response(id, action, response_payload, error).await;
}

fn handler_deadline(action: Action) -> Duration {
    match action {
        // Generous enough to outlast the longest possible clamped
        // `timeout_seconds` (300s, spec §3) plus drain time.
        Action::ExecuteCommand => Duration::from_secs(305),
        Action::GetCommandHistory | Action::TelemetryReport | Action::Handshake => {
            Duration::from_secs(10)
        }
    }
}

/// Strips an optional `scheme://` prefix and any trailing path from
/// `HUB_URL`, leaving a bare `host:port` suitable for `TcpStream::connect`.
fn hub_addr(hub_url: &str) -> anyhow::Result<String> {
    let without_scheme = hub_url.split("://").next_back().unwrap_or(hub_url);
    let host_port = without_scheme.split('/').next().unwrap_or(without_scheme);
    if host_port.is_empty() {
        anyhow::bail!("HUB_URL did not contain a host:port");
    }
    Ok(host_port.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_trailing_path() {
        assert_eq!(hub_addr("http://hub.example:7862/ignored").unwrap(), "hub.example:7862");
        assert_eq!(hub_addr("hub.example:7862").unwrap(), "hub.example:7862");
    }

    #[test]
    fn rejects_an_empty_host() {
        assert!(hub_addr("http://").is_err());
    }
}
