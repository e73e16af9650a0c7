//! Accepts agent connections on [`crate::config::HubConfig::listen_addr`],
//! reads the handshake (spec §3 "Lifecycle": "A Session is created on
//! successful handshake"), and attaches the resulting [`Session`] into the
//! [`AgentRegistry`] for the hub dispatcher to find.

use std::sync::Arc;

use beacon_core::AgentRegistry;
use beacon_core::Session;
use beacon_protocol::Action;
use beacon_protocol::HandshakeRequest;
use beacon_protocol::HandshakeResponse;
use beacon_protocol::RpcEnvelope;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;
use beacon_protocol::envelope::read_envelope;
use beacon_protocol::envelope::write_envelope;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;

pub async fn accept_loop(listener: TcpListener, registry: Arc<AgentRegistry>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let registry = registry.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, registry).await {
                        warn!(peer = %peer_addr, error = %err, "agent connection ended");
                    }
                });
            }
            Err(err) => warn!(error = %err, "failed to accept agent connection"),
        }
    }
}

async fn handle_connection(stream: TcpStream, registry: Arc<AgentRegistry>) -> anyhow::Result<()> {
    let (mut read_half, write_half) = stream.into_split();

    let handshake_envelope = read_envelope(&mut read_half).await?;
    if handshake_envelope.is_response() || Action::from_tag(handshake_envelope.action) != Some(Action::Handshake) {
        anyhow::bail!("first envelope on a new connection must be a Handshake request");
    }
    let handshake: HandshakeRequest = decode_payload(&handshake_envelope.payload)?;
    let agent_id = handshake.agent_id.clone();

    // Authenticating the `key`/`token` pair against a credential store is an
    // external collaborator (spec §1); this accepts any handshake carrying a
    // non-empty agent id, which is the seam a real credential check replaces.
    let accepted = !agent_id.is_empty();

    let (writer_tx, writer_rx) = mpsc::channel::<RpcEnvelope>(128);
    let mut writer_handle = tokio::spawn(writer_task(write_half, writer_rx));
    let session = Session::new(writer_tx);

    let handshake_ack = encode_payload(&HandshakeResponse {
        accepted,
        message: if accepted {
            "ok".to_string()
        } else {
            "missing agent_id".to_string()
        },
    })?;
    session
        .send_response(handshake_envelope.id, Action::Handshake, handshake_ack, None)
        .await;

    if !accepted {
        session.close().await;
        writer_handle.abort();
        anyhow::bail!("rejected handshake with an empty agent_id");
    }

    registry.attach(agent_id.clone(), session.clone()).await;
    info!(agent_id = %agent_id, "agent online");

    let mut reader_handle = tokio::spawn(reader_loop(read_half, session.clone()));
    tokio::select! {
        _ = &mut reader_handle => {},
        _ = &mut writer_handle => {},
    }

    session.close().await;
    registry.detach(&agent_id).await;
    info!(agent_id = %agent_id, "agent offline");
    reader_handle.abort();
    writer_handle.abort();
    Ok(())
}

async fn writer_task(mut write_half: OwnedWriteHalf, mut rx: mpsc::Receiver<RpcEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        if let Err(err) = write_envelope(&mut write_half, &envelope).await {
            warn!(error = %err, "failed to write envelope to agent, closing writer task");
            break;
        }
    }
}

/// The hub only ever initiates RPCs, so every inbound envelope after the
/// handshake is expected to be a response. An inbound request here (e.g. a
/// future telemetry push, see SPEC_FULL §4.8) is logged and dropped — no
/// hub-side waiter exists for it, and none is modeled by this core.
async fn reader_loop(mut read_half: OwnedReadHalf, session: Arc<Session>) {
    loop {
        match read_envelope(&mut read_half).await {
            Ok(envelope) => {
                if let Some(unexpected) = session.dispatch_inbound(envelope).await {
                    warn!(id = unexpected.id, action = unexpected.action, "dropping unexpected inbound request from agent");
                }
            }
            Err(err) => {
                warn!(error = %err, "agent connection read failed");
                break;
            }
        }
    }
}
