//! Connection session: multiplexes many concurrent logical requests over
//! one duplex byte channel with one agent.
//!
//! `Session` itself never touches a socket. Whoever owns the underlying
//! stream (`beacon-hub`'s per-agent accept loop, `beacon-agent`'s connector)
//! spawns one reader task that decodes frames with
//! [`beacon_protocol::envelope::read_envelope`] and feeds them to
//! [`Session::dispatch_inbound`], and one writer task that drains
//! `writer_tx` and encodes frames with
//! [`beacon_protocol::envelope::write_envelope`]. This mirrors the
//! three-task split (reader / processor / writer) the teacher's MCP server
//! uses over stdio, generalized from a single stdin/stdout pair to an
//! arbitrary duplex stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use beacon_protocol::Action;
use beacon_protocol::RpcEnvelope;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::warn;

use crate::error::BeaconError;
use crate::error::Result;
use crate::error::TimeoutKind;

type Waiter = oneshot::Sender<Result<RpcEnvelope>>;

pub struct Session {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Waiter>>,
    writer_tx: mpsc::Sender<RpcEnvelope>,
    connected: AtomicBool,
}

impl Session {
    pub fn new(writer_tx: mpsc::Sender<RpcEnvelope>) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            writer_tx,
            connected: AtomicBool::new(true),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Reserves a fresh request id, registers a waiter, writes the request
    /// envelope, and blocks until (a) a response with the matching id
    /// arrives, (b) `deadline` elapses, or (c) the session is closed.
    /// Concurrent calls from multiple tasks are expected and safe.
    pub async fn send_and_wait(
        &self,
        action: Action,
        payload: Vec<u8>,
        deadline: Duration,
    ) -> Result<RpcEnvelope> {
        if !self.is_connected() {
            return Err(BeaconError::Transport("session is disconnected".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let envelope = RpcEnvelope::request(id, action, payload);
        if self.writer_tx.send(envelope).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(BeaconError::Transport("session writer task is gone".into()));
        }

        match timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_recv_dropped)) => {
                // The sender was dropped without sending, which only
                // happens if `close()` raced us between insert and send —
                // treat it the same as an explicit disconnect.
                Err(BeaconError::Transport("session closed".into()))
            }
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(BeaconError::timeout(TimeoutKind::HubRpc))
            }
        }
    }

    /// Writes a response envelope. Never blocks on a waiter — the writer
    /// task owns the actual I/O and this call only enqueues.
    pub async fn send_response(
        &self,
        id: u64,
        action: Action,
        payload: Vec<u8>,
        error: Option<String>,
    ) {
        let envelope = RpcEnvelope::response(id, action, payload, error);
        if self.writer_tx.send(envelope).await.is_err() {
            warn!(id, "failed to enqueue response: writer task is gone");
        }
    }

    /// Called by the reader loop for every decoded envelope. A response is
    /// matched against the waiter table and consumed here and never handed
    /// back to the caller; an inbound request is returned so the caller
    /// (the handler registry, on the agent side) can act on it. A response
    /// with an unknown id is dropped with a log, per spec invariant.
    pub async fn dispatch_inbound(&self, envelope: RpcEnvelope) -> Option<RpcEnvelope> {
        if envelope.is_response() {
            let waiter = self.pending.lock().await.remove(&envelope.id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(Ok(envelope));
                }
                None => {
                    warn!(id = envelope.id, "dropping response with unknown id");
                }
            }
            None
        } else {
            Some(envelope)
        }
    }

    /// Idempotent. Marks the session disconnected and completes every
    /// pending waiter with a `Transport` error, so callers blocked in
    /// `send_and_wait` observe disconnect rather than hanging forever.
    pub async fn close(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut pending = self.pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(BeaconError::Transport("disconnected".into())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_wait_resolves_on_matching_response() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = Session::new(tx);

        let session2 = session.clone();
        let handle = tokio::spawn(async move {
            session2
                .send_and_wait(Action::ExecuteCommand, b"ping".to_vec(), Duration::from_secs(1))
                .await
        });

        let request = rx.recv().await.unwrap();
        assert_eq!(request.action, Action::ExecuteCommand.request_tag());
        let response = RpcEnvelope::response(request.id, Action::ExecuteCommand, b"pong".to_vec(), None);
        session.dispatch_inbound(response).await;

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.payload, b"pong");
    }

    #[tokio::test]
    async fn send_and_wait_times_out_without_a_response() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(tx);

        let result = session
            .send_and_wait(Action::ExecuteCommand, vec![], Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(BeaconError::Timeout { .. })));
    }

    #[tokio::test]
    async fn close_fails_all_pending_waiters_with_disconnected() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = Session::new(tx);

        let session2 = session.clone();
        let handle = tokio::spawn(async move {
            session2
                .send_and_wait(Action::ExecuteCommand, vec![], Duration::from_secs(5))
                .await
        });
        // Make sure the request was actually sent (waiter registered) before closing.
        rx.recv().await.unwrap();

        session.close().await;
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(BeaconError::Transport(_))));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn response_with_unknown_id_is_dropped_without_panicking() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(tx);
        let stray = RpcEnvelope::response(999, Action::ExecuteCommand, vec![], None);
        assert!(session.dispatch_inbound(stray).await.is_none());
    }

    #[tokio::test]
    async fn inbound_request_is_returned_to_the_caller() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(tx);
        let request = RpcEnvelope::request(1, Action::TelemetryReport, vec![1, 2, 3]);
        let returned = session.dispatch_inbound(request).await;
        assert!(returned.is_some());
    }
}
