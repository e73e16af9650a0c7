//! Stub handler for [`beacon_protocol::Action::TelemetryReport`].
//!
//! Telemetry collection itself is out of scope (spec §1); this exists only
//! so the wire codec and handler registry are demonstrably extensible to
//! the sensors the spec excludes, per SPEC_FULL §4.8. It decodes nothing
//! beyond the raw payload length, logs at `trace`, and acknowledges with an
//! empty success payload.

use async_trait::async_trait;
use tracing::trace;

use super::Handler;

#[derive(Default)]
pub struct TelemetryReportHandler;

#[async_trait]
impl Handler for TelemetryReportHandler {
    async fn handle(&self, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        trace!(bytes = payload.len(), "discarded telemetry report");
        Ok(Vec::new())
    }
}
