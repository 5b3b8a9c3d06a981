//! Audit event structure and hand-off to the sink
//!
//! An [`AuditEvent`] bundles the request snapshot with the process facts
//! and provider context. Where it ends up is the sink's business; the
//! default [`TracingSink`] emits it as a structured `tracing` event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::process::ProcessData;
use crate::request::RequestSnapshot;

/// One audited request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEvent {
    /// RFC3339 timestamp when the request was received
    pub timestamp: String,

    /// Unique trace ID for this request
    pub trace_id: String,

    /// Process that served the request
    pub process: ProcessData,

    /// Captured request
    pub request: RequestSnapshot,

    /// Output of each configured context provider, by provider name
    #[serde(default)]
    pub context: BTreeMap<String, Value>,

    /// HTTP status code of the response
    pub status: u16,

    /// Request processing duration in milliseconds
    pub duration_ms: u64,
}

/// Receiver of audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event)
    }
}

/// Emits each event as JSON on the `audit` tracing target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: &AuditEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!(
                target: "audit",
                trace_id = %event.trace_id,
                path = %event.request.path,
                status = event.status,
                event = %json,
                "request audited"
            ),
            Err(e) => warn!(trace_id = %event.trace_id, error = %e, "failed to serialize audit event"),
        }
    }
}

/// Hand an event to the sink
///
/// In debug mode the full event is also logged pretty-printed.
pub fn forward_event(event: &AuditEvent, sink: &dyn AuditSink, config: &Config) {
    if config.debug {
        match serde_json::to_string_pretty(event) {
            Ok(json) => debug!("audit event:\n{}", json),
            Err(e) => debug!(error = %e, "audit event not printable"),
        }
    }

    sink.record(event);
}
