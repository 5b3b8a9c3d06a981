//! Utility functions for audit-tools
//!
//! Provides helper functions for generating correlation ids and timestamps.

use chrono::Utc;
use uuid::Uuid;

/// Generate a unique trace ID for correlating one request's records
///
/// Uses UUID v4 for uniqueness across processes and hosts.
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate an interlink ID for a process invocation
///
/// Used when the caller has no correlator of its own to pass to
/// `extract_process_data`.
pub fn generate_interlink_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Get current timestamp in RFC3339 format
///
/// Returns ISO 8601 formatted timestamp with timezone (e.g., "2024-01-15T10:30:00+00:00")
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}
