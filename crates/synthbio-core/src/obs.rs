//! Structured lifecycle events for query handling.
//!
//! Each request runs inside a [`query_span`] carrying its request id; the
//! `emit_*` functions log one event per lifecycle step with a stable
//! `event` field so log pipelines can filter on it.

use tracing::{info, warn};

/// Span tagged with the request id.
pub fn query_span(request_id: &str) -> tracing::Span {
    tracing::info_span!("synthbio.query", request_id = %request_id)
}

pub fn emit_query_started(request_id: &str, method: &str, question_len: usize) {
    info!(
        event = "query.started",
        request_id = %request_id,
        method = %method,
        question_len = question_len,
    );
}

pub fn emit_query_finished(request_id: &str, duration_ms: u64, citations: usize) {
    info!(
        event = "query.finished",
        request_id = %request_id,
        duration_ms = duration_ms,
        citations = citations,
    );
}

/// Failure events are warnings: the service keeps running.
pub fn emit_query_failed(request_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "query.failed", request_id = %request_id, kind = %kind, error = %error);
}

pub fn emit_engine_invoked(request_id: &str, program: &str, timeout_secs: u64) {
    info!(
        event = "engine.invoked",
        request_id = %request_id,
        program = %program,
        timeout_secs = timeout_secs,
    );
}
