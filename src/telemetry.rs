//! Telemetry utilities for request timing and tracing spans.

use std::time::Instant;

/// Guard for timing an API call and recording metrics.
///
/// Records latency when dropped.
pub struct RequestTimer {
    method: &'static str,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a call.
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            start: Instant::now(),
        }
    }

    /// Record a failure for this call under `code`.
    pub fn fail(&self, code: &str) {
        crate::metrics::record_request_error(self.method, code);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(self.method, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one API call.
    pub fn request(method: &str, user: &str) -> Span {
        info_span!("request", method = %method, user = %user)
    }

    /// Create a span for a realtime stream.
    pub fn stream(room: &str, user: &str) -> Span {
        info_span!("stream", room = %room, user = %user)
    }
}
