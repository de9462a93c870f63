//! Prometheus metrics collection for nirmaan-stack.
//!
//! Exposed on a dedicated HTTP port (see [`crate::http`]).
//!
//! ## Request Metrics
//!
//! - `nirmaan_requests_total{method}` - API calls by method
//! - `nirmaan_request_errors_total{method,code}` - Failed calls by error code
//! - `nirmaan_request_duration_seconds{method}` - Latency histogram
//!
//! ## Chat Metrics
//!
//! - `nirmaan_messages_sent_total` - Project messages stored
//! - `nirmaan_page_raw_rows` - Raw joined rows read per history page
//! - `nirmaan_realtime_events_total{event}` - Realtime events published
//! - `nirmaan_realtime_subscribers` - Open SSE streams

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// API calls by method name.
pub static REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Failed API calls by method name and error code.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Project messages stored.
pub static MESSAGES_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Realtime events published, by event name.
pub static REALTIME_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently open SSE streams.
pub static REALTIME_SUBSCRIBERS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Request latency by method name.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Raw joined rows read per history page (fan-out from attachments).
pub static PAGE_RAW_ROWS: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(REQUESTS, IntCounterVec::new(Opts::new("nirmaan_requests_total", "API calls by method"), &["method"]));
    register!(REQUEST_ERRORS, IntCounterVec::new(Opts::new("nirmaan_request_errors_total", "Failed API calls by method and error code"), &["method", "code"]));
    register!(MESSAGES_SENT, IntCounter::new("nirmaan_messages_sent_total", "Project messages stored"));
    register!(REALTIME_EVENTS, IntCounterVec::new(Opts::new("nirmaan_realtime_events_total", "Realtime events published"), &["event"]));
    register!(REALTIME_SUBSCRIBERS, IntGauge::new("nirmaan_realtime_subscribers", "Open realtime streams"));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("nirmaan_request_duration_seconds", "API call latency by method")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method"]));
    register!(PAGE_RAW_ROWS, Histogram::with_opts(
        HistogramOpts::new("nirmaan_page_raw_rows", "Raw joined rows read per history page")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 51.0, 101.0, 251.0, 501.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Record a completed API call with latency.
#[inline]
pub fn record_request(method: &str, duration_secs: f64) {
    if let Some(c) = REQUESTS.get() {
        c.with_label_values(&[method]).inc();
    }
    if let Some(h) = REQUEST_LATENCY.get() {
        h.with_label_values(&[method]).observe(duration_secs);
    }
}

/// Record a failed API call.
#[inline]
pub fn record_request_error(method: &str, code: &str) {
    if let Some(c) = REQUEST_ERRORS.get() {
        c.with_label_values(&[method, code]).inc();
    }
}

#[inline]
pub fn record_message_sent() {
    if let Some(c) = MESSAGES_SENT.get() {
        c.inc();
    }
}

/// Record how many raw rows one history page read.
#[inline]
pub fn record_page_rows(rows: usize) {
    if let Some(h) = PAGE_RAW_ROWS.get() {
        h.observe(rows as f64);
    }
}

#[inline]
pub fn record_realtime_event(event: &str) {
    if let Some(c) = REALTIME_EVENTS.get() {
        c.with_label_values(&[event]).inc();
    }
}

/// Track open realtime streams (`+1` on open, `-1` on close).
#[inline]
pub fn add_realtime_subscribers(delta: i64) {
    if let Some(g) = REALTIME_SUBSCRIBERS.get() {
        g.add(delta);
    }
}
