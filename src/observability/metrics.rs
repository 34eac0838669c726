//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define engine metrics (navigations, loader runs, cache behaviour)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `route_engine_navigations_total` (counter): load cycles by outcome
//! - `route_engine_loader_invocations_total` (counter): loader calls by route
//! - `route_engine_loader_cache_hits_total` (counter): fresh matches served from cache
//! - `route_engine_redirects_total` (counter): redirects followed or reported
//! - `route_engine_cached_matches` (gauge): size of the match cache
//! - `route_engine_cache_evictions_total` (counter): matches dropped by GC
//! - `route_engine_render_duration_seconds` (histogram): server renders by status
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so the library can
//!   record unconditionally and only the binary decides about exposition
//! - Labels are route ids and outcome labels, both low cardinality

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

pub const NAVIGATIONS_TOTAL: &str = "route_engine_navigations_total";
pub const LOADER_INVOCATIONS_TOTAL: &str = "route_engine_loader_invocations_total";
pub const LOADER_CACHE_HITS_TOTAL: &str = "route_engine_loader_cache_hits_total";
pub const REDIRECTS_TOTAL: &str = "route_engine_redirects_total";
pub const CACHED_MATCHES: &str = "route_engine_cached_matches";
pub const CACHE_EVICTIONS_TOTAL: &str = "route_engine_cache_evictions_total";
pub const RENDER_DURATION_SECONDS: &str = "route_engine_render_duration_seconds";

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "failed to install metrics exporter"),
    }
}

pub fn record_navigation(outcome: &'static str) {
    metrics::counter!(NAVIGATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_loader_invocation(route_id: &str) {
    metrics::counter!(LOADER_INVOCATIONS_TOTAL, "route" => route_id.to_string()).increment(1);
}

pub fn record_cache_hit(route_id: &str) {
    metrics::counter!(LOADER_CACHE_HITS_TOTAL, "route" => route_id.to_string()).increment(1);
}

pub fn record_redirect(status: u16) {
    metrics::counter!(REDIRECTS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!(CACHED_MATCHES).set(size as f64);
}

pub fn record_evictions(count: usize) {
    if count > 0 {
        metrics::counter!(CACHE_EVICTIONS_TOTAL).increment(count as u64);
    }
}

pub fn record_render(status: u16, start: Instant) {
    metrics::histogram!(RENDER_DURATION_SECONDS, "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
