//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, load pipeline, cache GC, server handler produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → Prometheus scrape endpoint (server binary only)
//! ```
//!
//! # Design Decisions
//! - Structured fields (route ids, hrefs, outcomes) on every event
//! - Metrics are cheap and recorded unconditionally

pub mod logging;
pub mod metrics;
