//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the filter from `RUST_LOG`, then config, then a crate default
//!
//! # Design Decisions
//! - Uses the tracing crate for structured log events
//! - A second `init` call is ignored so tests and binaries can both call it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "route_engine=info,tower_http=info";

/// Resolve the filter directive: environment first, then `level`, then the default.
pub fn filter_directive(level: Option<&str>) -> String {
    match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => env,
        _ => match level {
            Some(level) if !level.trim().is_empty() => format!("route_engine={level},tower_http={level}"),
            _ => DEFAULT_FILTER.to_string(),
        },
    }
}

/// Install the global subscriber.
pub fn init(level: Option<&str>) {
    let filter = EnvFilter::try_new(filter_directive(level)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
