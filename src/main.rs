//! Route engine render server (v1)
//!
//! Serves server-side loads of a route manifest over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                    ROUTE ENGINE                      │
//!                   │                                                      │
//!   GET /posts/5    │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ────────────────┼─▶│ server  │───▶│navigation│───▶│   matching     │   │
//!                   │  │ handler │    │  router  │    │ (path, routing)│   │
//!                   │  └─────────┘    └────┬─────┘    └────────────────┘   │
//!                   │                      │                               │
//!                   │                      ▼                               │
//!   3xx/404/500/200 │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ◀───────────────┼──│dehydrate│◀───│  store   │◀───│    loading     │   │
//!                   │  └─────────┘    └──────────┘    │ (hooks, cache) │   │
//!                   │                                 └────────────────┘   │
//!                   │  ┌────────────────────────────────────────────────┐  │
//!                   │  │             Cross-Cutting Concerns             │  │
//!                   │  │  config + watcher │ observability │ lifecycle  │  │
//!                   │  └────────────────────────────────────────────────┘  │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use route_engine::config::watcher::spawn_reloader;
use route_engine::config::{build_tree, load_config, ConfigWatcher, EngineConfig};
use route_engine::lifecycle::{spawn_signal_listener, Shutdown};
use route_engine::observability::{logging, metrics};
use route_engine::server::{build_app, serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    logging::init(Some(&config.observability.log_level));
    tracing::info!("route-engine v0.1.0 starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tree = build_tree(&config.routes)?;
    let state = AppState::new(tree, config.router.to_options());

    // Keep the watcher alive for the life of the server.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let reload_state = state.clone();
            spawn_reloader(updates, move |tree| reload_state.swap_tree(tree));
            Some(watcher.run()?)
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let app = build_app(state, Duration::from_secs(config.server.request_timeout_secs));
    serve(listener, app, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
