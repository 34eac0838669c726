//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::navigation::{NotFoundMode, RouteMask, RouterOptions};
use crate::path::TrailingSlash;

/// Root configuration for the route engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Router defaults (timings, matching policy, basepath).
    pub router: RouterConfig,

    /// HTTP server settings for the rendering endpoint.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route manifest, children nested under each entry.
    pub routes: Vec<RouteConfig>,
}

/// Router defaults. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    pub default_pending_ms: u64,
    pub default_pending_min_ms: u64,
    pub default_stale_time_ms: u64,
    pub default_preload_stale_time_ms: u64,
    pub default_gc_time_ms: u64,
    pub default_preload_gc_time_ms: u64,
    pub default_pending_boundary: bool,
    pub not_found_mode: NotFoundMode,
    pub case_sensitive: bool,
    pub trailing_slash: TrailingSlash,
    pub basepath: String,
    pub unmask_on_reload: bool,

    /// Entries kept by each segment parse cache.
    pub path_cache_capacity: usize,

    pub masks: Vec<MaskConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let defaults = RouterOptions::default();
        let ms = |d: Duration| d.as_millis() as u64;
        Self {
            default_pending_ms: ms(defaults.default_pending_ms),
            default_pending_min_ms: ms(defaults.default_pending_min_ms),
            default_stale_time_ms: ms(defaults.default_stale_time),
            default_preload_stale_time_ms: ms(defaults.default_preload_stale_time),
            default_gc_time_ms: ms(defaults.default_gc_time),
            default_preload_gc_time_ms: ms(defaults.default_preload_gc_time),
            default_pending_boundary: defaults.default_pending_boundary,
            not_found_mode: defaults.not_found_mode,
            case_sensitive: defaults.case_sensitive,
            trailing_slash: defaults.trailing_slash,
            basepath: defaults.basepath,
            unmask_on_reload: defaults.unmask_on_reload,
            path_cache_capacity: defaults.path_cache_capacity,
            masks: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Router options with these values; hooks and rewrites keep their defaults.
    pub fn to_options(&self) -> RouterOptions {
        RouterOptions {
            default_pending_ms: Duration::from_millis(self.default_pending_ms),
            default_pending_min_ms: Duration::from_millis(self.default_pending_min_ms),
            default_stale_time: Duration::from_millis(self.default_stale_time_ms),
            default_preload_stale_time: Duration::from_millis(self.default_preload_stale_time_ms),
            default_gc_time: Duration::from_millis(self.default_gc_time_ms),
            default_preload_gc_time: Duration::from_millis(self.default_preload_gc_time_ms),
            default_pending_boundary: self.default_pending_boundary,
            not_found_mode: self.not_found_mode,
            case_sensitive: self.case_sensitive,
            trailing_slash: self.trailing_slash,
            basepath: self.basepath.clone(),
            unmask_on_reload: self.unmask_on_reload,
            path_cache_capacity: self.path_cache_capacity,
            route_masks: self
                .masks
                .iter()
                .map(|m| RouteMask {
                    from: m.from.clone(),
                    to: m.to.clone(),
                    unmask_on_reload: m.unmask_on_reload,
                    ..RouteMask::default()
                })
                .collect(),
            ..RouterOptions::default()
        }
    }
}

/// A configured route mask.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaskConfig {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub unmask_on_reload: bool,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request deadline for a render.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One entry of the route manifest.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteConfig {
    /// Path segment(s) relative to the parent; `None` makes a pathless layout.
    pub path: Option<String>,

    /// Explicit id; required for pathless routes.
    pub id: Option<String>,

    pub stale_time_ms: Option<u64>,
    pub preload_stale_time_ms: Option<u64>,
    pub gc_time_ms: Option<u64>,

    /// Static loader data served for this route.
    pub data: Option<Value>,

    /// Redirect raised from before-load.
    pub redirect: Option<RedirectConfig>,

    /// Raise a not-found from before-load.
    pub not_found: bool,

    /// Render not-founds of descendants here.
    pub not_found_boundary: bool,

    /// Search keys that must be present.
    pub validate_search: Vec<String>,

    pub preload: Option<bool>,
    pub ssr: Option<bool>,

    pub children: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectConfig {
    pub to: String,

    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

fn default_redirect_status() -> u16 {
    307
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_router() {
        let options = RouterConfig::default().to_options();
        let defaults = RouterOptions::default();
        assert_eq!(options.default_gc_time, defaults.default_gc_time);
        assert_eq!(options.default_pending_ms, defaults.default_pending_ms);
        assert_eq!(options.basepath, "/");
    }

    #[test]
    fn test_parse_manifest() {
        let config: EngineConfig = toml::from_str(
            r#"
            [router]
            default_stale_time_ms = 1000
            not_found_mode = "root"
            trailing_slash = "always"

            [[router.masks]]
            from = "/photos/$id/modal"
            to = "/photos/$id"

            [[routes]]
            path = "posts"
            data = { title = "Posts" }

            [[routes.children]]
            path = "$postId"
            stale_time_ms = 5000

            [[routes]]
            path = "old"
            redirect = { to = "/posts" }
            "#,
        )
        .unwrap();
        assert_eq!(config.router.default_stale_time_ms, 1000);
        assert_eq!(config.router.not_found_mode, NotFoundMode::Root);
        assert_eq!(config.router.trailing_slash, TrailingSlash::Always);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].children[0].stale_time_ms, Some(5000));
        assert_eq!(config.routes[1].redirect.as_ref().unwrap().status, 307);
        assert_eq!(config.router.to_options().route_masks.len(), 1);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }
}
