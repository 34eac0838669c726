//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, manifest compiles)
//!     → EngineConfig (validated, immutable)
//!     → manifest.rs ([[routes]] → RouteTree)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → manifest.rs rebuilds the tree
//!     → atomic swap of the route tree
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the route tree hot-reloads; router options need a restart

pub mod loader;
pub mod manifest;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use manifest::{build_route, build_tree};
pub use schema::{EngineConfig, ObservabilityConfig, RouteConfig, RouterConfig, ServerConfig};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
