//! Type-safe client/server route engine library.
//!
//! Path templates, route trees, match building, data loading with caching,
//! and navigation over a pluggable history.

pub mod config;
pub mod lifecycle;
pub mod loading;
pub mod location;
pub mod matching;
pub mod navigation;
pub mod observability;
pub mod path;
pub mod routing;
pub mod server;
pub mod store;

pub use config::EngineConfig;
pub use lifecycle::Shutdown;
pub use loading::LoadOutcome;
pub use location::{History, Location, MemoryHistory, Search};
pub use matching::{Match, MatchId, MatchStatus};
pub use navigation::{NavigateOptions, NavigationError, Router, RouterEvent, RouterOptions};
pub use path::{Params, PathCache};
pub use routing::{not_found, redirect, Redirect, Route, RouteError, RouteTree};
pub use store::{RouterState, RouterStatus};
