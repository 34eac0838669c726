//! Navigation controller.
//!
//! # Data Flow
//! ```text
//! navigate(dest)
//!     → build.rs (resolve path, params, search chain, masks → Location)
//!     → commit.rs (push / replace history entry)
//!     → router.rs load()
//!         → matching (pending matches)
//!         → loading (before_load, loaders, ready → commit)
//!         → events.rs (before_navigate, before_load, load, resolved)
//! ```
//!
//! # Design Decisions
//! - Relative destinations resolve against a route template, never a raw URL
//! - Redirects re-enter `navigate` with `replace`; a chain revisiting an
//!   href is treated as a loop and stops
//! - `navigate` and `preload_route` return boxed futures since redirects
//!   recurse through them

pub mod build;
pub mod commit;
pub mod events;
pub mod options;
pub mod router;

pub use events::{LocationChange, RouterEvent};
pub use options::{
    HashUpdate, NavigateOptions, NotFoundMode, ParamsUpdate, RouteMask, RouterOptions, StateUpdate,
    DEFAULT_GC_TIME, DEFAULT_PENDING_MIN_MS, DEFAULT_PENDING_MS, DEFAULT_PRELOAD_STALE_TIME,
};
pub use router::{InvalidateOptions, LoadOptions, MatchFilter, MatchRouteOptions, Router};

use thiserror::Error;

use crate::routing::{RouteError, RouteTreeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("`from` path {0} does not name a route")]
    UnknownFrom(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    RouteTree(#[from] RouteTreeError),
}
