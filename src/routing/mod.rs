//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (tree build / reload):
//!     Route::root().children([...])
//!     → tree.rs (flatten into arena, ids + full paths, lookups)
//!     → ranker.rs (score vectors, total order)
//!     → Freeze as immutable RouteTree
//!
//! Hook results:
//!     loader / before_load → Result<_, RouteError>
//!     → control.rs (redirect / not-found values steer navigation)
//! ```
//!
//! # Design Decisions
//! - Trees are compiled once and immutable at runtime
//! - Deterministic: same route set always ranks the same way
//! - Redirects and not-founds are values, never panics

pub mod control;
pub mod ranker;
pub mod route;
pub mod tree;

pub use control::{
    not_found, redirect, NotFound, NotFoundOrigin, Redirect, RouteError, RouteId, ROOT_ROUTE_ID,
};
pub use route::{
    AssetCtx, BeforeLoadCtx, Context, LazyOptions, LoaderCtx, Route, RouteContextCtx,
    RouteDefinition, RouteOptions, ShouldReload,
};
pub use tree::{RouteTree, RouteTreeError};
