//! Server-side rendering surface.
//!
//! # Data Flow
//! ```text
//! GET /posts/5?tab=2
//!     → handler.rs (fresh MemoryHistory + router over the shared tree)
//!     → Router::load (is_server: redirects reported, not followed)
//!     → dehydrate.rs (matches → JSON snapshot)
//!     → 3xx + Location | 404 | 500 | 200 + snapshot
//!
//! Client side:
//!     snapshot → dehydrate.rs hydrate() → first load skips restored matches
//! ```
//!
//! # Design Decisions
//! - One router per request; only the route tree is shared
//! - The manifest reload swaps the tree; in-flight requests keep the old one

pub mod dehydrate;
pub mod handler;

pub use dehydrate::{dehydrate, hydrate, DehydratedMatch, DehydratedState};
pub use handler::{build_app, serve, AppState};
