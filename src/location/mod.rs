//! Location model.
//!
//! # Data Flow
//! ```text
//! History entry (public href + state)
//!     → rewrite.rs (input rewrite: basepath stripping, custom transforms)
//!     → search.rs (query string → Search map)
//!     → parsed.rs (immutable Location value, optional masked twin)
//!
//! Outgoing:
//!     Location → search.rs (stringify) → rewrite.rs (output) → public href
//! ```
//!
//! # Design Decisions
//! - Locations are plain values; parsing never fails, malformed query
//!   values fall back to strings
//! - History is a trait so servers and tests can use [`MemoryHistory`]
//! - Search values are JSON so validators and loaders share one shape

pub mod history;
pub mod parsed;
pub mod rewrite;
pub mod search;

pub use history::{History, HistoryAction, HistoryUpdate, MemoryHistory};
pub use parsed::{parse_href, HistoryLocation, HistoryState, Location};
pub use rewrite::{Rewrite, UrlRewriteFn};
pub use search::{
    default_parse_search, default_stringify_search, retain_search_params, strip_search_params,
    MiddlewareCtx, SearchMiddleware, SearchParser, SearchStringifier, SearchUpdate,
};

/// Parsed query string. Values are JSON so `?page=2` yields a number.
pub type Search = serde_json::Map<String, serde_json::Value>;
