//! Match records and match building.
//!
//! # Data Flow
//! ```text
//! Location
//!     → builder.rs (branch selection, search validation, loader deps, ids)
//!     → Vec<Match> root → leaf
//!     → loading (hooks fill status, data, context)
//! ```
//!
//! # Design Decisions
//! - A match id is the interpolated route id plus the serialized loader
//!   deps, so different deps never share cached data
//! - Existing matches are reused by id; their data survives re-matching
//! - Validation failures are stored on the match unless the caller asks
//!   for them to be raised

pub mod builder;
pub mod sharing;
pub mod types;

pub use builder::{MatchBuilder, MatchRoutesOptions, MatchedRoutes};
pub use sharing::{replace_equal_deep, replace_equal_map, replace_if_changed};
pub use types::{FetchPhase, HeadContent, Match, MatchCause, MatchId, MatchStatus, Signal};
pub(crate) use types::signal;
