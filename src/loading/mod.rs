//! Load pipeline.
//!
//! # Data Flow
//! ```text
//! Pending matches (root → leaf)
//!     → orchestrator.rs: before_load, serial, parent first
//!         (redirect / not-found / failure stops the chain)
//!     → orchestrator.rs: loaders, concurrent, up to the first failure
//!         (fresh → cache hit, stale → background refresh, missing → await)
//!     → ready callback (commit pending → matches)
//!     → outcome.rs: LoadOutcome for the caller
//!
//! Exiting matches:
//!     → cache.rs (park, expire, invalidate)
//! ```
//!
//! # Design Decisions
//! - Hooks report control flow through `Result`, never panics
//! - One loader in flight per match id; concurrent cycles join it
//! - Cancellation is cooperative through each match's token

pub mod cache;
pub mod orchestrator;
pub mod outcome;

pub use orchestrator::{load_matches, LoadCycle};
pub use outcome::LoadOutcome;
