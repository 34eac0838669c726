//! Router state store.
//!
//! # Data Flow
//! ```text
//! Store::set(|state| ...)
//!     → container.rs (copy-on-write snapshot, changed slices by identity)
//!     → derived.rs (recompute dependents in topological order)
//!     → listeners (once per update, or once per outermost batch)
//! ```
//!
//! # Design Decisions
//! - Match lists are `Arc<Vec<Match>>`; an untouched list keeps its pointer
//! - Derived dependencies are declared by hand, never discovered at runtime
//! - Readers get an `Arc` snapshot and never block the writer for long

pub mod container;
pub mod derived;
pub mod state;

pub use container::{Changes, Listener, Slices, Store, Subscription};
pub use derived::{DerivedError, DerivedGraph, DerivedNode};
pub use state::{router_derived, slice, RouterState, RouterStatus};
