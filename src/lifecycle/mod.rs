//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → GC and reload tasks exit
//!
//! Cache GC (gc.rs):
//!     interval tick → Router::clear_expired_cache
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the stop signal out to every task
//! - Background tasks never hold the router past shutdown

pub mod gc;
pub mod shutdown;
pub mod signals;

pub use gc::spawn_gc;
pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_listener};
