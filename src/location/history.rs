//! History collaborator.
//!
//! # Responsibilities
//! - Store location entries and the current position
//! - Assign a fresh key and monotonic index on every write
//! - Broadcast every change to subscribers
//!
//! Browser adapters live outside this crate; [`MemoryHistory`] backs server
//! rendering and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::location::parsed::{parse_href, HistoryLocation, HistoryState};

const SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Push,
    Replace,
    Go(isize),
}

#[derive(Debug, Clone)]
pub struct HistoryUpdate {
    pub location: HistoryLocation,
    pub action: HistoryAction,
}

/// The shape the router needs from a history implementation.
pub trait History: Send + Sync {
    fn location(&self) -> HistoryLocation;

    fn push(&self, href: &str, state: HistoryState);

    fn replace(&self, href: &str, state: HistoryState);

    fn go(&self, delta: isize);

    fn back(&self) {
        self.go(-1);
    }

    fn forward(&self) {
        self.go(1);
    }

    fn subscribe(&self) -> broadcast::Receiver<HistoryUpdate>;

    /// Turn a router href into one usable by the host (e.g. hash routing).
    fn create_href(&self, href: &str) -> String {
        href.to_string()
    }

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entries {
    stack: Vec<HistoryLocation>,
    index: usize,
}

/// In-memory history stack.
pub struct MemoryHistory {
    entries: Mutex<Entries>,
    tx: broadcast::Sender<HistoryUpdate>,
}

impl MemoryHistory {
    /// Start with a single entry.
    pub fn new(initial: &str) -> Self {
        Self::with_entries(&[initial], 0)
    }

    pub fn with_entries(hrefs: &[&str], index: usize) -> Self {
        let mut stack: Vec<HistoryLocation> = hrefs
            .iter()
            .enumerate()
            .map(|(i, href)| {
                parse_href(
                    href,
                    HistoryState {
                        key: new_key(),
                        index: i,
                        ..Default::default()
                    },
                )
            })
            .collect();
        if stack.is_empty() {
            stack.push(parse_href("/", HistoryState::default()));
        }
        let index = index.min(stack.len() - 1);
        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            entries: Mutex::new(Entries { stack, index }),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, location: HistoryLocation, action: HistoryAction) {
        // no receivers is fine
        let _ = self.tx.send(HistoryUpdate { location, action });
    }
}

fn new_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl History for MemoryHistory {
    fn location(&self) -> HistoryLocation {
        let entries = self.lock();
        entries.stack[entries.index].clone()
    }

    fn push(&self, href: &str, mut state: HistoryState) {
        let location = {
            let mut entries = self.lock();
            let next = entries.index + 1;
            state.key = new_key();
            state.index = next;
            entries.stack.truncate(next);
            let location = parse_href(href, state);
            entries.stack.push(location.clone());
            entries.index = next;
            location
        };
        self.notify(location, HistoryAction::Push);
    }

    fn replace(&self, href: &str, mut state: HistoryState) {
        let location = {
            let mut entries = self.lock();
            let current = entries.index;
            state.key = new_key();
            state.index = current;
            let location = parse_href(href, state);
            entries.stack[current] = location.clone();
            location
        };
        self.notify(location, HistoryAction::Replace);
    }

    fn go(&self, delta: isize) {
        let location = {
            let mut entries = self.lock();
            let max = entries.stack.len() as isize - 1;
            let target = (entries.index as isize + delta).clamp(0, max) as usize;
            if target == entries.index {
                return;
            }
            entries.index = target;
            entries.stack[target].clone()
        };
        self.notify(location, HistoryAction::Go(delta));
    }

    fn subscribe(&self) -> broadcast::Receiver<HistoryUpdate> {
        self.tx.subscribe()
    }

    fn len(&self) -> usize {
        self.lock().stack.len()
    }
}
