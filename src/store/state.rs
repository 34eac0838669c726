//! Router state snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

use crate::location::Location;
use crate::matching::{Match, MatchId, MatchStatus};
use crate::routing::Redirect;
use crate::store::derived::{DerivedGraph, DerivedNode};
use crate::store::container::{Changes, Slices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterStatus {
    #[default]
    Idle,
    Pending,
}

/// Slice names used for change tracking and derived dependencies.
pub mod slice {
    pub const STATUS: &str = "status";
    pub const LOCATION: &str = "location";
    pub const RESOLVED_LOCATION: &str = "resolved_location";
    pub const MATCHES: &str = "matches";
    pub const PENDING_MATCHES: &str = "pending_matches";
    pub const CACHED_MATCHES: &str = "cached_matches";
    pub const REDIRECT: &str = "redirect";
    pub const NOT_FOUND: &str = "not_found";
    pub const HAS_NOT_FOUND: &str = "has_not_found";
    pub const STATUS_CODE: &str = "status_code";
}

#[derive(Debug, Clone)]
pub struct RouterState {
    pub status: RouterStatus,
    pub is_loading: bool,
    /// Location being loaded (or last loaded).
    pub location: Location,
    /// Location whose matches were last committed.
    pub resolved_location: Option<Location>,
    pub matches: Arc<Vec<Match>>,
    pub pending_matches: Option<Arc<Vec<Match>>>,
    pub cached_matches: Arc<Vec<Match>>,
    /// Redirect the last load cycle ended in.
    pub redirect: Option<Redirect>,
    /// The last load cycle ended in a not-found.
    pub not_found: bool,
    pub loaded_at: Option<Instant>,
    /// Derived: some committed match is not found.
    pub has_not_found: bool,
    /// Derived: HTTP status of the committed state.
    pub status_code: u16,
}

impl Default for RouterState {
    fn default() -> Self {
        Self {
            status: RouterStatus::Idle,
            is_loading: false,
            location: Location::default(),
            resolved_location: None,
            matches: Arc::default(),
            pending_matches: None,
            cached_matches: Arc::default(),
            redirect: None,
            not_found: false,
            loaded_at: None,
            has_not_found: false,
            status_code: 200,
        }
    }
}

impl RouterState {
    /// Find a match by id in cached, pending and current matches.
    pub fn get_match(&self, id: &MatchId) -> Option<&Match> {
        self.cached_matches
            .iter()
            .chain(self.pending_matches.iter().flat_map(|m| m.iter()))
            .chain(self.matches.iter())
            .find(|m| &m.id == id)
    }

    /// Matches of the navigation in flight, or the committed ones.
    pub fn active_matches(&self) -> &[Match] {
        match &self.pending_matches {
            Some(pending) => pending,
            None => &self.matches,
        }
    }

    /// Apply `f` to the match with `id`, looking in pending, current, then cached.
    /// Returns false when no list holds it.
    pub fn update_match<F: FnOnce(&mut Match)>(&mut self, id: &MatchId, f: F) -> bool {
        if let Some(pending) = &mut self.pending_matches {
            if let Some(i) = pending.iter().position(|m| &m.id == id) {
                f(&mut Arc::make_mut(pending)[i]);
                return true;
            }
        }
        if let Some(i) = self.matches.iter().position(|m| &m.id == id) {
            f(&mut Arc::make_mut(&mut self.matches)[i]);
            return true;
        }
        if let Some(i) = self.cached_matches.iter().position(|m| &m.id == id) {
            f(&mut Arc::make_mut(&mut self.cached_matches)[i]);
            return true;
        }
        false
    }

    /// Ids in matches and pending matches.
    pub fn active_ids(&self) -> HashSet<MatchId> {
        self.matches
            .iter()
            .chain(self.pending_matches.iter().flat_map(|m| m.iter()))
            .map(|m| m.id.clone())
            .collect()
    }
}

fn list_changed(prev: &Arc<Vec<Match>>, next: &Arc<Vec<Match>>) -> bool {
    !Arc::ptr_eq(prev, next)
}

impl Slices for RouterState {
    fn changed(prev: &Self, next: &Self) -> Changes {
        let mut changed = Changes::new();
        if prev.status != next.status || prev.is_loading != next.is_loading {
            changed.insert(slice::STATUS);
        }
        if prev.location != next.location {
            changed.insert(slice::LOCATION);
        }
        if prev.resolved_location != next.resolved_location {
            changed.insert(slice::RESOLVED_LOCATION);
        }
        if list_changed(&prev.matches, &next.matches) {
            changed.insert(slice::MATCHES);
        }
        let pending_changed = match (&prev.pending_matches, &next.pending_matches) {
            (Some(a), Some(b)) => list_changed(a, b),
            (None, None) => false,
            _ => true,
        };
        if pending_changed {
            changed.insert(slice::PENDING_MATCHES);
        }
        if list_changed(&prev.cached_matches, &next.cached_matches) {
            changed.insert(slice::CACHED_MATCHES);
        }
        if prev.redirect != next.redirect {
            changed.insert(slice::REDIRECT);
        }
        if prev.not_found != next.not_found {
            changed.insert(slice::NOT_FOUND);
        }
        changed
    }
}

/// Derived values of the router state.
pub fn router_derived() -> DerivedGraph<RouterState> {
    let nodes = vec![
        // declared out of order on purpose; the graph sorts them
        DerivedNode::new(
            slice::STATUS_CODE,
            &[slice::REDIRECT, slice::NOT_FOUND, slice::HAS_NOT_FOUND, slice::MATCHES],
            |s: &mut RouterState| {
                let code = if let Some(redirect) = &s.redirect {
                    redirect.status
                } else if s.not_found || s.has_not_found {
                    404
                } else if s.matches.iter().any(|m| m.status == MatchStatus::Error) {
                    500
                } else {
                    200
                };
                let changed = s.status_code != code;
                s.status_code = code;
                changed
            },
        ),
        DerivedNode::new(slice::HAS_NOT_FOUND, &[slice::MATCHES], |s: &mut RouterState| {
            let value = s
                .matches
                .iter()
                .any(|m| m.status == MatchStatus::NotFound || m.global_not_found);
            let changed = s.has_not_found != value;
            s.has_not_found = value;
            changed
        }),
    ];
    // the node list is static and acyclic
    DerivedGraph::new(nodes).unwrap_or_else(|_| DerivedGraph::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteId;

    fn m(id: &str) -> Match {
        Match::new(MatchId::from(id), RouteId::from(id), id.into(), 0)
    }

    #[test]
    fn test_get_match_prefers_cached() {
        let mut state = RouterState::default();
        let mut cached = m("/a");
        cached.loader_data = Some(serde_json::json!("cached"));
        state.cached_matches = Arc::new(vec![cached]);
        state.matches = Arc::new(vec![m("/a")]);
        let found = state.get_match(&MatchId::from("/a")).unwrap();
        assert_eq!(found.loader_data, Some(serde_json::json!("cached")));
    }

    #[test]
    fn test_update_match_prefers_pending() {
        let mut state = RouterState::default();
        state.matches = Arc::new(vec![m("/a")]);
        state.pending_matches = Some(Arc::new(vec![m("/a")]));
        assert!(state.update_match(&MatchId::from("/a"), |m| m.invalid = true));
        assert!(state.pending_matches.as_ref().unwrap()[0].invalid);
        assert!(!state.matches[0].invalid);
        assert!(!state.update_match(&MatchId::from("/zzz"), |_| {}));
    }

    #[test]
    fn test_changed_slices_use_identity() {
        let prev = RouterState::default();
        let mut next = prev.clone();
        assert!(RouterState::changed(&prev, &next).is_empty());
        Arc::make_mut(&mut next.matches).push(m("/a"));
        let changed = RouterState::changed(&prev, &next);
        assert!(changed.contains(slice::MATCHES));
        assert_eq!(changed.len(), 1);
    }
}
