//! Server → client state transfer.
//!
//! # Responsibilities
//! - Snapshot the committed matches of a server-side load as plain data
//! - Restore such a snapshot into a fresh router without re-running loaders

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::matching::{MatchId, MatchRoutesOptions, MatchStatus};
use crate::navigation::Router;
use crate::routing::{RouteError, RouteId};
use crate::store::RouterStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedMatch {
    pub id: MatchId,
    pub route_id: RouteId,
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds since the match was last updated.
    pub age_ms: u64,
    pub ssr: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedState {
    pub href: String,
    pub status_code: u16,
    pub matches: Vec<DehydratedMatch>,
}

pub fn dehydrate(router: &Router) -> DehydratedState {
    let state = router.state();
    let now = Instant::now();
    DehydratedState {
        href: state
            .resolved_location
            .as_ref()
            .unwrap_or(&state.location)
            .href
            .clone(),
        status_code: state.status_code,
        matches: state
            .matches
            .iter()
            .map(|m| DehydratedMatch {
                id: m.id.clone(),
                route_id: m.route_id.clone(),
                status: m.status,
                loader_data: m.loader_data.clone(),
                error: m.error.as_ref().map(ToString::to_string),
                age_ms: now.saturating_duration_since(m.updated_at).as_millis() as u64,
                ssr: m.ssr,
            })
            .collect(),
    }
}

/// Build matches for the router's current location and fill them from
/// `dehydrated`. Restored matches are flagged so the next load skips them.
pub fn hydrate(router: &Router, dehydrated: &DehydratedState) -> Result<(), RouteError> {
    let location = router.parse_location();
    let mut matches = router.match_routes(&location, &MatchRoutesOptions::default())?;
    let now = Instant::now();

    let mut restored = 0;
    for m in &mut matches {
        match dehydrated.matches.iter().find(|d| d.id == m.id) {
            Some(d) => {
                m.status = d.status;
                m.loader_data = d.loader_data.clone();
                m.error = d.error.clone().map(RouteError::Failed);
                m.updated_at = now.checked_sub(Duration::from_millis(d.age_ms)).unwrap_or(now);
                m.ssr = d.ssr;
                m.dehydrated = d.ssr;
                restored += 1;
            }
            None => {
                m.ssr = false;
                m.dehydrated = false;
            }
        }
    }
    debug!(href = %location.href, restored, total = matches.len(), "hydrated");

    router.store().set(|s| {
        s.status = RouterStatus::Idle;
        s.is_loading = false;
        s.resolved_location = Some(location.clone());
        s.location = location;
        s.matches = Arc::new(matches);
    });
    Ok(())
}
