//! Match cache policy.
//!
//! Exiting matches are parked in `cached_matches` so a quick return can
//! reuse their data. These helpers decide what stays.

use std::time::Duration;
use tokio::time::Instant;

use crate::matching::{Match, MatchStatus};
use crate::navigation::RouterOptions;
use crate::routing::RouteTree;

/// How long `m` may stay cached after its last update.
pub fn gc_time(tree: &RouteTree, options: &RouterOptions, m: &Match) -> Option<Duration> {
    let route = tree.get(&m.route_id)?;
    Some(if m.preload {
        route
            .options
            .preload_gc_time
            .unwrap_or(options.default_preload_gc_time)
    } else {
        route.options.gc_time.unwrap_or(options.default_gc_time)
    })
}

/// A cached match is dropped when its route is gone or has no loader, when
/// it errored, or once it has been idle for its gc time.
pub fn is_expired(tree: &RouteTree, options: &RouterOptions, m: &Match, now: Instant) -> bool {
    let Some(route) = tree.get(&m.route_id) else {
        return true;
    };
    if route.options.loader.is_none() || m.status == MatchStatus::Error {
        return true;
    }
    match gc_time(tree, options, m) {
        Some(gc) => now.saturating_duration_since(m.updated_at) >= gc,
        None => true,
    }
}

/// Split `cached` into kept matches; returns `None` when nothing expired.
pub fn retain_fresh(tree: &RouteTree, options: &RouterOptions, cached: &[Match], now: Instant) -> Option<Vec<Match>> {
    let kept: Vec<Match> = cached
        .iter()
        .filter(|m| !is_expired(tree, options, m, now))
        .cloned()
        .collect();
    (kept.len() != cached.len()).then_some(kept)
}

/// Mark a match for reload. Errored matches (or all, when forced) go back
/// to pending so the next load re-runs them in the foreground.
pub fn invalidate_match(m: &mut Match, force_pending: bool) {
    m.invalid = true;
    if force_pending || m.status == MatchStatus::Error {
        m.status = MatchStatus::Pending;
        m.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchId;
    use crate::routing::{Route, RouteError, RouteId};
    use serde_json::json;

    fn tree() -> RouteTree {
        RouteTree::new(Route::root().children([
            Route::new("a").loader(|_| async { Ok(json!(1)) }).gc_time(Duration::from_secs(10)),
            Route::new("b"),
        ]))
        .unwrap()
    }

    fn cached(route: &str) -> Match {
        let mut m = Match::new(MatchId::from(route), RouteId::from(route), route.into(), 1);
        m.status = MatchStatus::Success;
        m
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_respects_route_time() {
        let t = tree();
        let options = RouterOptions::default();
        let m = cached("/a");
        assert!(!is_expired(&t, &options, &m, Instant::now()));
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(is_expired(&t, &options, &m, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaderless_and_errored_are_dropped() {
        let t = tree();
        let options = RouterOptions::default();
        let now = Instant::now();
        assert!(is_expired(&t, &options, &cached("/b"), now));
        let mut errored = cached("/a");
        errored.status = MatchStatus::Error;
        assert!(is_expired(&t, &options, &errored, now));
        assert!(retain_fresh(&t, &options, &[cached("/a")], now).is_none());
        assert_eq!(retain_fresh(&t, &options, &[cached("/a"), cached("/b")], now).unwrap().len(), 1);
    }

    #[test]
    fn test_invalidate_resets_errors() {
        let mut m = cached("/a");
        invalidate_match(&mut m, false);
        assert!(m.invalid);
        assert_eq!(m.status, MatchStatus::Success);

        m.status = MatchStatus::Error;
        m.error = Some(RouteError::failed("boom"));
        invalidate_match(&mut m, false);
        assert_eq!(m.status, MatchStatus::Pending);
        assert!(m.error.is_none());
    }
}
