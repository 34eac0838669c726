//! The router handle.
//!
//! # Responsibilities
//! - Own the route tree, history, options and state store
//! - Run load cycles and commit their matches
//! - Cache control: invalidate, expire, clear, preload
//!
//! # Design Decisions
//! - `Router` is a cheap `Clone` handle; there is no global instance
//! - The route tree sits behind `ArcSwap` so a reload never blocks readers
//! - Every load gets a generation number; only the latest one commits or
//!   settles, older ones wait for it

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::loading::cache::{invalidate_match, retain_fresh};
use crate::loading::{load_matches, LoadCycle, LoadOutcome};
use crate::location::{parse_href, History, HistoryState, Location, MemoryHistory, Rewrite};
use crate::location::parsed::format_href;
use crate::matching::{Match, MatchBuilder, MatchId, MatchRoutesOptions, MatchStatus};
use crate::navigation::events::{LocationChange, RouterEvent};
use crate::navigation::options::{NavigateOptions, ParamsUpdate, RouterOptions};
use crate::navigation::NavigationError;
use crate::observability::metrics;
use crate::path::{match_pathname, trim_path_right, MatchOptions, Params, PathCache};
use crate::routing::{Redirect, Route, RouteError, RouteTree, RouteTreeError};
use crate::store::{router_derived, RouterState, RouterStatus, Store, Subscription};

const EVENT_CAPACITY: usize = 256;

pub type MatchFilter = Arc<dyn Fn(&Match) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Await stale refreshes instead of running them in the background.
    pub sync: bool,
}

#[derive(Clone, Default)]
pub struct InvalidateOptions {
    /// Only matches passing the filter are invalidated; all when `None`.
    pub filter: Option<MatchFilter>,
    /// Put successful matches back to pending too.
    pub force_pending: bool,
    pub sync: bool,
}

impl fmt::Debug for InvalidateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidateOptions")
            .field("filter", &self.filter.is_some())
            .field("force_pending", &self.force_pending)
            .field("sync", &self.sync)
            .finish()
    }
}

/// Options for [`Router::match_route`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchRouteOptions {
    /// Compare against the location being loaded instead of the resolved one.
    pub pending: bool,
    pub fuzzy: bool,
    pub case_sensitive: bool,
    /// Require the destination's search to be contained in the current one.
    pub include_search: bool,
}

pub(crate) struct RouterInner {
    tree: ArcSwap<RouteTree>,
    pub(crate) cache: PathCache,
    pub(crate) options: RouterOptions,
    pub(crate) rewrite: Rewrite,
    pub(crate) history: Arc<dyn History>,
    store: Store<RouterState>,
    events: broadcast::Sender<RouterEvent>,
    generation: AtomicU64,
    completed: watch::Sender<u64>,
    redirect_chain: Mutex<Vec<String>>,
    /// Per-instance key; a masked entry written with another key is not unmasked.
    pub(crate) temp_key: String,
}

/// Route resolution and data loading over one history.
#[derive(Clone)]
pub struct Router {
    pub(crate) inner: Arc<RouterInner>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.inner.tree.load().len())
            .field("options", &self.inner.options)
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Router over an in-memory history starting at `/`.
    pub fn new(tree: RouteTree, options: RouterOptions) -> Self {
        Self::with_history(tree, options, Arc::new(MemoryHistory::new("/")))
    }

    pub fn from_routes(root: Route, options: RouterOptions) -> Result<Self, RouteTreeError> {
        Ok(Self::new(RouteTree::new(root)?, options))
    }

    pub fn with_history(tree: RouteTree, options: RouterOptions, history: Arc<dyn History>) -> Self {
        Self::from_shared(Arc::new(tree), options, history)
    }

    /// Router over a tree shared with other routers (one per server request).
    pub fn from_shared(tree: Arc<RouteTree>, options: RouterOptions, history: Arc<dyn History>) -> Self {
        let rewrite = Rewrite::basepath(&options.basepath, options.case_sensitive).compose(options.rewrite.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (completed, _) = watch::channel(0);
        let router = Self {
            inner: Arc::new(RouterInner {
                tree: ArcSwap::new(tree),
                cache: PathCache::with_capacity(options.path_cache_capacity),
                rewrite,
                history,
                store: Store::new(RouterState::default(), router_derived()),
                events,
                generation: AtomicU64::new(0),
                completed,
                redirect_chain: Mutex::new(Vec::new()),
                temp_key: format!("{:08x}", fastrand::u32(..)),
                options,
            }),
        };
        let location = router.parse_location();
        router.inner.store.set(|s| s.location = location);
        router
    }

    pub fn tree(&self) -> Arc<RouteTree> {
        self.inner.tree.load_full()
    }

    /// Swap in a rebuilt route tree. Readers holding the old one keep it.
    pub fn update_tree(&self, tree: RouteTree) {
        info!(routes = tree.len(), "route tree replaced");
        self.inner.tree.store(Arc::new(tree));
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.inner.history
    }

    /// Internal href → href as shown outside (basepath and output rewrites).
    pub fn public_href(&self, href: &str) -> String {
        self.inner.rewrite.apply_output(href)
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.inner.cache
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<RouterState> {
        self.inner.store.get()
    }

    pub fn store(&self) -> &Store<RouterState> {
        &self.inner.store
    }

    /// Lifecycle events. Slow receivers lag; they never block the router.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.inner.events.subscribe()
    }

    /// Observe every state change.
    pub fn subscribe_state<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RouterState) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(move |state, _| listener(state))
    }

    fn emit(&self, event: RouterEvent) {
        debug!(event = event.name(), href = %event.change().to_location.href, "router event");
        // no receivers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn get_match(&self, id: &MatchId) -> Option<Match> {
        self.state().get_match(id).cloned()
    }

    pub(crate) fn update_match<F: FnOnce(&mut Match)>(&self, id: &MatchId, f: F) {
        self.inner.store.set(|s| {
            s.update_match(id, f);
        });
    }

    fn parse_entry(&self, href: &str, state: HistoryState) -> Location {
        let internal = self.inner.rewrite.apply_input(href);
        let raw = parse_href(&internal, state);
        let search = (self.inner.options.parse_search)(&raw.search);
        let search_str = (self.inner.options.stringify_search)(&search);
        let hash = raw.hash.trim_start_matches('#').to_string();
        Location {
            href: format_href(&raw.pathname, &search_str, &hash),
            public_href: href.to_string(),
            pathname: raw.pathname,
            search,
            search_str,
            hash,
            state: raw.state,
            masked_location: None,
            unmask_on_reload: false,
        }
    }

    /// Parse the current history entry, unmasking it when it carries a
    /// temporary location written by this router instance.
    pub fn parse_location(&self) -> Location {
        let entry = self.inner.history.location();
        let location = self.parse_entry(&entry.href, entry.state);
        if let Some(temp) = location.state.temp_location.clone() {
            let same_session = location
                .state
                .temp_key
                .as_deref()
                .is_none_or(|key| key == self.inner.temp_key);
            if same_session {
                let mut state = location.state.clone();
                state.temp_location = None;
                state.temp_key = None;
                let mut real = self.parse_entry(&temp, state);
                real.masked_location = Some(Box::new(location));
                return real;
            }
        }
        location
    }

    pub fn match_routes(&self, location: &Location, opts: &MatchRoutesOptions) -> Result<Vec<Match>, RouteError> {
        let tree = self.tree();
        let state = self.state();
        MatchBuilder::new(&tree, &self.inner.cache, &self.inner.options, &state).build(location, opts)
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_chain(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.inner
            .redirect_chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_pending_matches(&self) {
        let state = self.state();
        if let Some(pending) = &state.pending_matches {
            for m in pending.iter() {
                m.abort.cancel();
                if let Some(timer) = &m.handles.pending_timeout {
                    timer.abort();
                }
            }
        }
    }

    /// Load the current history location with default options.
    pub async fn load(&self) -> LoadOutcome {
        self.load_with(LoadOptions::default()).await
    }

    /// Build pending matches for the current history entry, run their hooks
    /// and commit them.
    pub async fn load_with(&self, opts: LoadOptions) -> LoadOutcome {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let prev = self.state();
        let next = self.parse_location();
        debug!(href = %next.href, generation, sync = opts.sync, "load started");

        self.cancel_pending_matches();
        let pending = match self.match_routes(&next, &MatchRoutesOptions::default()) {
            Ok(pending) => pending,
            Err(err) => return LoadOutcome::Failed(err),
        };
        let ids: Vec<MatchId> = pending.iter().map(|m| m.id.clone()).collect();

        let store = &self.inner.store;
        store.batch(|| {
            store.set(|s| {
                s.status = RouterStatus::Pending;
                s.is_loading = true;
                s.location = next.clone();
            });
            store.set(|s| {
                if s.cached_matches.iter().any(|m| ids.contains(&m.id)) {
                    let kept = s.cached_matches.iter().filter(|m| !ids.contains(&m.id)).cloned().collect();
                    s.cached_matches = Arc::new(kept);
                }
                s.pending_matches = Some(Arc::new(pending));
            });
        });

        let change = LocationChange::new(prev.resolved_location.as_ref(), &next);
        if prev.redirect.is_none() {
            self.emit(RouterEvent::BeforeNavigate(change.clone()));
        }
        self.emit(RouterEvent::BeforeLoad(change.clone()));

        let commit = self.clone();
        let mut cycle = LoadCycle::new(next.clone(), ids)
            .sync(opts.sync)
            .on_ready(move || commit.commit_pending(generation));

        let mut recorded_redirect = None;
        let mut not_found = false;
        let outcome = match load_matches(self, &mut cycle).await {
            Ok(()) => LoadOutcome::Ready,
            Err(RouteError::Redirect(redirect)) => {
                metrics::record_redirect(redirect.status);
                self.follow_redirect(generation, &next, redirect, &mut recorded_redirect)
                    .await
            }
            Err(RouteError::NotFound(nf)) => {
                not_found = true;
                LoadOutcome::NotFound(nf)
            }
            Err(err) => LoadOutcome::Failed(err),
        };

        if self.is_latest(generation) {
            store.set(|s| {
                s.status = RouterStatus::Idle;
                s.is_loading = false;
                s.resolved_location = Some(s.location.clone());
                s.redirect = recorded_redirect;
                s.not_found = not_found;
            });
            if !matches!(outcome, LoadOutcome::Redirected(_)) {
                self.lock_chain().clear();
            }
            let settled = self.state();
            let change = LocationChange::new(prev.resolved_location.as_ref(), &next);
            self.emit(RouterEvent::Load(change.clone()));
            self.emit(RouterEvent::Resolved(change));
            metrics::record_navigation(outcome.label());
            metrics::record_cache_size(settled.cached_matches.len());
            info!(
                href = %next.href,
                outcome = outcome.label(),
                status_code = settled.status_code,
                matches = settled.matches.len(),
                "navigation settled"
            );
            self.inner.completed.send_replace(generation);
        } else {
            self.wait_for_latest().await;
        }
        outcome
    }

    async fn wait_for_latest(&self) {
        let mut completed = self.inner.completed.subscribe();
        let latest = &self.inner.generation;
        let _ = completed
            .wait_for(|done| *done >= latest.load(Ordering::SeqCst))
            .await;
    }

    async fn follow_redirect(
        &self,
        generation: u64,
        current: &Location,
        redirect: Box<Redirect>,
        recorded: &mut Option<Redirect>,
    ) -> LoadOutcome {
        let target = redirect
            .href
            .clone()
            .or_else(|| redirect.to.clone())
            .unwrap_or_default();

        if redirect.reload_document {
            *recorded = Some((*redirect).clone());
            return LoadOutcome::ExternalRedirect(target);
        }
        if self.inner.options.is_server {
            info!(target = %target, status = redirect.status, "redirect reported");
            *recorded = Some((*redirect).clone());
            return LoadOutcome::Redirected(redirect);
        }

        let (looped, outermost) = {
            let mut chain = self.lock_chain();
            let outermost = chain.is_empty();
            if outermost {
                chain.push(trim_path_right(&current.href));
            }
            let key = trim_path_right(&target);
            if chain.contains(&key) {
                (true, outermost)
            } else {
                chain.push(key);
                (false, outermost)
            }
        };
        if looped {
            warn!(target = %target, from = %current.href, "redirect loop detected");
            self.commit_pending(generation);
            if outermost {
                self.lock_chain().clear();
            }
            *recorded = Some((*redirect).clone());
            return LoadOutcome::Redirected(redirect);
        }

        info!(from = %current.href, target = %target, "following redirect");
        let opts = NavigateOptions::from(redirect.as_ref()).replace();
        let outcome = match self.navigate(opts).await {
            Ok(_) => LoadOutcome::Redirected(redirect),
            Err(err) => LoadOutcome::Failed(RouteError::failed(err)),
        };
        // the chain belongs to the navigation that started it
        if outermost {
            self.lock_chain().clear();
        }
        outcome
    }

    /// Resolve a redirect's target into a concrete href.
    pub(crate) fn resolve_redirect(&self, redirect: &mut Redirect) {
        if redirect.href.is_some() {
            return;
        }
        match self.build_location(&NavigateOptions::from(&*redirect)) {
            Ok(location) => redirect.href = Some(location.href),
            Err(err) => warn!(target = redirect.target(), error = %err, "could not resolve redirect"),
        }
    }

    /// Promote pending matches, park the exiting ones, run lifecycle hooks.
    pub(crate) fn commit_pending(&self, generation: u64) {
        if !self.is_latest(generation) {
            return;
        }
        let prev = self.state();
        let Some(pending) = prev.pending_matches.clone() else {
            return;
        };
        let had = |list: &[Match], m: &Match| list.iter().any(|other| other.id == m.id);
        let exiting: Vec<Match> = prev.matches.iter().filter(|m| !had(&pending, m)).cloned().collect();
        let entering: Vec<Match> = pending.iter().filter(|m| !had(&prev.matches, m)).cloned().collect();
        let staying: Vec<Match> = pending.iter().filter(|m| had(&prev.matches, m)).cloned().collect();

        self.inner.store.set(|s| {
            s.is_loading = false;
            s.loaded_at = Some(Instant::now());
            if let Some(pending) = s.pending_matches.take() {
                s.matches = pending;
            }
            let parked: Vec<Match> = exiting
                .iter()
                .filter(|m| m.status != MatchStatus::Error)
                .cloned()
                .collect();
            if !parked.is_empty() {
                Arc::make_mut(&mut s.cached_matches).extend(parked);
            }
        });
        debug!(
            exiting = exiting.len(),
            entering = entering.len(),
            staying = staying.len(),
            "matches committed"
        );
        self.clear_expired_cache();

        let tree = self.tree();
        for m in &exiting {
            if let Some(hook) = tree.get(&m.route_id).and_then(|r| r.options.on_leave.as_ref()) {
                hook(m);
            }
        }
        for m in &entering {
            if let Some(hook) = tree.get(&m.route_id).and_then(|r| r.options.on_enter.as_ref()) {
                hook(m);
            }
        }
        for m in &staying {
            if let Some(hook) = tree.get(&m.route_id).and_then(|r| r.options.on_stay.as_ref()) {
                hook(m);
            }
        }
    }

    /// Mark matches for reload and run a load cycle.
    pub async fn invalidate(&self, opts: InvalidateOptions) -> LoadOutcome {
        let selected = |m: &Match| opts.filter.as_ref().is_none_or(|f| f(m));
        let invalidate_list = |list: &mut Arc<Vec<Match>>| {
            if list.iter().any(|m| selected(m)) {
                for m in Arc::make_mut(list).iter_mut() {
                    if selected(m) {
                        invalidate_match(m, opts.force_pending);
                    }
                }
            }
        };
        self.inner.store.set(|s| {
            invalidate_list(&mut s.matches);
            invalidate_list(&mut s.cached_matches);
            if let Some(pending) = &mut s.pending_matches {
                invalidate_list(pending);
            }
        });
        debug!(force_pending = opts.force_pending, "matches invalidated");
        self.load_with(LoadOptions { sync: opts.sync }).await
    }

    /// Drop cached matches past their gc time. Returns how many were evicted.
    pub fn clear_expired_cache(&self) -> usize {
        let tree = self.tree();
        let now = Instant::now();
        let mut evicted = 0;
        self.inner.store.set(|s| {
            if let Some(kept) = retain_fresh(&tree, &self.inner.options, &s.cached_matches, now) {
                evicted = s.cached_matches.len() - kept.len();
                s.cached_matches = Arc::new(kept);
            }
        });
        if evicted > 0 {
            debug!(evicted, "expired matches evicted");
            metrics::record_evictions(evicted);
            metrics::record_cache_size(self.state().cached_matches.len());
        }
        evicted
    }

    /// Drop cached matches passing `filter`, or all of them.
    pub fn clear_cache(&self, filter: Option<MatchFilter>) {
        self.inner.store.set(|s| {
            let kept: Vec<Match> = s
                .cached_matches
                .iter()
                .filter(|m| filter.as_ref().is_some_and(|f| !f(m)))
                .cloned()
                .collect();
            if kept.len() != s.cached_matches.len() {
                s.cached_matches = Arc::new(kept);
            }
        });
    }

    /// Load a destination's data ahead of navigation. New matches are parked
    /// in the cache; matches already active are left alone. Redirects are
    /// followed; a not-found yields `None`.
    pub fn preload_route(&self, dest: NavigateOptions) -> BoxFuture<'_, Result<Option<Vec<Match>>, NavigationError>> {
        Box::pin(async move {
            let next = self.build_location(&dest)?;
            let matches = self.match_routes(
                &next,
                &MatchRoutesOptions {
                    preload: true,
                    throw_on_error: true,
                    ..MatchRoutesOptions::default()
                },
            )?;

            let state = self.state();
            let active: HashSet<MatchId> = state.active_ids();
            let fresh: Vec<Match> = matches
                .iter()
                .filter(|m| !active.contains(&m.id) && state.cached_matches.iter().all(|c| c.id != m.id))
                .cloned()
                .collect();
            if !fresh.is_empty() {
                self.inner.store.set(|s| Arc::make_mut(&mut s.cached_matches).extend(fresh));
            }

            let ids: Vec<MatchId> = matches.iter().map(|m| m.id.clone()).collect();
            debug!(href = %next.href, matches = ids.len(), "preloading");
            let mut cycle = LoadCycle::new(next.clone(), ids.clone()).preload(active);
            match load_matches(self, &mut cycle).await {
                Ok(()) => Ok(Some(ids.iter().filter_map(|id| self.get_match(id)).collect())),
                Err(RouteError::Redirect(redirect)) => {
                    if redirect.reload_document {
                        return Ok(None);
                    }
                    let follow = NavigateOptions::from(redirect.as_ref()).from_location(next);
                    self.preload_route(follow).await
                }
                Err(RouteError::NotFound(_)) => Ok(None),
                Err(err) => {
                    warn!(href = %next.href, error = %err, "preload failed");
                    Ok(None)
                }
            }
        })
    }

    /// Params of `dest` when it matches the current location, else `None`.
    pub fn match_route(&self, dest: &NavigateOptions, opts: MatchRouteOptions) -> Option<Params> {
        let template = NavigateOptions {
            leave_params: true,
            ..dest.clone()
        };
        let next = self.build_location(&template).ok()?;
        let state = self.state();
        let base = if opts.pending {
            &state.location
        } else {
            state.resolved_location.as_ref().unwrap_or(&state.location)
        };
        let params = match_pathname(
            &self.inner.cache,
            "/",
            &base.pathname,
            &MatchOptions {
                to: Some(&next.pathname),
                fuzzy: opts.fuzzy,
                case_sensitive: opts.case_sensitive,
            },
        )?;
        if let ParamsUpdate::Merge(wanted) = &dest.params {
            if wanted.iter().any(|(k, v)| params.get(k) != Some(v)) {
                return None;
            }
        }
        if opts.include_search && next.search.iter().any(|(k, v)| base.search.get(k) != Some(v)) {
            return None;
        }
        Some(params)
    }

    pub async fn back(&self) -> LoadOutcome {
        self.go(-1).await
    }

    pub async fn forward(&self) -> LoadOutcome {
        self.go(1).await
    }

    /// Move through history, then load the entry we landed on.
    pub async fn go(&self, delta: isize) -> LoadOutcome {
        self.inner.history.go(delta);
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::HistoryLocation;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn router_at(href: &str, root: Route) -> Router {
        Router::with_history(
            RouteTree::new(root).unwrap(),
            RouterOptions::default(),
            Arc::new(MemoryHistory::new(href)),
        )
    }

    #[tokio::test]
    async fn test_load_commits_matches() {
        let router = router_at(
            "/posts/1",
            Route::root().child(Route::new("posts/$id").loader(|ctx| async move { Ok(json!(ctx.params["id"])) })),
        );
        let outcome = router.load().await;
        assert!(outcome.is_ready());
        let state = router.state();
        assert_eq!(state.status, RouterStatus::Idle);
        assert!(state.pending_matches.is_none());
        assert_eq!(state.matches.len(), 2);
        assert_eq!(state.matches[1].loader_data, Some(json!("1")));
        assert_eq!(state.resolved_location.as_ref().unwrap().pathname, "/posts/1");
        assert_eq!(state.status_code, 200);
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let router = router_at("/", Route::root().child(Route::new("/")));
        let mut events = router.subscribe();
        router.load().await;
        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.name());
        }
        assert_eq!(names, vec!["before_navigate", "before_load", "load", "resolved"]);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks() {
        let entered = Arc::new(AtomicUsize::new(0));
        let left = Arc::new(AtomicUsize::new(0));
        let (e, l) = (entered.clone(), left.clone());
        let history = Arc::new(MemoryHistory::new("/a"));
        let router = Router::with_history(
            RouteTree::new(Route::root().children([
                Route::new("a")
                    .on_enter(move |_| {
                        e.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_leave(move |_| {
                        l.fetch_add(1, Ordering::SeqCst);
                    }),
                Route::new("b"),
            ]))
            .unwrap(),
            RouterOptions::default(),
            history.clone(),
        );
        router.load().await;
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        history.push("/b", HistoryState::default());
        router.load().await;
        assert_eq!(left.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_masked_entry_is_unmasked_for_same_session() {
        let history = Arc::new(MemoryHistory::new("/"));
        let router = Router::with_history(
            RouteTree::new(Route::root().children([Route::new("photos/$id"), Route::new("photos/$id/modal")])).unwrap(),
            RouterOptions::default(),
            history.clone(),
        );
        let state = HistoryState {
            temp_location: Some("/photos/1/modal".into()),
            temp_key: Some(router.inner.temp_key.clone()),
            ..HistoryState::default()
        };
        history.push("/photos/1", state.clone());
        let loc = router.parse_location();
        assert_eq!(loc.pathname, "/photos/1/modal");
        assert_eq!(loc.masked_location.as_ref().unwrap().pathname, "/photos/1");

        let foreign = HistoryState {
            temp_key: Some("other".into()),
            ..state
        };
        history.replace("/photos/1", foreign);
        assert_eq!(router.parse_location().pathname, "/photos/1");
    }

    #[tokio::test]
    async fn test_clear_cache_with_filter() {
        let router = router_at("/", Route::root());
        let parked = |id: &str| Match::new(MatchId::from(id), crate::routing::RouteId::from(id), id.into(), 1);
        router
            .store()
            .set(|s| s.cached_matches = Arc::new(vec![parked("/a"), parked("/b")]));
        router.clear_cache(Some(Arc::new(|m: &Match| m.id.as_str() == "/a")));
        assert_eq!(router.state().cached_matches.len(), 1);
        router.clear_cache(None);
        assert!(router.state().cached_matches.is_empty());
    }

    #[test]
    fn test_history_location_shape() {
        let h = MemoryHistory::new("/x?y=1");
        let HistoryLocation { pathname, search, .. } = h.location();
        assert_eq!(pathname, "/x");
        assert_eq!(search, "?y=1");
    }
}
