//! Load pipeline for one set of matches.
//!
//! # Responsibilities
//! - Run `before_load` hooks serially, parent before child
//! - Dispatch loaders together up to the first failing match
//! - Turn redirects and not-founds into match statuses and propagate them
//! - Fire the ready callback exactly once
//!
//! # Design Decisions
//! - Per-cycle bookkeeping lives in [`LoadCycle`], passed by reference
//! - A match has at most one loader in flight; later cycles join its handle
//! - Fresh cached data is served as is; stale data is refreshed in the
//!   background unless the cycle is `sync`

use futures_util::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::location::Location;
use crate::matching::{signal, FetchPhase, Match, MatchCause, MatchId, MatchStatus};
use crate::navigation::{NavigateOptions, Router};
use crate::observability::metrics;
use crate::routing::{
    AssetCtx, BeforeLoadCtx, Context, LoaderCtx, NotFound, NotFoundOrigin, RouteDefinition,
    RouteError, RouteId, RouteTree,
};

type ReadyFn = Box<dyn FnOnce() + Send>;

/// Shared one-shot ready callback.
#[derive(Clone, Default)]
pub(crate) struct ReadyGate(Arc<Mutex<Option<ReadyFn>>>);

impl ReadyGate {
    fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(f)))))
    }

    fn is_armed(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Run the callback if nobody has yet.
    pub(crate) fn fire(&self) {
        let ready = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(ready) = ready {
            ready();
        }
    }
}

/// Bookkeeping for one pass over a list of matches.
pub struct LoadCycle {
    pub location: Location,
    pub match_ids: Arc<[MatchId]>,
    pub preload: bool,
    /// Await stale refreshes instead of running them in the background.
    pub sync: bool,
    /// Matches the pipeline must leave untouched (active matches during a preload).
    pub skip: HashSet<MatchId>,
    /// First match whose before-load (or validation) failed.
    pub first_bad_index: Option<usize>,
    ready: ReadyGate,
}

impl fmt::Debug for LoadCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCycle")
            .field("href", &self.location.href)
            .field("match_ids", &self.match_ids)
            .field("preload", &self.preload)
            .field("sync", &self.sync)
            .field("first_bad_index", &self.first_bad_index)
            .finish_non_exhaustive()
    }
}

impl LoadCycle {
    pub fn new(location: Location, match_ids: Vec<MatchId>) -> Self {
        Self {
            location,
            match_ids: match_ids.into(),
            preload: false,
            sync: false,
            skip: HashSet::new(),
            first_bad_index: None,
            ready: ReadyGate::default(),
        }
    }

    pub fn preload(mut self, skip: HashSet<MatchId>) -> Self {
        self.preload = true;
        self.skip = skip;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Callback that commits the cycle's matches. Runs at most once: when
    /// the pipeline finishes, or earlier when a pending timer elapses.
    pub fn on_ready<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.ready = ReadyGate::new(f);
        self
    }

    fn scope(&self) -> Scope {
        Scope {
            location: self.location.clone(),
            match_ids: self.match_ids.clone(),
            preload: self.preload,
        }
    }
}

/// The parts of a cycle a detached loader task needs.
#[derive(Clone)]
struct Scope {
    location: Location,
    match_ids: Arc<[MatchId]>,
    preload: bool,
}

/// Run before-load hooks and loaders for every match of `cycle`.
///
/// Returns `Err` only for redirects and not-founds; other failures are
/// recorded on the matches.
pub async fn load_matches(router: &Router, cycle: &mut LoadCycle) -> Result<(), RouteError> {
    let result = match run_before_loads(router, cycle).await {
        Ok(()) => run_loaders(router, cycle).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            cycle.ready.fire();
            Ok(())
        }
        Err(err @ RouteError::NotFound(_)) => {
            if !cycle.preload {
                cycle.ready.fire();
            }
            Err(err)
        }
        Err(err) => Err(err),
    }
}

fn parent_context(router: &Router, match_ids: &[MatchId], index: usize) -> Context {
    index
        .checked_sub(1)
        .and_then(|parent| router.get_match(&match_ids[parent]))
        .map(|m| m.context)
        .unwrap_or_else(|| router.options().context.clone())
}

fn skipped(router: &Router, m: &Match) -> bool {
    let is_server = router.options().is_server;
    (m.dehydrated && !is_server) || (is_server && !m.ssr)
}

async fn run_before_loads(router: &Router, cycle: &mut LoadCycle) -> Result<(), RouteError> {
    let tree = router.tree();
    let options = router.options();

    for index in 0..cycle.match_ids.len() {
        if cycle.first_bad_index.is_some() {
            break;
        }
        let id = cycle.match_ids[index].clone();
        if cycle.skip.contains(&id) {
            continue;
        }
        let Some(m) = router.get_match(&id) else { continue };
        let Some(route) = tree.get(&m.route_id) else { continue };
        if skipped(router, &m) {
            continue;
        }

        let should_pending = cycle.ready.is_armed()
            && !options.is_server
            && !cycle.preload
            && (route.options.loader.is_some() || route.options.before_load.is_some())
            && (route.has_pending_boundary() || options.default_pending_boundary);

        if m.handles.before_load.is_some() || m.handles.load.is_some() {
            if should_pending {
                arm_pending_timer(router, cycle, route, &id);
            }
            if let Some(before_load) = m.handles.before_load.clone() {
                before_load.await;
            }
            let settled = router
                .get_match(&id)
                .is_some_and(|m| m.status == MatchStatus::Success);
            if settled {
                continue;
            }
        }

        let (done, before_load_signal) = signal();
        router.update_match(&id, |m| m.handles.before_load = Some(before_load_signal));

        let result = before_load_one(router, cycle, index, route, &id, should_pending).await;

        router.update_match(&id, |m| {
            m.handles.before_load = None;
            m.is_fetching = None;
        });
        drop(done);
        result?;
    }
    Ok(())
}

async fn before_load_one(
    router: &Router,
    cycle: &mut LoadCycle,
    index: usize,
    route: &RouteDefinition,
    id: &MatchId,
    should_pending: bool,
) -> Result<(), RouteError> {
    if should_pending {
        arm_pending_timer(router, cycle, route, id);
    }

    let Some(m) = router.get_match(id) else { return Ok(()) };
    if let Some(err) = m.params_error.clone() {
        handle_serial_error(router, cycle, index, err, NotFoundOrigin::BeforeLoad)?;
    }
    if let Some(err) = m.search_error.clone() {
        handle_serial_error(router, cycle, index, err, NotFoundOrigin::BeforeLoad)?;
    }
    if cycle.first_bad_index.is_some() {
        return Ok(());
    }

    let parent = parent_context(router, &cycle.match_ids, index);
    let abort = CancellationToken::new();
    router.update_match(id, |m| {
        m.is_fetching = Some(FetchPhase::BeforeLoad);
        m.fetch_count += 1;
        m.abort = abort.clone();
        let mut context = parent.clone();
        context.extend(m.route_context.clone());
        m.context = context;
    });

    let Some(before_load) = route.options.before_load.clone() else {
        return Ok(());
    };
    let Some(m) = router.get_match(id) else { return Ok(()) };
    let ctx = BeforeLoadCtx {
        route_id: m.route_id.clone(),
        search: m.search.clone(),
        params: m.params.clone(),
        context: m.context.clone(),
        location: cycle.location.clone(),
        cause: if cycle.preload { MatchCause::Preload } else { m.cause },
        preload: cycle.preload,
        abort,
        router: router.clone(),
    };

    trace!(route = %m.route_id, "before_load");
    match before_load(ctx).await {
        Ok(before_load_context) => {
            router.update_match(id, |m| {
                m.before_load_context = before_load_context;
                m.rebuild_context(&parent);
            });
            Ok(())
        }
        Err(err) => handle_serial_error(router, cycle, index, err, NotFoundOrigin::BeforeLoad),
    }
}

/// Commit pending matches early when a route with a pending boundary takes
/// too long, then hold its success back for the minimum pending time.
fn arm_pending_timer(router: &Router, cycle: &LoadCycle, route: &RouteDefinition, id: &MatchId) {
    let options = router.options();
    let pending_ms = route.options.pending_ms.unwrap_or(options.default_pending_ms);
    let pending_min_ms = route
        .options
        .pending_min_ms
        .unwrap_or(options.default_pending_min_ms);
    let ready = cycle.ready.clone();
    let task_router = router.clone();
    let task_id = id.clone();

    let task = tokio::spawn(async move {
        sleep(pending_ms).await;
        if !pending_min_ms.is_zero() {
            let (gate, min_pending) = signal();
            task_router.update_match(&task_id, |m| m.handles.min_pending = Some(min_pending));
            tokio::spawn(async move {
                sleep(pending_min_ms).await;
                drop(gate);
            });
        }
        debug!(match_id = %task_id, ?pending_ms, "pending timeout elapsed, committing early");
        ready.fire();
    });
    let abort = Arc::new(task.abort_handle());
    router.update_match(id, |m| {
        m.handles.clear_pending_timeout();
        m.handles.pending_timeout = Some(abort);
    });
}

fn handle_serial_error(
    router: &Router,
    cycle: &mut LoadCycle,
    index: usize,
    err: RouteError,
    origin: NotFoundOrigin,
) -> Result<(), RouteError> {
    cycle.first_bad_index.get_or_insert(index);
    let id = cycle.match_ids[index].clone();
    let tree = router.tree();

    handle_control_flow(router, &tree, &cycle.match_ids, &id, err.clone(), origin)?;

    let mut err = err;
    let on_error = router
        .get_match(&id)
        .and_then(|m| tree.get(&m.route_id).and_then(|r| r.options.on_error.clone()));
    if let Some(on_error) = on_error {
        if let Err(replacement) = on_error(&err) {
            handle_control_flow(router, &tree, &cycle.match_ids, &id, replacement.clone(), origin)?;
            err = replacement;
        }
    }

    warn!(match_id = %id, error = %err, "before_load failed");
    // the failing match and everything below it are unusable
    for later in cycle.match_ids[index..].iter() {
        router.update_match(later, |m| {
            m.status = MatchStatus::Error;
            m.error = Some(err.clone());
            m.is_fetching = None;
            m.updated_at = Instant::now();
            m.handles.clear_pending_timeout();
        });
    }
    Ok(())
}

/// Record a redirect or not-found on the match and hand it back as `Err`.
/// Any other error passes through as `Ok`.
fn handle_control_flow(
    router: &Router,
    tree: &RouteTree,
    match_ids: &[MatchId],
    id: &MatchId,
    err: RouteError,
    origin: NotFoundOrigin,
) -> Result<(), RouteError> {
    match err {
        RouteError::Redirect(mut redirect) => {
            if redirect.redirect_handled && !redirect.reload_document {
                return Err(RouteError::Redirect(redirect));
            }
            router.update_match(id, |m| {
                m.status = MatchStatus::Redirected;
                m.is_fetching = None;
                m.error = Some(RouteError::Redirect(redirect.clone()));
                m.handles.clear_pending_timeout();
            });
            redirect.redirect_handled = true;
            router.resolve_redirect(&mut redirect);
            debug!(match_id = %id, target = redirect.target(), "redirect raised");
            Err(RouteError::Redirect(redirect))
        }
        RouteError::NotFound(mut not_found) => {
            if not_found.route_id.is_none() {
                not_found.route_id = router.get_match(id).map(|m| m.route_id);
            }
            not_found.origin.get_or_insert(origin);
            handle_not_found(router, tree, match_ids, &mut not_found);
            Err(RouteError::NotFound(not_found))
        }
        _ => Ok(()),
    }
}

/// Mark the boundary match as not found. Before-load not-founds bubble up
/// the parent chain until a route with a not-found boundary (or the root).
fn handle_not_found(router: &Router, tree: &RouteTree, match_ids: &[MatchId], not_found: &mut NotFound) {
    let mut cursor = not_found
        .route_id
        .as_ref()
        .and_then(|id| tree.get(id))
        .unwrap_or_else(|| tree.root());

    loop {
        let route_id: RouteId = cursor.id.clone();
        let found = match_ids
            .iter()
            .find(|id| router.get_match(id).is_some_and(|m| m.route_id == route_id));
        if let Some(match_id) = found {
            let err = RouteError::NotFound(Box::new(not_found.clone()));
            router.update_match(match_id, |m| {
                m.status = MatchStatus::NotFound;
                m.error = Some(err);
                m.is_fetching = None;
            });
        }
        not_found.route_id = Some(route_id);

        let bubble = not_found.origin == Some(NotFoundOrigin::BeforeLoad) && !cursor.has_not_found_boundary();
        match tree.parent(cursor) {
            Some(parent) if bubble => cursor = parent,
            _ => break,
        }
    }
}

async fn run_loaders(router: &Router, cycle: &LoadCycle) -> Result<(), RouteError> {
    let limit = cycle.first_bad_index.unwrap_or(cycle.match_ids.len());
    let scope = cycle.scope();
    let loads = cycle.match_ids[..limit]
        .iter()
        .filter(|id| !cycle.skip.contains(*id))
        .map(|id| load_one(router, &scope, cycle.sync, id.clone()));
    join_all(loads).await.into_iter().collect()
}

async fn load_one(router: &Router, scope: &Scope, sync: bool, id: MatchId) -> Result<(), RouteError> {
    let tree = router.tree();
    let options = router.options();
    let Some(m) = router.get_match(&id) else { return Ok(()) };
    let Some(route) = tree.get(&m.route_id) else { return Ok(()) };

    if skipped(router, &m) {
        if options.is_server {
            run_assets(router, &tree, scope, &id);
        } else {
            // hydrated data counts once; later loads treat it as cached
            router.update_match(&id, |m| m.dehydrated = false);
        }
        return Ok(());
    }

    if let Some(in_flight) = m.handles.load.clone() {
        if m.status == MatchStatus::Success && !sync && !scope.preload {
            return Ok(());
        }
        in_flight.await;
        if let Some(err) = router.get_match(&id).and_then(|m| m.error).filter(RouteError::is_control_flow) {
            handle_control_flow(router, &tree, &scope.match_ids, &id, err, NotFoundOrigin::Loader)?;
        }
        return Ok(());
    }

    let age = Instant::now().saturating_duration_since(m.updated_at);
    let stale_age = if scope.preload {
        route
            .options
            .preload_stale_time
            .unwrap_or(options.default_preload_stale_time)
    } else {
        route.options.stale_time.unwrap_or(options.default_stale_time)
    };
    let should_reload = route
        .options
        .should_reload
        .as_ref()
        .map(|should_reload| should_reload.evaluate(&loader_ctx(router, scope, &m)));

    let (done, load_signal) = signal();
    router.update_match(&id, |m| {
        m.handles.load = Some(load_signal);
        m.preload = scope.preload;
    });

    let run_async = m.status == MatchStatus::Success
        && route.options.loader.is_some()
        && (m.invalid || should_reload.unwrap_or(age > stale_age));

    let mut result = Ok(());
    if scope.preload && route.options.preload == Some(false) {
        trace!(route = %route.id, "preload disabled for route");
    } else if run_async && !sync {
        debug!(route = %route.id, ?age, "refreshing stale match in background");
        let task_router = router.clone();
        let task_scope = scope.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let tree = task_router.tree();
            let outcome = run_loader(&task_router, &tree, &task_scope, &task_id).await;
            finish_load(&task_router, &task_id);
            drop(done);
            if let Err(RouteError::Redirect(redirect)) = outcome {
                let opts = NavigateOptions::from(redirect.as_ref());
                if let Err(e) = task_router.navigate(opts).await {
                    warn!(error = %e, "background redirect failed");
                }
            }
        });
        return Ok(());
    } else if m.status != MatchStatus::Success || (run_async && sync) {
        result = run_loader(router, &tree, scope, &id).await;
    } else {
        metrics::record_cache_hit(route.id.as_str());
        trace!(route = %route.id, ?age, "serving cached loader data");
        run_assets(router, &tree, scope, &id);
    }

    finish_load(router, &id);
    drop(done);
    result
}

fn finish_load(router: &Router, id: &MatchId) {
    router.update_match(id, |m| {
        m.handles.load = None;
        m.handles.clear_pending_timeout();
        m.invalid = false;
        m.dehydrated = false;
    });
}

fn loader_ctx(router: &Router, scope: &Scope, m: &Match) -> LoaderCtx {
    LoaderCtx {
        route_id: m.route_id.clone(),
        params: m.params.clone(),
        deps: m.loader_deps.clone(),
        context: m.context.clone(),
        location: scope.location.clone(),
        cause: if scope.preload { MatchCause::Preload } else { m.cause },
        preload: scope.preload,
        abort: m.abort.clone(),
        router: router.clone(),
    }
}

async fn await_min_pending(router: &Router, id: &MatchId) {
    let gate = router.get_match(id).and_then(|m| m.handles.min_pending.clone());
    if let Some(gate) = gate {
        gate.await;
        router.update_match(id, |m| m.handles.min_pending = None);
    }
}

async fn run_loader(router: &Router, tree: &RouteTree, scope: &Scope, id: &MatchId) -> Result<(), RouteError> {
    let Some(m) = router.get_match(id) else { return Ok(()) };
    let Some(route) = tree.get(&m.route_id) else { return Ok(()) };

    let outcome = async {
        route.load_lazy().await?;
        router.update_match(id, |m| m.is_fetching = Some(FetchPhase::Loader));
        let Some(loader) = route.options.loader.clone() else {
            return Ok(None);
        };
        let Some(m) = router.get_match(id) else { return Ok(None) };
        metrics::record_loader_invocation(route.id.as_str());
        trace!(route = %route.id, match_id = %id, "loader");
        loader(loader_ctx(router, scope, &m)).await.map(Some)
    }
    .await;

    match outcome {
        Ok(data) => {
            if let Some(data) = data {
                router.update_match(id, |m| m.loader_data = Some(data));
            }
            run_assets(router, tree, scope, id);
            await_min_pending(router, id).await;
            router.update_match(id, |m| {
                m.status = MatchStatus::Success;
                m.error = None;
                m.is_fetching = None;
                m.updated_at = Instant::now();
            });
            Ok(())
        }
        Err(err) => {
            await_min_pending(router, id).await;
            handle_control_flow(router, tree, &scope.match_ids, id, err.clone(), NotFoundOrigin::Loader)?;
            let mut err = err;
            if let Some(on_error) = &route.options.on_error {
                if let Err(replacement) = on_error(&err) {
                    handle_control_flow(
                        router,
                        tree,
                        &scope.match_ids,
                        id,
                        replacement.clone(),
                        NotFoundOrigin::Loader,
                    )?;
                    err = replacement;
                }
            }
            warn!(route = %route.id, error = %err, "loader failed");
            run_assets(router, tree, scope, id);
            router.update_match(id, |m| {
                m.status = MatchStatus::Error;
                m.error = Some(err);
                m.is_fetching = None;
                m.updated_at = Instant::now();
            });
            Ok(())
        }
    }
}

/// Run the head, scripts and headers producers for one match.
fn run_assets(router: &Router, tree: &RouteTree, scope: &Scope, id: &MatchId) {
    let Some(m) = router.get_match(id) else { return };
    let Some(route) = tree.get(&m.route_id) else { return };
    if route.head_fn().is_none() && route.scripts_fn().is_none() && route.headers_fn().is_none() {
        return;
    }
    let matches: Vec<Match> = scope.match_ids.iter().filter_map(|id| router.get_match(id)).collect();
    let ctx = AssetCtx {
        route_match: &m,
        matches: &matches,
        params: &m.params,
        loader_data: m.loader_data.as_ref(),
    };
    let head = route.head_fn().map(|f| f(&ctx));
    let scripts = route.scripts_fn().map(|f| f(&ctx));
    let headers = route.headers_fn().map(|f| f(&ctx));
    router.update_match(id, |m| {
        if let Some(head) = head {
            m.head = head;
        }
        if let Some(scripts) = scripts {
            m.scripts = scripts;
        }
        if let Some(headers) = headers {
            m.headers = headers;
        }
        m.static_data = route.static_data().clone();
    });
}
