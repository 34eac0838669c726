//! Route definitions and the hooks routes can declare.
//!
//! # Responsibilities
//! - `Route`: the user-facing builder, nested into a tree
//! - `RouteOptions`: the option bag (hooks, cache times, boundaries)
//! - `RouteDefinition`: a built node, owned by the route tree arena
//!
//! Hooks are `Arc<dyn Fn>` so options can be cloned into tasks. Async hooks
//! return boxed futures; the builder methods accept plain `async` closures.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::location::{Location, Search, SearchMiddleware};
use crate::matching::{HeadContent, Match, MatchCause};
use crate::navigation::Router;
use crate::path::Params;
use crate::routing::control::{RouteError, RouteId};

/// Accumulated parent-to-child context.
pub type Context = serde_json::Map<String, Value>;

pub type HookFuture<T> = BoxFuture<'static, Result<T, RouteError>>;

/// Arguments passed to a `before_load` hook.
#[derive(Clone)]
pub struct BeforeLoadCtx {
    pub route_id: RouteId,
    pub search: Search,
    pub params: Params,
    pub context: Context,
    pub location: Location,
    pub cause: MatchCause,
    pub preload: bool,
    pub abort: CancellationToken,
    /// For `navigate` / `build_location` from inside the hook.
    pub router: Router,
}

/// Arguments passed to a `loader` hook (and `should_reload`).
#[derive(Clone)]
pub struct LoaderCtx {
    pub route_id: RouteId,
    pub params: Params,
    pub deps: Value,
    pub context: Context,
    pub location: Location,
    pub cause: MatchCause,
    pub preload: bool,
    pub abort: CancellationToken,
    pub router: Router,
}

/// Arguments passed to a synchronous `context` builder.
pub struct RouteContextCtx<'a> {
    pub params: &'a Params,
    pub search: &'a Search,
    pub deps: &'a Value,
    /// Context accumulated from the parent match.
    pub context: &'a Context,
    pub location: &'a Location,
    pub cause: MatchCause,
    pub preload: bool,
}

/// Arguments passed to head/scripts/headers producers.
pub struct AssetCtx<'a> {
    pub route_match: &'a Match,
    pub matches: &'a [Match],
    pub params: &'a Params,
    pub loader_data: Option<&'a Value>,
}

pub type LoaderFn = Arc<dyn Fn(LoaderCtx) -> HookFuture<Value> + Send + Sync>;
pub type BeforeLoadFn = Arc<dyn Fn(BeforeLoadCtx) -> HookFuture<Context> + Send + Sync>;
pub type LazyFn = Arc<dyn Fn() -> HookFuture<LazyOptions> + Send + Sync>;
pub type ValidateSearchFn = Arc<dyn Fn(&Search) -> Result<Search, String> + Send + Sync>;
pub type ContextFn = Arc<dyn Fn(&RouteContextCtx<'_>) -> Context + Send + Sync>;
pub type LoaderDepsFn = Arc<dyn Fn(&Search) -> Value + Send + Sync>;
pub type ParseParamsFn = Arc<dyn Fn(&Params) -> Result<Params, String> + Send + Sync>;
pub type StringifyParamsFn = Arc<dyn Fn(&Params) -> Params + Send + Sync>;
/// Returning `Err` replaces the original error (e.g. with a redirect).
pub type OnErrorFn = Arc<dyn Fn(&RouteError) -> Result<(), RouteError> + Send + Sync>;
pub type MatchHookFn = Arc<dyn Fn(&Match) + Send + Sync>;
pub type HeadFn = Arc<dyn Fn(&AssetCtx<'_>) -> HeadContent + Send + Sync>;
pub type ScriptsFn = Arc<dyn Fn(&AssetCtx<'_>) -> Vec<Value> + Send + Sync>;
pub type HeadersFn = Arc<dyn Fn(&AssetCtx<'_>) -> BTreeMap<String, String> + Send + Sync>;
pub type SearchFilter = Arc<dyn Fn(Search) -> Search + Send + Sync>;

#[derive(Clone)]
pub enum ShouldReload {
    Always(bool),
    With(Arc<dyn Fn(&LoaderCtx) -> bool + Send + Sync>),
}

impl ShouldReload {
    pub fn evaluate(&self, ctx: &LoaderCtx) -> bool {
        match self {
            Self::Always(v) => *v,
            Self::With(f) => f(ctx),
        }
    }
}

/// Options a `lazy` hook can fill in on first use.
#[derive(Clone, Default)]
pub struct LazyOptions {
    pub head: Option<HeadFn>,
    pub scripts: Option<ScriptsFn>,
    pub headers: Option<HeadersFn>,
    pub static_data: Option<Search>,
    pub pending_boundary: Option<bool>,
    pub not_found_boundary: Option<bool>,
}

/// Everything a route can declare.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub loader: Option<LoaderFn>,
    pub before_load: Option<BeforeLoadFn>,
    pub validate_search: Option<ValidateSearchFn>,
    pub context: Option<ContextFn>,
    pub loader_deps: Option<LoaderDepsFn>,
    pub should_reload: Option<ShouldReload>,
    pub parse_params: Option<ParseParamsFn>,
    pub stringify_params: Option<StringifyParamsFn>,
    pub on_error: Option<OnErrorFn>,
    pub on_enter: Option<MatchHookFn>,
    pub on_stay: Option<MatchHookFn>,
    pub on_leave: Option<MatchHookFn>,
    pub head: Option<HeadFn>,
    pub scripts: Option<ScriptsFn>,
    pub headers: Option<HeadersFn>,
    pub lazy: Option<LazyFn>,
    pub search_middlewares: Vec<SearchMiddleware>,
    pub pre_search_filters: Vec<SearchFilter>,
    pub post_search_filters: Vec<SearchFilter>,
    pub stale_time: Option<Duration>,
    pub preload_stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
    pub preload_gc_time: Option<Duration>,
    pub pending_ms: Option<Duration>,
    pub pending_min_ms: Option<Duration>,
    /// Route renders something while pending (enables the pending timer).
    pub pending_boundary: bool,
    /// Route can render a not-found; not-founds bubble up to it.
    pub not_found_boundary: bool,
    /// `Some(false)` opts out of preloading.
    pub preload: Option<bool>,
    /// `Some(false)` skips before-load and loader during server rendering.
    pub ssr: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub static_data: Search,
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("loader", &self.loader.is_some())
            .field("before_load", &self.before_load.is_some())
            .field("validate_search", &self.validate_search.is_some())
            .field("lazy", &self.lazy.is_some())
            .field("stale_time", &self.stale_time)
            .field("gc_time", &self.gc_time)
            .field("preload", &self.preload)
            .field("ssr", &self.ssr)
            .finish_non_exhaustive()
    }
}

/// User-facing route builder.
///
/// ```
/// use route_engine::routing::Route;
/// use serde_json::json;
///
/// let tree = Route::root().children([
///     Route::new("/"),
///     Route::new("posts").children([
///         Route::new("$postId").loader(|ctx| async move { Ok(json!({ "id": ctx.params["postId"] })) }),
///     ]),
/// ]);
/// # let _ = tree;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub(crate) path: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) is_root: bool,
    pub(crate) options: RouteOptions,
    pub(crate) children: Vec<Route>,
}

impl Route {
    pub fn root() -> Self {
        Self {
            is_root: true,
            ..Self::default()
        }
    }

    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A route with no path segment of its own (layout route).
    pub fn pathless(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Override the id derived from the path.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn child(mut self, route: Route) -> Self {
        self.children.push(route);
        self
    }

    pub fn children(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.children.extend(routes);
        self
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RouteOptions {
        &mut self.options
    }

    pub fn loader<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LoaderCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RouteError>> + Send + 'static,
    {
        self.options.loader = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    pub fn before_load<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BeforeLoadCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, RouteError>> + Send + 'static,
    {
        self.options.before_load = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    pub fn lazy<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LazyOptions, RouteError>> + Send + 'static,
    {
        self.options.lazy = Some(Arc::new(move || Box::pin(f())));
        self
    }

    pub fn validate_search<F>(mut self, f: F) -> Self
    where
        F: Fn(&Search) -> Result<Search, String> + Send + Sync + 'static,
    {
        self.options.validate_search = Some(Arc::new(f));
        self
    }

    pub fn context<F>(mut self, f: F) -> Self
    where
        F: Fn(&RouteContextCtx<'_>) -> Context + Send + Sync + 'static,
    {
        self.options.context = Some(Arc::new(f));
        self
    }

    pub fn loader_deps<F>(mut self, f: F) -> Self
    where
        F: Fn(&Search) -> Value + Send + Sync + 'static,
    {
        self.options.loader_deps = Some(Arc::new(f));
        self
    }

    pub fn should_reload(mut self, should_reload: ShouldReload) -> Self {
        self.options.should_reload = Some(should_reload);
        self
    }

    pub fn params<P, S>(mut self, parse: P, stringify: S) -> Self
    where
        P: Fn(&Params) -> Result<Params, String> + Send + Sync + 'static,
        S: Fn(&Params) -> Params + Send + Sync + 'static,
    {
        self.options.parse_params = Some(Arc::new(parse));
        self.options.stringify_params = Some(Arc::new(stringify));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&RouteError) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.options.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_enter<F: Fn(&Match) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.options.on_enter = Some(Arc::new(f));
        self
    }

    pub fn on_stay<F: Fn(&Match) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.options.on_stay = Some(Arc::new(f));
        self
    }

    pub fn on_leave<F: Fn(&Match) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.options.on_leave = Some(Arc::new(f));
        self
    }

    pub fn head<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssetCtx<'_>) -> HeadContent + Send + Sync + 'static,
    {
        self.options.head = Some(Arc::new(f));
        self
    }

    pub fn scripts<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssetCtx<'_>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.options.scripts = Some(Arc::new(f));
        self
    }

    pub fn headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssetCtx<'_>) -> BTreeMap<String, String> + Send + Sync + 'static,
    {
        self.options.headers = Some(Arc::new(f));
        self
    }

    pub fn search_middleware(mut self, middleware: SearchMiddleware) -> Self {
        self.options.search_middlewares.push(middleware);
        self
    }

    pub fn pre_search_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(Search) -> Search + Send + Sync + 'static,
    {
        self.options.pre_search_filters.push(Arc::new(f));
        self
    }

    pub fn post_search_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(Search) -> Search + Send + Sync + 'static,
    {
        self.options.post_search_filters.push(Arc::new(f));
        self
    }

    pub fn stale_time(mut self, d: Duration) -> Self {
        self.options.stale_time = Some(d);
        self
    }

    pub fn preload_stale_time(mut self, d: Duration) -> Self {
        self.options.preload_stale_time = Some(d);
        self
    }

    pub fn gc_time(mut self, d: Duration) -> Self {
        self.options.gc_time = Some(d);
        self
    }

    pub fn preload_gc_time(mut self, d: Duration) -> Self {
        self.options.preload_gc_time = Some(d);
        self
    }

    pub fn pending(mut self, pending_ms: Duration, pending_min_ms: Duration) -> Self {
        self.options.pending_boundary = true;
        self.options.pending_ms = Some(pending_ms);
        self.options.pending_min_ms = Some(pending_min_ms);
        self
    }

    pub fn not_found_boundary(mut self) -> Self {
        self.options.not_found_boundary = true;
        self
    }

    pub fn preload(mut self, enabled: bool) -> Self {
        self.options.preload = Some(enabled);
        self
    }

    pub fn ssr(mut self, enabled: bool) -> Self {
        self.options.ssr = Some(enabled);
        self
    }

    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.options.case_sensitive = Some(enabled);
        self
    }

    pub fn static_data(mut self, data: Search) -> Self {
        self.options.static_data = data;
        self
    }
}

/// A built route node. Lives in the route tree arena.
pub struct RouteDefinition {
    pub id: RouteId,
    /// Path as declared (leading slash trimmed), `None` for root and pathless routes.
    pub path: Option<String>,
    pub full_path: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Declaration order (depth-first).
    pub index: usize,
    /// Position in the ranked list, when the route is rankable.
    pub rank: Option<usize>,
    pub options: RouteOptions,
    lazy: OnceCell<LazyOptions>,
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("full_path", &self.full_path)
            .field("rank", &self.rank)
            .finish_non_exhaustive()
    }
}

impl RouteDefinition {
    pub(crate) fn new(
        id: RouteId,
        path: Option<String>,
        full_path: String,
        parent: Option<usize>,
        index: usize,
        options: RouteOptions,
    ) -> Self {
        Self {
            id,
            path,
            full_path,
            parent,
            children: Vec::new(),
            index,
            rank: None,
            options,
            lazy: OnceCell::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether a fresh match for this route starts out pending.
    pub fn needs_loading(&self) -> bool {
        self.options.loader.is_some()
            || self.options.before_load.is_some()
            || self.options.lazy.is_some()
    }

    /// Run the `lazy` hook once; later calls reuse its result.
    pub async fn load_lazy(&self) -> Result<(), RouteError> {
        if let Some(lazy) = &self.options.lazy {
            self.lazy.get_or_try_init(|| lazy()).await?;
        }
        Ok(())
    }

    fn lazy_options(&self) -> Option<&LazyOptions> {
        self.lazy.get()
    }

    pub fn head_fn(&self) -> Option<&HeadFn> {
        self.lazy_options()
            .and_then(|l| l.head.as_ref())
            .or(self.options.head.as_ref())
    }

    pub fn scripts_fn(&self) -> Option<&ScriptsFn> {
        self.lazy_options()
            .and_then(|l| l.scripts.as_ref())
            .or(self.options.scripts.as_ref())
    }

    pub fn headers_fn(&self) -> Option<&HeadersFn> {
        self.lazy_options()
            .and_then(|l| l.headers.as_ref())
            .or(self.options.headers.as_ref())
    }

    pub fn static_data(&self) -> &Search {
        self.lazy_options()
            .and_then(|l| l.static_data.as_ref())
            .unwrap_or(&self.options.static_data)
    }

    pub fn has_pending_boundary(&self) -> bool {
        self.lazy_options()
            .and_then(|l| l.pending_boundary)
            .unwrap_or(self.options.pending_boundary)
    }

    pub fn has_not_found_boundary(&self) -> bool {
        self.lazy_options()
            .and_then(|l| l.not_found_boundary)
            .unwrap_or(self.options.not_found_boundary)
    }
}
