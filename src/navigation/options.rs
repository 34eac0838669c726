//! Router construction options and navigation destinations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::location::{
    default_parse_search, default_stringify_search, Location, Rewrite, Search, SearchParser,
    SearchStringifier, SearchUpdate,
};
use crate::path::{Params, TrailingSlash};
use crate::routing::{Context, Redirect};

pub const DEFAULT_PENDING_MS: Duration = Duration::from_millis(1000);
pub const DEFAULT_PENDING_MIN_MS: Duration = Duration::from_millis(500);
pub const DEFAULT_PRELOAD_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(30 * 60);

/// Where an unmatched path remainder renders its not-found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundMode {
    /// Deepest matched route that has children.
    #[default]
    Fuzzy,
    Root,
}

/// Show `to` in the address bar whenever the real location matches `from`.
#[derive(Debug, Clone, Default)]
pub struct RouteMask {
    pub from: String,
    pub to: String,
    pub search: SearchUpdate,
    pub unmask_on_reload: bool,
}

#[derive(Clone)]
pub struct RouterOptions {
    pub default_pending_ms: Duration,
    pub default_pending_min_ms: Duration,
    pub default_stale_time: Duration,
    pub default_preload_stale_time: Duration,
    pub default_gc_time: Duration,
    pub default_preload_gc_time: Duration,
    /// Every route gets a pending boundary unless it declares otherwise.
    pub default_pending_boundary: bool,
    pub not_found_mode: NotFoundMode,
    pub case_sensitive: bool,
    pub trailing_slash: TrailingSlash,
    pub basepath: String,
    pub rewrite: Rewrite,
    pub parse_search: SearchParser,
    pub stringify_search: SearchStringifier,
    /// Root context seed.
    pub context: Context,
    pub route_masks: Vec<RouteMask>,
    pub unmask_on_reload: bool,
    /// Server rendering: redirects are reported instead of followed.
    pub is_server: bool,
    /// Capacity of each segment parse cache.
    pub path_cache_capacity: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            default_pending_ms: DEFAULT_PENDING_MS,
            default_pending_min_ms: DEFAULT_PENDING_MIN_MS,
            default_stale_time: Duration::ZERO,
            default_preload_stale_time: DEFAULT_PRELOAD_STALE_TIME,
            default_gc_time: DEFAULT_GC_TIME,
            default_preload_gc_time: DEFAULT_GC_TIME,
            default_pending_boundary: false,
            not_found_mode: NotFoundMode::Fuzzy,
            case_sensitive: false,
            trailing_slash: TrailingSlash::Never,
            basepath: "/".to_string(),
            rewrite: Rewrite::default(),
            parse_search: Arc::new(default_parse_search),
            stringify_search: Arc::new(default_stringify_search),
            context: Context::new(),
            route_masks: Vec::new(),
            unmask_on_reload: false,
            is_server: false,
            path_cache_capacity: 1000,
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("default_stale_time", &self.default_stale_time)
            .field("default_gc_time", &self.default_gc_time)
            .field("not_found_mode", &self.not_found_mode)
            .field("case_sensitive", &self.case_sensitive)
            .field("trailing_slash", &self.trailing_slash)
            .field("basepath", &self.basepath)
            .field("is_server", &self.is_server)
            .finish_non_exhaustive()
    }
}

/// How the destination params derive from the current ones.
#[derive(Clone, Default)]
pub enum ParamsUpdate {
    /// Reuse the current params.
    #[default]
    Keep,
    /// Merge over the current params.
    Merge(Params),
    Update(Arc<dyn Fn(&Params) -> Params + Send + Sync>),
}

impl ParamsUpdate {
    pub fn apply(&self, current: &Params) -> Params {
        let mut next = current.clone();
        match self {
            Self::Keep => {}
            Self::Merge(params) => next.extend(params.clone()),
            Self::Update(f) => next.extend(f(current)),
        }
        next
    }
}

impl fmt::Debug for ParamsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("Keep"),
            Self::Merge(p) => f.debug_tuple("Merge").field(p).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum HashUpdate {
    #[default]
    Clear,
    Keep,
    Set(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum StateUpdate {
    #[default]
    Clear,
    Keep,
    Set(Search),
}

/// A navigation destination.
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    /// Target path or route template, resolved against `from`.
    pub to: Option<String>,
    /// Template of a current match to resolve `to` against.
    pub from: Option<String>,
    pub params: ParamsUpdate,
    pub search: SearchUpdate,
    pub hash: HashUpdate,
    pub state: StateUpdate,
    /// Show this destination in the address bar instead.
    pub mask: Option<Box<NavigateOptions>>,
    pub unmask_on_reload: Option<bool>,
    pub replace: bool,
    /// Leave the app (full document load).
    pub reload_document: bool,
    /// Absolute or app-relative href; overrides `to`, `search` and `hash`.
    pub href: Option<String>,
    /// Keep `$param` placeholders in the built path.
    pub leave_params: bool,
    pub(crate) from_location: Option<Location>,
    pub(crate) include_validate_search: bool,
}

impl NavigateOptions {
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Self::default()
        }
    }

    pub fn href(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn from_path(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = match self.params {
            ParamsUpdate::Merge(p) => p,
            _ => Params::new(),
        };
        params.insert(key.into(), value.into());
        self.params = ParamsUpdate::Merge(params);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = ParamsUpdate::Merge(params);
        self
    }

    pub fn search(mut self, search: Search) -> Self {
        self.search = SearchUpdate::Replace(search);
        self
    }

    pub fn search_update(mut self, update: SearchUpdate) -> Self {
        self.search = update;
        self
    }

    pub fn keep_search(mut self) -> Self {
        self.search = SearchUpdate::Keep;
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = HashUpdate::Set(hash.into());
        self
    }

    pub fn state(mut self, state: Search) -> Self {
        self.state = StateUpdate::Set(state);
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn reload_document(mut self) -> Self {
        self.reload_document = true;
        self
    }

    pub fn mask(mut self, mask: NavigateOptions) -> Self {
        self.mask = Some(Box::new(mask));
        self
    }

    pub fn unmask_on_reload(mut self, unmask: bool) -> Self {
        self.unmask_on_reload = Some(unmask);
        self
    }

    pub(crate) fn from_location(mut self, location: Location) -> Self {
        self.from_location = Some(location);
        self
    }
}

impl From<&Redirect> for NavigateOptions {
    fn from(r: &Redirect) -> Self {
        let mut opts = Self {
            to: r.to.clone(),
            href: r.href.clone(),
            replace: r.replace,
            reload_document: r.reload_document,
            ..Self::default()
        };
        if let Some(params) = &r.params {
            opts.params = ParamsUpdate::Merge(params.clone());
        }
        if let Some(search) = &r.search {
            opts.search = SearchUpdate::Replace(search.clone());
        }
        if let Some(hash) = &r.hash {
            opts.hash = HashUpdate::Set(hash.clone());
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_update() {
        let mut current = Params::new();
        current.insert("a".into(), "1".into());
        assert_eq!(ParamsUpdate::Keep.apply(&current), current);
        let mut extra = Params::new();
        extra.insert("b".into(), "2".into());
        let merged = ParamsUpdate::Merge(extra).apply(&current);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_param_builder_accumulates() {
        let opts = NavigateOptions::to("/a/$x/$y").param("x", "1").param("y", "2");
        match opts.params {
            ParamsUpdate::Merge(p) => assert_eq!(p.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_from_redirect() {
        let mut search = Search::new();
        search.insert("next".into(), json!("/a"));
        let r = Redirect::to("/login").with_search(search.clone()).replace();
        let opts = NavigateOptions::from(&r);
        assert_eq!(opts.to.as_deref(), Some("/login"));
        assert!(opts.replace);
        assert!(matches!(opts.search, SearchUpdate::Replace(s) if s == search));
    }

    #[test]
    fn test_defaults() {
        let o = RouterOptions::default();
        assert_eq!(o.default_stale_time, Duration::ZERO);
        assert_eq!(o.default_preload_stale_time, Duration::from_secs(30));
        assert_eq!(o.not_found_mode, NotFoundMode::Fuzzy);
    }
}
