//! Match records.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::location::Search;
use crate::path::Params;
use crate::routing::{Context, RouteError, RouteId};

/// Route id interpolated with params, plus the serialized loader deps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    Success,
    Error,
    NotFound,
    Redirected,
}

/// Which hook is currently running for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    BeforeLoad,
    Loader,
}

/// Why a match is being loaded. Passed through to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCause {
    #[default]
    Enter,
    Stay,
    Preload,
}

/// Output of a route's head producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadContent {
    pub meta: Vec<Value>,
    pub links: Vec<Value>,
    pub scripts: Vec<Value>,
}

/// Completion signal shared by every waiter.
pub type Signal = Shared<BoxFuture<'static, ()>>;

/// A signal plus the sender that fires it. Dropping the sender also fires it,
/// so no waiter is left hanging.
pub(crate) fn signal() -> (oneshot::Sender<()>, Signal) {
    let (tx, rx) = oneshot::channel::<()>();
    let fut = async move {
        let _ = rx.await;
    };
    (tx, fut.boxed().shared())
}

/// In-flight settlement handles. Not part of the match's data.
#[derive(Clone, Default)]
pub(crate) struct MatchHandles {
    pub(crate) load: Option<Signal>,
    pub(crate) before_load: Option<Signal>,
    pub(crate) min_pending: Option<Signal>,
    pub(crate) pending_timeout: Option<Arc<AbortHandle>>,
}

impl MatchHandles {
    pub(crate) fn clear_pending_timeout(&mut self) {
        if let Some(handle) = self.pending_timeout.take() {
            handle.abort();
        }
    }
}

/// One resolved (route, params, loader deps) combination.
#[derive(Clone)]
pub struct Match {
    pub id: MatchId,
    pub route_id: RouteId,
    pub full_path: String,
    /// Depth in the match chain, root = 0.
    pub index: usize,
    /// Concrete pathname of this match.
    pub pathname: String,
    pub params: Params,
    pub(crate) strict_params: Params,
    pub search: Search,
    pub(crate) strict_search: Search,
    pub loader_deps: Value,
    pub status: MatchStatus,
    pub error: Option<RouteError>,
    pub params_error: Option<RouteError>,
    pub search_error: Option<RouteError>,
    pub loader_data: Option<Value>,
    /// Parent context + own route context + own before-load context.
    pub context: Context,
    pub(crate) route_context: Context,
    pub(crate) before_load_context: Context,
    pub is_fetching: Option<FetchPhase>,
    pub invalid: bool,
    pub updated_at: Instant,
    pub fetch_count: u32,
    pub cause: MatchCause,
    pub preload: bool,
    /// Unmatched path remainder renders this match's not-found boundary.
    pub global_not_found: bool,
    /// Restored from server state; the load pipeline leaves it alone once.
    pub dehydrated: bool,
    pub ssr: bool,
    pub head: HeadContent,
    pub scripts: Vec<Value>,
    pub headers: BTreeMap<String, String>,
    pub static_data: Search,
    pub abort: CancellationToken,
    pub(crate) handles: MatchHandles,
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("id", &self.id)
            .field("route_id", &self.route_id)
            .field("status", &self.status)
            .field("params", &self.params)
            .field("loader_data", &self.loader_data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("invalid", &self.invalid)
            .finish_non_exhaustive()
    }
}

impl Match {
    pub(crate) fn new(id: MatchId, route_id: RouteId, full_path: String, index: usize) -> Self {
        Self {
            id,
            route_id,
            full_path,
            index,
            pathname: String::new(),
            params: Params::new(),
            strict_params: Params::new(),
            search: Search::new(),
            strict_search: Search::new(),
            loader_deps: Value::Null,
            status: MatchStatus::Pending,
            error: None,
            params_error: None,
            search_error: None,
            loader_data: None,
            context: Context::new(),
            route_context: Context::new(),
            before_load_context: Context::new(),
            is_fetching: None,
            invalid: false,
            updated_at: Instant::now(),
            fetch_count: 0,
            cause: MatchCause::Enter,
            preload: false,
            global_not_found: false,
            dehydrated: false,
            ssr: true,
            head: HeadContent::default(),
            scripts: Vec::new(),
            headers: BTreeMap::new(),
            static_data: Search::new(),
            abort: CancellationToken::new(),
            handles: MatchHandles::default(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != MatchStatus::Pending
    }

    /// A loader or before-load is still running for this match.
    pub fn is_loading(&self) -> bool {
        self.handles.load.is_some() || self.handles.before_load.is_some()
    }

    pub(crate) fn rebuild_context(&mut self, parent: &Context) {
        let mut context = parent.clone();
        context.extend(self.route_context.clone());
        context.extend(self.before_load_context.clone());
        self.context = context;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_merge_order() {
        let mut m = Match::new(MatchId::from("/a"), RouteId::from("/a"), "/a".into(), 1);
        m.route_context.insert("who".into(), json!("route"));
        m.before_load_context.insert("who".into(), json!("before_load"));
        let mut parent = Context::new();
        parent.insert("who".into(), json!("parent"));
        parent.insert("user".into(), json!("ann"));
        m.rebuild_context(&parent);
        assert_eq!(m.context["who"], json!("before_load"));
        assert_eq!(m.context["user"], json!("ann"));
    }

    #[tokio::test]
    async fn test_signal_fires_on_drop() {
        let (tx, sig) = signal();
        let waiter = tokio::spawn(sig.clone());
        drop(tx);
        waiter.await.unwrap();
        // a fired signal resolves immediately for late waiters
        sig.await;
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(MatchStatus::NotFound).unwrap(), json!("not_found"));
    }
}
