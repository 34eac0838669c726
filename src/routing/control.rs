//! Control-flow values and the route error taxonomy.
//!
//! Hooks return `Result<_, RouteError>`. Redirects and not-founds travel in
//! the error channel but are never stored as generic failures: the load
//! pipeline matches on them and turns them into match statuses or a
//! navigation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::location::Search;
use crate::path::Params;

/// Id of the implicit root route.
pub const ROOT_ROUTE_ID: &str = "__root__";

/// Unique route identifier, e.g. `/posts/$postId` or `__root__`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub String);

impl RouteId {
    pub fn root() -> Self {
        Self(ROOT_ROUTE_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ROUTE_ID
    }
}

impl From<&str> for RouteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default redirect status (temporary, method preserving).
pub const DEFAULT_REDIRECT_STATUS: u16 = 307;

/// A request to navigate elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redirect {
    /// Route template or path to navigate to.
    pub to: Option<String>,
    /// Absolute href; wins over `to` when set.
    pub href: Option<String>,
    pub params: Option<Params>,
    pub search: Option<Search>,
    pub hash: Option<String>,
    pub replace: bool,
    pub status: u16,
    /// Leave the app entirely (full document load) instead of a client navigation.
    pub reload_document: bool,
    /// Set once the pipeline has resolved this redirect; a handled redirect is
    /// never resolved twice.
    pub redirect_handled: bool,
}

impl Redirect {
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            href: None,
            params: None,
            search: None,
            hash: None,
            replace: false,
            status: DEFAULT_REDIRECT_STATUS,
            reload_document: false,
            redirect_handled: false,
        }
    }

    pub fn href(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            to: None,
            ..Self::to("")
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_search(mut self, search: Search) -> Self {
        self.search = Some(search);
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

    /// Human-readable target for logs.
    pub fn target(&self) -> &str {
        self.href
            .as_deref()
            .or(self.to.as_deref())
            .unwrap_or("<current>")
    }
}

/// Which phase raised a not-found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundOrigin {
    BeforeLoad,
    Loader,
}

/// A request to render the not-found boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotFound {
    /// Route whose boundary should render it; defaults to the raising route.
    pub route_id: Option<RouteId>,
    pub data: Option<Value>,
    /// Raised for unmatched path segments rather than by a hook.
    pub global: bool,
    pub origin: Option<NotFoundOrigin>,
}

impl NotFound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_route(route_id: impl Into<RouteId>) -> Self {
        Self {
            route_id: Some(route_id.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<String> for RouteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Everything a route hook or the matcher can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// A route's search validator rejected the input.
    #[error("invalid search params for route {route_id}: {message}")]
    SearchValidation { route_id: RouteId, message: String },

    /// A route's param parser rejected the captured params.
    #[error("invalid path params for route {route_id}: {message}")]
    ParamParse { route_id: RouteId, message: String },

    #[error("redirect to {}", .0.target())]
    Redirect(Box<Redirect>),

    #[error("not found")]
    NotFound(Box<NotFound>),

    /// Any other hook failure.
    #[error("{0}")]
    Failed(String),

    /// The match was cancelled by a newer navigation.
    #[error("load cancelled")]
    Cancelled,
}

impl RouteError {
    pub fn failed(message: impl fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Redirects and not-founds steer navigation instead of failing it.
    pub fn is_control_flow(&self) -> bool {
        self.is_redirect() || self.is_not_found()
    }

    /// Short stable label for logs and dehydrated state.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SearchValidation { .. } => "search_validation",
            Self::ParamParse { .. } => "param_parse",
            Self::Redirect(_) => "redirect",
            Self::NotFound(_) => "not_found",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<Redirect> for RouteError {
    fn from(r: Redirect) -> Self {
        Self::Redirect(Box::new(r))
    }
}

impl From<NotFound> for RouteError {
    fn from(n: NotFound) -> Self {
        Self::NotFound(Box::new(n))
    }
}

/// Shorthand for `Err(Redirect::to(to).into())` in hooks.
pub fn redirect(to: impl Into<String>) -> RouteError {
    Redirect::to(to).into()
}

/// Shorthand for a not-found raised by the current route.
pub fn not_found() -> RouteError {
    NotFound::new().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(redirect("/login").to_string(), "redirect to /login");
        assert_eq!(not_found().to_string(), "not found");
        let err = RouteError::SearchValidation {
            route_id: RouteId::from("/posts"),
            message: "page must be a number".into(),
        };
        assert!(err.to_string().contains("/posts"));
        assert_eq!(err.kind(), "search_validation");
    }

    #[test]
    fn test_redirect_builder() {
        let r = Redirect::href("https://example.com").with_status(301).replace();
        assert_eq!(r.target(), "https://example.com");
        assert_eq!(r.status, 301);
        assert!(r.replace);
        assert!(r.to.is_none());
    }

    #[test]
    fn test_control_flow_classification() {
        assert!(redirect("/x").is_control_flow());
        assert!(not_found().is_control_flow());
        assert!(!RouteError::failed("boom").is_control_flow());
    }
}
