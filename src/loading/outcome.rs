//! Result of a load cycle.

use crate::routing::{NotFound, Redirect, RouteError};

/// How a load cycle ended. Every redirect, not-found or failure surfaces
/// here; nothing is dropped on the way to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Matches committed.
    Ready,
    /// A hook redirected. On the client the redirect has already been followed.
    Redirected(Box<Redirect>),
    NotFound(Box<NotFound>),
    Failed(RouteError),
    /// Leave the app: the host must load this URL as a new document.
    ExternalRedirect(String),
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Redirected(_) => "redirected",
            Self::NotFound(_) => "not_found",
            Self::Failed(_) => "failed",
            Self::ExternalRedirect(_) => "external_redirect",
        }
    }
}

impl From<RouteError> for LoadOutcome {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::Redirect(r) => Self::Redirected(r),
            RouteError::NotFound(n) => Self::NotFound(n),
            other => Self::Failed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{not_found, redirect};

    #[test]
    fn test_from_route_error() {
        assert_eq!(LoadOutcome::from(redirect("/x")).label(), "redirected");
        assert_eq!(LoadOutcome::from(not_found()).label(), "not_found");
        assert_eq!(LoadOutcome::from(RouteError::failed("boom")).label(), "failed");
        assert!(LoadOutcome::Ready.is_ready());
    }
}
