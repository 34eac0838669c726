//! HTTP rendering endpoint.
//!
//! # Responsibilities
//! - Create Axum Router with the render handler
//! - Wire up middleware (tracing, request timeout)
//! - Run one server-side load per request over a fresh in-memory history
//! - Translate the outcome into a redirect, 404, 500 or 200 response
//! - Serve until the shutdown signal fires

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::lifecycle::Shutdown;
use crate::loading::LoadOutcome;
use crate::location::MemoryHistory;
use crate::navigation::{Router as RouteRouter, RouterOptions};
use crate::observability::metrics;
use crate::routing::RouteTree;
use crate::server::dehydrate::dehydrate;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale when the route manifest reloads.
    pub tree: Arc<ArcSwap<RouteTree>>,
    pub options: RouterOptions,
}

impl AppState {
    pub fn new(tree: RouteTree, mut options: RouterOptions) -> Self {
        options.is_server = true;
        Self {
            tree: Arc::new(ArcSwap::from_pointee(tree)),
            options,
        }
    }

    pub fn swap_tree(&self, tree: RouteTree) {
        self.tree.store(Arc::new(tree));
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(render_handler))
        .route("/{*path}", get(render_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until `shutdown` triggers.
pub async fn serve(listener: TcpListener, app: Router, shutdown: Shutdown) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "render server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("render server stopped");
    Ok(())
}

/// Load the requested location and answer with its dehydrated state.
async fn render_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let start = Instant::now();
    let href = uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());

    let router = RouteRouter::from_shared(
        state.tree.load_full(),
        state.options.clone(),
        Arc::new(MemoryHistory::new(&href)),
    );
    let outcome = router.load().await;
    let snapshot = dehydrate(&router);
    let status = StatusCode::from_u16(snapshot.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    tracing::debug!(
        href = %href,
        outcome = outcome.label(),
        status = status.as_u16(),
        "render finished"
    );
    metrics::record_render(status.as_u16(), start);

    let redirect_status = if status.is_redirection() {
        status
    } else {
        StatusCode::TEMPORARY_REDIRECT
    };
    match outcome {
        LoadOutcome::Redirected(redirect) => {
            let target = redirect
                .href
                .as_deref()
                .or(redirect.to.as_deref())
                .unwrap_or("/");
            let location = router.public_href(target);
            (redirect_status, [(header::LOCATION, location)]).into_response()
        }
        LoadOutcome::ExternalRedirect(href) => (redirect_status, [(header::LOCATION, href)]).into_response(),
        _ => (status, Json(snapshot)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{not_found, redirect, Context, Route};
    use crate::server::dehydrate::DehydratedState;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        let root = Route::root().children([
            Route::new("posts/$id").loader(|ctx| async move {
                if ctx.params["id"] == "0" {
                    return Err(not_found());
                }
                Ok(json!({ "id": ctx.params["id"] }))
            }),
            Route::new("old").before_load(|_| async { Err::<Context, _>(redirect("/posts/1")) }),
            Route::new("broken").loader(|_| async { Err(crate::routing::RouteError::failed("db down")) }),
        ]);
        build_app(
            AppState::new(RouteTree::new(root).unwrap(), RouterOptions::default()),
            Duration::from_secs(5),
        )
    }

    async fn get(uri: &str) -> Response {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_renders_dehydrated_state() {
        let response = get("/posts/5").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let state: DehydratedState = serde_json::from_slice(&body).unwrap();
        assert_eq!(state.href, "/posts/5");
        assert_eq!(state.matches[1].loader_data, Some(json!({"id": "5"})));
    }

    #[tokio::test]
    async fn test_redirect_response() {
        let response = get("/old").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/posts/1");
    }

    #[tokio::test]
    async fn test_not_found_and_failure_statuses() {
        assert_eq!(get("/posts/0").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/nowhere").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/broken").await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
