//! Manifest-driven rendering through the HTTP handler.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use route_engine::config::{build_tree, parse_config};
use route_engine::server::{build_app, hydrate, AppState, DehydratedState};
use route_engine::{MemoryHistory, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const MANIFEST: &str = r#"
[router]
basepath = "/app"

[[routes]]
path = "docs"
data = { section = "docs" }

[[routes.children]]
path = "$page"
data = { title = "page" }

[[routes]]
path = "legacy"
redirect = { to = "/docs/intro", status = 301 }

[[routes]]
path = "search"
validate_search = ["q"]

[[routes]]
path = "gone"
not_found = true
"#;

fn app_state() -> AppState {
    let config = parse_config(MANIFEST).unwrap();
    let tree = build_tree(&config.routes).unwrap();
    AppState::new(tree, config.router.to_options())
}

async fn get(state: &AppState, uri: &str) -> axum::response::Response {
    build_app(state.clone(), Duration::from_secs(5))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_manifest_routes_render() {
    let state = app_state();

    let response = get(&state, "/app/docs/intro").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let snapshot: DehydratedState = serde_json::from_slice(&body).unwrap();
    assert_eq!(snapshot.status_code, 200);
    assert_eq!(snapshot.matches.len(), 3);
    assert_eq!(snapshot.matches[1].loader_data, Some(json!({ "section": "docs" })));
    assert_eq!(snapshot.matches[2].loader_data, Some(json!({ "title": "page" })));
}

#[tokio::test]
async fn test_manifest_redirect_keeps_status_and_basepath() {
    let response = get(&app_state(), "/app/legacy").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/app/docs/intro");
}

#[tokio::test]
async fn test_manifest_failures_map_to_statuses() {
    let state = app_state();
    assert_eq!(get(&state, "/app/gone").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&state, "/app/missing/page").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&state, "/app/search").await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(get(&state, "/app/search?q=rust").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_swapped_tree_serves_new_routes() {
    let state = app_state();
    assert_eq!(get(&state, "/app/blog").await.status(), StatusCode::NOT_FOUND);

    let reloaded = parse_config(
        r#"
        [[routes]]
        path = "blog"
        data = []
        "#,
    )
    .unwrap();
    state.swap_tree(build_tree(&reloaded.routes).unwrap());
    assert_eq!(get(&state, "/app/blog").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rendered_state_hydrates_a_client_router() {
    let state = app_state();
    let body = to_bytes(get(&state, "/app/docs/setup").await.into_body(), usize::MAX)
        .await
        .unwrap();
    let snapshot: DehydratedState = serde_json::from_slice(&body).unwrap();

    let mut options = state.options.clone();
    options.is_server = false;
    let client = Router::with_history(
        build_tree(&parse_config(MANIFEST).unwrap().routes).unwrap(),
        options,
        Arc::new(MemoryHistory::new("/app/docs/setup")),
    );
    hydrate(&client, &snapshot).unwrap();

    let state = client.state();
    assert_eq!(state.matches.len(), 3);
    assert!(state.matches.iter().all(|m| m.dehydrated));
    assert_eq!(state.matches[2].params.get("page").map(String::as_str), Some("setup"));
}
