//! Shared fixtures for integration tests.

#![allow(dead_code)]

use route_engine::{MemoryHistory, Route, RouteTree, Router, RouterOptions};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts calls made by loaders and hooks.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Router over an in-memory history positioned at `href`.
pub fn router_at(href: &str, root: Route) -> Router {
    router_with(href, root, RouterOptions::default())
}

pub fn router_with(href: &str, root: Route, options: RouterOptions) -> Router {
    Router::with_history(
        RouteTree::new(root).expect("valid route tree"),
        options,
        Arc::new(MemoryHistory::new(href)),
    )
}

/// A route whose loader echoes its params and bumps `calls`.
pub fn counted(path: &str, calls: &Calls) -> Route {
    let calls = calls.clone();
    Route::new(path).loader(move |ctx| {
        calls.hit();
        async move { Ok(json!({ "params": ctx.params })) }
    })
}

/// Like [`counted`], but the loader takes `delay` to answer.
pub fn slow(path: &str, calls: &Calls, delay: Duration) -> Route {
    let calls = calls.clone();
    Route::new(path).loader(move |ctx| {
        calls.hit();
        async move {
            tokio::time::sleep(delay).await;
            Ok(json!({ "params": ctx.params }))
        }
    })
}

/// Let spawned background work run to completion.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
