//! Navigation, redirects, not-found handling and history movement.

mod common;

use common::{counted, router_at, router_with, Calls};
use route_engine::location::History;
use route_engine::navigation::{InvalidateOptions, MatchRouteOptions, NotFoundMode};
use route_engine::routing::{Context, RouteId};
use route_engine::{redirect, LoadOutcome, Match, MatchStatus, NavigateOptions, Params, Route, RouterEvent, RouterOptions};
use std::sync::Arc;

fn blog(calls: &Calls) -> Route {
    Route::root().children([
        Route::new("about"),
        Route::new("posts").children([counted("$postId", calls), Route::new("new")]),
        Route::new("old").before_load(|_| async { Err::<Context, _>(redirect("/posts/new")) }),
    ])
}

#[tokio::test]
async fn test_redirect_lands_on_target() {
    let router = router_at("/old", blog(&Calls::new()));

    let outcome = router.load().await;
    assert!(matches!(outcome, LoadOutcome::Redirected(_)));
    assert_eq!(router.history().location().pathname, "/posts/new");

    let state = router.state();
    assert_eq!(state.resolved_location.as_ref().unwrap().pathname, "/posts/new");
    assert_eq!(state.matches.last().unwrap().route_id, RouteId::from("/posts/new"));
    assert_eq!(state.status_code, 200);
}

#[tokio::test]
async fn test_redirect_loop_settles() {
    let root = Route::root().children([
        Route::new("ping").before_load(|_| async { Err::<Context, _>(redirect("/pong")) }),
        Route::new("pong").before_load(|_| async { Err::<Context, _>(redirect("/ping")) }),
    ]);
    let router = router_at("/ping", root);

    assert!(matches!(router.load().await, LoadOutcome::Redirected(_)));
    assert!(!router.state().is_loading);

    // the chain is per navigation, so a second attempt is detected the same way
    let again = router.navigate(NavigateOptions::to("/ping")).await.unwrap();
    assert!(matches!(again, LoadOutcome::Redirected(_)));
}

#[tokio::test]
async fn test_loader_redirect_lands_on_target() {
    let root = Route::root().children([
        Route::new("old").loader(|_| async { Err(redirect("/new")) }),
        Route::new("new"),
    ]);
    let router = router_at("/old", root);

    assert!(matches!(router.load().await, LoadOutcome::Redirected(_)));
    assert_eq!(router.history().location().pathname, "/new");
    let state = router.state();
    assert_eq!(state.resolved_location.as_ref().unwrap().pathname, "/new");
    assert_eq!(state.matches.last().unwrap().route_id, RouteId::from("/new"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_loader_redirect_loop_stops_at_last_target() {
    let root = Route::root().children([
        Route::new("old").loader(|_| async { Err(redirect("/new")) }),
        Route::new("new").loader(|_| async { Err(redirect("/old")) }),
    ]);
    let router = router_at("/old", root);

    assert!(matches!(router.load().await, LoadOutcome::Redirected(_)));
    assert_eq!(router.history().location().pathname, "/new");
    assert!(!router.state().is_loading);
}

#[tokio::test]
async fn test_exact_match_wins_over_fuzzy() {
    let calls = Calls::new();
    let router = router_at("/posts/7", blog(&calls));

    assert!(router.load().await.is_ready());
    let state = router.state();
    assert_eq!(state.matches.len(), 3);
    assert_eq!(state.matches[2].params.get("postId").map(String::as_str), Some("7"));
    assert!(state.matches.iter().all(|m| !m.global_not_found));
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn test_unmatched_remainder_goes_to_nearest_layout() {
    let router = router_at("/posts/7/comments", blog(&Calls::new()));

    router.load().await;
    let state = router.state();
    let flagged: Vec<_> = state.matches.iter().filter(|m| m.global_not_found).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].route_id, RouteId::from("/posts"));
    assert_eq!(state.status_code, 404);
}

#[tokio::test]
async fn test_root_not_found_mode() {
    let router = router_with(
        "/posts/7/comments",
        blog(&Calls::new()),
        RouterOptions {
            not_found_mode: NotFoundMode::Root,
            ..RouterOptions::default()
        },
    );

    router.load().await;
    let state = router.state();
    assert!(state.matches[0].global_not_found);
    assert!(state.matches[1..].iter().all(|m| !m.global_not_found));
    assert_eq!(state.status_code, 404);
}

#[tokio::test]
async fn test_loader_not_found_marks_match() {
    let root = Route::root().child(
        Route::new("users/$id").loader(|_| async { Err(route_engine::not_found()) }),
    );
    let router = router_at("/users/9", root);

    assert!(matches!(router.load().await, LoadOutcome::NotFound(_)));
    let state = router.state();
    assert_eq!(state.matches[1].status, MatchStatus::NotFound);
    assert_eq!(state.status_code, 404);
}

#[tokio::test(start_paused = true)]
async fn test_preload_then_navigate_uses_preloaded_data() {
    let calls = Calls::new();
    let router = router_at("/about", blog(&calls));
    router.load().await;

    let preloaded = router
        .preload_route(NavigateOptions::to("/posts/$postId").param("postId", "3"))
        .await
        .unwrap()
        .expect("destination matched");
    assert_eq!(preloaded.last().unwrap().status, MatchStatus::Success);
    assert_eq!(calls.count(), 1);
    assert!(router.state().cached_matches.iter().any(|m| m.pathname == "/posts/3"));
    assert_eq!(router.state().matches.len(), 2, "preload must not commit");

    router.navigate(NavigateOptions::to("/posts/3")).await.unwrap();
    assert_eq!(calls.count(), 1);
    assert_eq!(router.state().matches[2].params.get("postId").map(String::as_str), Some("3"));
}

#[tokio::test(start_paused = true)]
async fn test_navigating_to_preloaded_match_clears_preload_flag() {
    let calls = Calls::new();
    let router = router_at("/about", blog(&calls));
    router.load().await;

    let preloaded = router
        .preload_route(NavigateOptions::to("/posts/3"))
        .await
        .unwrap()
        .expect("destination matched");
    assert!(preloaded.last().unwrap().preload);

    router.navigate(NavigateOptions::to("/posts/3")).await.unwrap();
    let state = router.state();
    let leaf = state.matches.last().unwrap();
    assert_eq!(leaf.pathname, "/posts/3");
    assert!(!leaf.preload);
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn test_preload_leaves_active_matches_alone() {
    let calls = Calls::new();
    let router = router_at("/posts/1", blog(&calls));
    router.load().await;
    assert_eq!(calls.count(), 1);

    router.preload_route(NavigateOptions::to("/posts/1")).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_reloads_selected_matches() {
    let calls = Calls::new();
    let router = router_at("/posts/1", blog(&calls));
    router.load().await;

    let skip_all = InvalidateOptions {
        filter: Some(Arc::new(|_: &Match| false)),
        sync: true,
        ..InvalidateOptions::default()
    };
    router.invalidate(skip_all).await;
    assert_eq!(calls.count(), 1);

    router
        .invalidate(InvalidateOptions {
            sync: true,
            ..InvalidateOptions::default()
        })
        .await;
    assert_eq!(calls.count(), 2);
    assert!(router.state().matches.iter().all(|m| !m.invalid));
}

#[tokio::test]
async fn test_back_and_forward_reload_history_entries() {
    let router = router_at("/about", blog(&Calls::new()));
    router.load().await;
    router.navigate(NavigateOptions::to("/posts/new")).await.unwrap();
    assert_eq!(router.history().len(), 2);

    router.back().await;
    assert_eq!(router.state().location.pathname, "/about");
    assert_eq!(router.state().matches.last().unwrap().route_id, RouteId::from("/about"));

    router.forward().await;
    assert_eq!(router.state().location.pathname, "/posts/new");
}

#[tokio::test]
async fn test_match_route_against_current_location() {
    let router = router_at("/posts/5", blog(&Calls::new()));
    router.load().await;

    let params = router
        .match_route(&NavigateOptions::to("/posts/$postId"), MatchRouteOptions::default())
        .expect("current location matches");
    assert_eq!(params.get("postId").map(String::as_str), Some("5"));

    let wanted: Params = [("postId".to_string(), "6".to_string())].into();
    assert!(router
        .match_route(&NavigateOptions::to("/posts/$postId").params(wanted), MatchRouteOptions::default())
        .is_none());
    assert!(router
        .match_route(&NavigateOptions::to("/about"), MatchRouteOptions::default())
        .is_none());
    assert!(router
        .match_route(
            &NavigateOptions::to("/posts"),
            MatchRouteOptions {
                fuzzy: true,
                ..MatchRouteOptions::default()
            }
        )
        .is_some());
}

#[tokio::test]
async fn test_navigation_events_arrive_in_order() {
    let router = router_at("/about", blog(&Calls::new()));
    router.load().await;
    let mut events = router.subscribe();

    router.navigate(NavigateOptions::to("/posts/new")).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RouterEvent::Resolved(change) = &event {
            assert!(change.path_changed);
            assert_eq!(change.to_location.pathname, "/posts/new");
        }
        names.push(event.name());
    }
    assert_eq!(names, ["before_navigate", "before_load", "load", "resolved"]);
}
