//! Path templates: interpolation, matching and ranking agree with each other.

use route_engine::path::{interpolate_path, match_pathname, InterpolateOptions, MatchOptions, PathCache};
use route_engine::routing::ranker::rank_routes;
use route_engine::{Params, Route, RouteTree};

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_interpolated_paths_match_their_template() {
    let cache = PathCache::with_capacity(64);
    let cases = [
        ("/posts/$postId", params(&[("postId", "42")])),
        ("/users/$userId/posts/$postId", params(&[("userId", "7"), ("postId", "9")])),
        ("/files/$", params(&[("_splat", "docs/guide/intro.md")])),
        ("/img/photo-{$id}.png", params(&[("id", "12")])),
        ("/docs/{-$version}/$page", params(&[("version", "v2"), ("page", "intro")])),
        ("/docs/{-$version}/$page", params(&[("page", "intro")])),
        ("/u/$name", params(&[("name", "a b")])),
    ];

    for (template, input) in cases {
        let built = interpolate_path(&cache, template, &input, InterpolateOptions::default());
        let matched = match_pathname(
            &cache,
            "/",
            &built.path,
            &MatchOptions {
                to: Some(template),
                fuzzy: false,
                case_sensitive: true,
            },
        )
        .unwrap_or_else(|| panic!("{} did not match {template}", built.path));
        for (key, value) in &input {
            assert_eq!(matched.get(key), Some(value), "{template}: {key}");
        }
    }
}

#[test]
fn test_ranking_is_deterministic() {
    let build = || {
        RouteTree::new(Route::root().children([
            Route::new("$"),
            Route::new("posts").children([Route::new("$postId"), Route::new("new")]),
            Route::new("{-$lang}/about"),
            Route::new("about"),
            Route::new("files/{$}.json"),
        ]))
        .unwrap()
    };
    let order = |tree: &RouteTree| tree.ranked().map(|r| r.full_path.clone()).collect::<Vec<_>>();

    let first = order(&build());
    for _ in 0..5 {
        assert_eq!(order(&build()), first);
    }

    let position = |path: &str| first.iter().position(|p| p == path).unwrap();
    assert!(position("/posts/new") < position("/posts/$postId"));
    assert!(position("/about") < position("/{-$lang}/about"));
    assert!(position("/posts/$postId") < position("/$"));
    assert_eq!(first.last().map(String::as_str), Some("/$"));
}

#[test]
fn test_rank_routes_ignores_input_order() {
    let cache = PathCache::with_capacity(64);
    let forward = ["/a/$id", "/a/b", "/$", "/a/{-$opt}"];
    let mut reversed = forward;
    reversed.reverse();

    let ranked = |paths: &[&str]| {
        rank_routes(&cache, paths.iter().copied().enumerate())
            .into_iter()
            .map(|i| paths[i].to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(ranked(&forward), ranked(&reversed));
}
