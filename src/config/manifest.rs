//! Route manifest → route tree.
//!
//! # Responsibilities
//! - Turn `[[routes]]` entries into [`Route`] builders
//! - Attach the declarative hooks (static data, redirect, not-found,
//!   required search keys)
//! - Compile the result into a [`RouteTree`]

use std::time::Duration;

use crate::config::schema::RouteConfig;
use crate::routing::{not_found, Context, Redirect, Route, RouteError, RouteTree, RouteTreeError};

/// Build the route for one manifest entry and its children.
pub fn build_route(config: &RouteConfig) -> Route {
    let mut route = match (&config.path, &config.id) {
        (Some(path), Some(id)) => Route::new(path.clone()).with_id(id.clone()),
        (Some(path), None) => Route::new(path.clone()),
        (None, Some(id)) => Route::pathless(id.clone()),
        (None, None) => Route::pathless("_layout"),
    };

    if let Some(ms) = config.stale_time_ms {
        route = route.stale_time(Duration::from_millis(ms));
    }
    if let Some(ms) = config.preload_stale_time_ms {
        route = route.preload_stale_time(Duration::from_millis(ms));
    }
    if let Some(ms) = config.gc_time_ms {
        route = route.gc_time(Duration::from_millis(ms));
    }
    if let Some(preload) = config.preload {
        route = route.preload(preload);
    }
    if let Some(ssr) = config.ssr {
        route = route.ssr(ssr);
    }
    if config.not_found_boundary {
        route = route.not_found_boundary();
    }

    if let Some(data) = config.data.clone() {
        route = route.loader(move |_| {
            let data = data.clone();
            async move { Ok(data) }
        });
    }

    if let Some(redirect) = config.redirect.clone() {
        route = route.before_load(move |_| {
            let target = Redirect::to(redirect.to.clone()).with_status(redirect.status);
            async move { Err::<Context, _>(RouteError::from(target)) }
        });
    } else if config.not_found {
        route = route.before_load(|_| async { Err::<Context, _>(not_found()) });
    }

    if !config.validate_search.is_empty() {
        let required = config.validate_search.clone();
        route = route.validate_search(move |search| {
            match required.iter().find(|key| !search.contains_key(key.as_str())) {
                Some(missing) => Err(format!("missing search param `{missing}`")),
                None => Ok(search.clone()),
            }
        });
    }

    route.children(config.children.iter().map(build_route))
}

/// Compile a full manifest under a fresh root.
pub fn build_tree(routes: &[RouteConfig]) -> Result<RouteTree, RouteTreeError> {
    RouteTree::new(Route::root().children(routes.iter().map(build_route)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RedirectConfig;
    use serde_json::json;

    fn entry(path: &str) -> RouteConfig {
        RouteConfig {
            path: Some(path.to_string()),
            ..RouteConfig::default()
        }
    }

    #[test]
    fn test_tree_from_manifest() {
        let mut posts = entry("posts");
        posts.children = vec![entry("/"), entry("$postId")];
        posts.data = Some(json!({"title": "Posts"}));
        let tree = build_tree(&[posts, entry("about")]).unwrap();
        assert!(tree.by_full_path("/posts/$postId").is_some());
        assert!(tree.by_full_path("/about").is_some());
        assert!(tree.get_str("/posts").unwrap().options.loader.is_some());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = build_tree(&[entry("a"), entry("a")]).unwrap_err();
        assert!(matches!(err, RouteTreeError::DuplicateId(_)));
    }

    #[test]
    fn test_hooks_attached() {
        let mut old = entry("old");
        old.redirect = Some(RedirectConfig {
            to: "/new".into(),
            status: 301,
        });
        let mut search = entry("search");
        search.validate_search = vec!["q".into()];
        let tree = build_tree(&[old, search]).unwrap();
        assert!(tree.get_str("/old").unwrap().options.before_load.is_some());
        let validate = tree
            .get_str("/search")
            .and_then(|r| r.options.validate_search.clone())
            .unwrap();
        assert!(validate(&Default::default()).is_err());
    }
}
