//! Destination → [`Location`].
//!
//! # Responsibilities
//! - Resolve `to` against `from` (or the current leaf match)
//! - Derive params, search, hash and history state
//! - Run the destination routes' search middleware chain
//! - Apply explicit masks and configured route masks

use crate::location::parsed::format_href;
use crate::location::search::run_middlewares;
use crate::location::{parse_href, HistoryState, Location, MiddlewareCtx, Search, SearchMiddleware, SearchUpdate};
use crate::matching::{replace_equal_map, MatchBuilder, MatchRoutesOptions};
use crate::navigation::options::{HashUpdate, NavigateOptions, ParamsUpdate, StateUpdate};
use crate::navigation::{NavigationError, Router};
use crate::path::{interpolate_path, match_pathname, resolve_path, InterpolateOptions, MatchOptions};
use crate::routing::{RouteDefinition, RouteTree};
use crate::store::RouterState;

use std::sync::Arc;

impl Router {
    /// Build the location `dest` points at without touching history.
    pub fn build_location(&self, dest: &NavigateOptions) -> Result<Location, NavigationError> {
        let dest = self.expand_href(dest);
        let tree = self.tree();
        let state = self.state();
        let mut next = self.build_one(&dest, &state, &tree)?;

        let masked_dest = match &dest.mask {
            Some(mask) => {
                let mut mask = (**mask).clone();
                if mask.from.is_none() {
                    mask.from = dest.from.clone();
                }
                mask.from_location = dest.from_location.clone();
                Some(mask)
            }
            None => self.inner.options.route_masks.iter().find_map(|mask| {
                let params = match_pathname(
                    &self.inner.cache,
                    "/",
                    &next.pathname,
                    &MatchOptions {
                        to: Some(&mask.from),
                        fuzzy: false,
                        case_sensitive: self.inner.options.case_sensitive,
                    },
                )?;
                Some(NavigateOptions {
                    to: Some(mask.to.clone()),
                    params: ParamsUpdate::Merge(params),
                    search: mask.search.clone(),
                    unmask_on_reload: Some(mask.unmask_on_reload),
                    from_location: dest.from_location.clone(),
                    ..NavigateOptions::default()
                })
            }),
        };

        if let Some(masked_dest) = masked_dest {
            let masked = self.build_one(&masked_dest, &state, &tree)?;
            next.unmask_on_reload |= masked.unmask_on_reload;
            next.masked_location = Some(Box::new(masked));
        }
        Ok(next)
    }

    /// An href destination overrides `to`, `search` and `hash`.
    fn expand_href(&self, dest: &NavigateOptions) -> NavigateOptions {
        let mut dest = dest.clone();
        if let Some(href) = dest.href.take() {
            let raw = parse_href(&href, HistoryState::default());
            dest.to = Some(raw.pathname);
            dest.search = SearchUpdate::Replace((self.inner.options.parse_search)(&raw.search));
            dest.hash = match raw.hash.trim_start_matches('#') {
                "" => HashUpdate::Clear,
                hash => HashUpdate::Set(hash.to_string()),
            };
        }
        dest
    }

    fn resolve(&self, base: &str, to: &str) -> String {
        resolve_path(
            &self.inner.cache,
            "/",
            base,
            to,
            self.inner.options.trailing_slash,
            self.inner.options.case_sensitive,
        )
    }

    fn build_one(&self, dest: &NavigateOptions, state: &RouterState, tree: &RouteTree) -> Result<Location, NavigationError> {
        let options = &self.inner.options;
        let cache = &self.inner.cache;
        let current = dest.from_location.clone().unwrap_or_else(|| state.location.clone());

        let builder = MatchBuilder::new(tree, cache, options, state);
        let current_matches = builder.build(
            &current,
            &MatchRoutesOptions {
                build_location: true,
                ..MatchRoutesOptions::default()
            },
        )?;
        let last = current_matches.last();

        let from_path = match &dest.from {
            Some(from) if from == "/" || tree.by_full_path(from).is_some() => from.clone(),
            Some(from) => return Err(NavigationError::UnknownFrom(from.clone())),
            None => last.map_or_else(|| "/".to_string(), |m| m.full_path.clone()),
        };
        let from_search = last.map_or_else(|| current.search.clone(), |m| m.search.clone());
        let from_params = last.map(|m| m.params.clone()).unwrap_or_default();

        let base = self.resolve(&from_path, ".");
        let next_to = self.resolve(&base, dest.to.as_deref().unwrap_or("."));

        let mut next_params = dest.params.apply(&from_params);
        let interpolated = interpolate_path(cache, &next_to, &next_params, InterpolateOptions::default()).path;
        let exact = tree.by_full_path(&next_to).map(|_| next_to.as_str());
        let dest_routes = builder.matched_routes(&interpolated, exact).routes;

        if !next_params.is_empty() {
            for route in &dest_routes {
                if let Some(stringify) = &route.options.stringify_params {
                    let stringified = stringify(&next_params);
                    next_params.extend(stringified);
                }
            }
        }

        let pathname = interpolate_path(
            cache,
            &next_to,
            &next_params,
            InterpolateOptions {
                leave_params: dest.leave_params,
                ..InterpolateOptions::default()
            },
        )
        .path;

        let mut search = from_search.clone();
        replace_equal_map(&mut search, self.run_search_chain(&from_search, dest, &dest_routes));
        let search_str = (options.stringify_search)(&search);

        let hash = match &dest.hash {
            HashUpdate::Clear => String::new(),
            HashUpdate::Keep => current.hash.clone(),
            HashUpdate::Set(hash) => hash.trim_start_matches('#').to_string(),
        };
        let history_state = match &dest.state {
            StateUpdate::Clear => HistoryState::default(),
            StateUpdate::Keep => HistoryState {
                temp_location: None,
                temp_key: None,
                ..current.state.clone()
            },
            StateUpdate::Set(user) => HistoryState {
                user: user.clone(),
                ..HistoryState::default()
            },
        };

        let href = format_href(&pathname, &search_str, &hash);
        Ok(Location {
            public_href: self.inner.rewrite.apply_output(&href),
            href,
            pathname,
            search,
            search_str,
            hash,
            state: history_state,
            masked_location: None,
            unmask_on_reload: dest.unmask_on_reload.unwrap_or(options.unmask_on_reload),
        })
    }

    /// Route middlewares root → leaf, legacy filters, then validation, ending
    /// in the destination's own search update.
    fn run_search_chain(&self, from_search: &Search, dest: &NavigateOptions, routes: &[&RouteDefinition]) -> Search {
        let mut chain: Vec<SearchMiddleware> = Vec::new();
        for route in routes {
            chain.extend(route.options.search_middlewares.iter().cloned());

            let pre = route.options.pre_search_filters.clone();
            let post = route.options.post_search_filters.clone();
            if !pre.is_empty() || !post.is_empty() {
                chain.push(Arc::new(move |ctx: MiddlewareCtx<'_>| {
                    let input = pre.iter().fold(ctx.search.clone(), |s, f| f(s));
                    let result = ctx.next(input);
                    post.iter().fold(result, |s, f| f(s))
                }));
            }

            if dest.include_validate_search {
                if let Some(validate) = route.options.validate_search.clone() {
                    chain.push(Arc::new(move |ctx: MiddlewareCtx<'_>| {
                        let result = ctx.next(ctx.search.clone());
                        match validate(&result) {
                            Ok(valid) => {
                                let mut merged = result;
                                merged.extend(valid);
                                merged
                            }
                            Err(_) => result,
                        }
                    }));
                }
            }
        }
        run_middlewares(&chain, from_search.clone(), &|search| dest.search.apply(&search))
    }
}
