//! Match building.
//!
//! # Responsibilities
//! - Pick the route branch for a pathname (exact template lookup or ranked scan)
//! - Decide where an unmatched remainder renders its not-found
//! - Produce one [`Match`] per route in the branch, root first, reusing
//!   existing matches by id

use serde_json::Value;
use tracing::trace;

use crate::location::{Location, Search};
use crate::matching::types::{Match, MatchCause, MatchId, MatchStatus};
use crate::navigation::options::{NotFoundMode, RouterOptions};
use crate::path::matcher::FUZZY_REST;
use crate::path::{
    interpolate_path, match_pathname, trim_path_right, InterpolateOptions, MatchOptions, Params,
    PathCache,
};
use crate::routing::{Context, RouteContextCtx, RouteDefinition, RouteError, RouteId, RouteTree};
use crate::store::RouterState;

#[derive(Debug, Clone, Default)]
pub struct MatchRoutesOptions {
    pub preload: bool,
    /// Fail on the first search/param validation error instead of capturing it.
    pub throw_on_error: bool,
    /// Destination template already known; skips the ranked scan.
    pub dest_to: Option<String>,
    /// Matches only feed `build_location`; route context builders are skipped.
    pub build_location: bool,
}

/// Routes selected for a pathname.
#[derive(Debug)]
pub struct MatchedRoutes<'t> {
    /// Root first.
    pub routes: Vec<&'t RouteDefinition>,
    pub params: Params,
    pub found: Option<&'t RouteDefinition>,
}

/// Builds matches against a tree and the current state.
pub struct MatchBuilder<'a> {
    tree: &'a RouteTree,
    cache: &'a PathCache,
    options: &'a RouterOptions,
    state: &'a RouterState,
}

impl<'a> MatchBuilder<'a> {
    pub fn new(
        tree: &'a RouteTree,
        cache: &'a PathCache,
        options: &'a RouterOptions,
        state: &'a RouterState,
    ) -> Self {
        Self {
            tree,
            cache,
            options,
            state,
        }
    }

    fn params_for(&self, route: &RouteDefinition, pathname: &str) -> Option<Params> {
        match_pathname(
            self.cache,
            "/",
            pathname,
            &MatchOptions {
                to: Some(&route.full_path),
                fuzzy: true,
                case_sensitive: route
                    .options
                    .case_sensitive
                    .unwrap_or(self.options.case_sensitive),
            },
        )
    }

    /// Select the branch for `pathname`.
    ///
    /// With `dest_to` the route is looked up by full path. Otherwise the first
    /// ranked route that matches without a leftover wins; a route that only
    /// matches with a leftover (`**`) is kept as a fallback.
    pub fn matched_routes(&self, pathname: &str, dest_to: Option<&str>) -> MatchedRoutes<'a> {
        let trimmed = trim_path_right(pathname);
        let mut found = None;
        let mut params = Params::new();

        if let Some(to) = dest_to {
            if let Some(route) = self.tree.by_full_path(to) {
                params = self.params_for(route, &trimmed).unwrap_or_default();
                found = Some(route);
            }
        } else {
            let mut fuzzy: Option<(&'a RouteDefinition, Params)> = None;
            for route in self.tree.ranked() {
                let Some(matched) = self.params_for(route, &trimmed) else {
                    continue;
                };
                let is_leftover = route.path.as_deref() != Some("/") && matched.contains_key(FUZZY_REST);
                if is_leftover {
                    if fuzzy.is_none() {
                        fuzzy = Some((route, matched));
                    }
                } else {
                    found = Some(route);
                    params = matched;
                    break;
                }
            }
            if found.is_none() {
                if let Some((route, matched)) = fuzzy {
                    found = Some(route);
                    params = matched;
                }
            }
        }

        let leaf = found.unwrap_or_else(|| self.tree.root());
        MatchedRoutes {
            routes: self.tree.branch(leaf),
            params,
            found,
        }
    }

    fn global_not_found(&self, matched: &MatchedRoutes<'a>, pathname: &str) -> Option<RouteId> {
        let unmatched = match matched.found {
            Some(route) => {
                route.path.as_deref() != Some("/") && matched.params.contains_key(FUZZY_REST)
            }
            None => trim_path_right(pathname) != "/",
        };
        if !unmatched {
            return None;
        }
        let target = match self.options.not_found_mode {
            NotFoundMode::Fuzzy => matched
                .routes
                .iter()
                .rev()
                .find(|r| r.has_children())
                .map(|r| r.id.clone()),
            NotFoundMode::Root => None,
        };
        Some(target.unwrap_or_else(RouteId::root))
    }

    fn validate_search(
        &self,
        route: &RouteDefinition,
        parent_search: &Search,
        parent_strict: &Search,
    ) -> Result<(Search, Search), RouteError> {
        let strict = match &route.options.validate_search {
            Some(validate) => validate(parent_search).map_err(|message| RouteError::SearchValidation {
                route_id: route.id.clone(),
                message,
            })?,
            None => Search::new(),
        };
        let mut merged = parent_search.clone();
        merged.extend(strict.clone());
        let mut strict_all = parent_strict.clone();
        strict_all.extend(strict);
        Ok((merged, strict_all))
    }

    /// Build the match chain for `location`.
    pub fn build(&self, location: &Location, opts: &MatchRoutesOptions) -> Result<Vec<Match>, RouteError> {
        let matched = self.matched_routes(&location.pathname, opts.dest_to.as_deref());
        let global_not_found = self.global_not_found(&matched, &location.pathname);
        let mut route_params = matched.params.clone();
        let mut matches: Vec<Match> = Vec::with_capacity(matched.routes.len());

        for (index, route) in matched.routes.iter().enumerate() {
            let parent = matches.last();
            let parent_search = parent.map_or(&location.search, |p| &p.search);
            let empty = Search::new();
            let parent_strict = parent.map_or(&empty, |p| &p.strict_search);

            let (search, strict_search, search_error) =
                match self.validate_search(route, parent_search, parent_strict) {
                    Ok((merged, strict)) => (merged, strict, None),
                    Err(err) if opts.throw_on_error => return Err(err),
                    Err(err) => (parent_search.clone(), Search::new(), Some(err)),
                };

            let loader_deps = route
                .options
                .loader_deps
                .as_ref()
                .map_or(Value::Null, |deps| deps(&search));
            let deps_hash = match &loader_deps {
                Value::Null => String::new(),
                deps => serde_json::to_string(deps).unwrap_or_default(),
            };

            let interpolated = interpolate_path(
                self.cache,
                &route.full_path,
                &route_params,
                InterpolateOptions::default(),
            );
            let id_path = interpolate_path(
                self.cache,
                route.id.as_str(),
                &route_params,
                InterpolateOptions {
                    leave_wildcards: true,
                    ..InterpolateOptions::default()
                },
            );
            let id = MatchId(format!("{}{}", id_path.path, deps_hash));

            let existing = self.state.get_match(&id);
            let previous = self.state.matches.iter().find(|m| m.route_id == route.id);
            let cause = if previous.is_some() {
                MatchCause::Stay
            } else {
                MatchCause::Enter
            };

            let mut strict_params = existing.map_or(interpolated.used_params, |m| m.strict_params.clone());
            let mut params_error = None;
            if existing.is_none() {
                if let Some(parse) = &route.options.parse_params {
                    match parse(&strict_params) {
                        Ok(parsed) => strict_params.extend(parsed),
                        Err(message) => {
                            let err = RouteError::ParamParse {
                                route_id: route.id.clone(),
                                message,
                            };
                            if opts.throw_on_error {
                                return Err(err);
                            }
                            params_error = Some(err);
                        }
                    }
                }
            }
            route_params.extend(strict_params.clone());

            let mut m = match existing {
                Some(existing) => {
                    let mut m = existing.clone();
                    m.cause = cause;
                    m
                }
                None => {
                    let mut m = Match::new(id, route.id.clone(), route.full_path.clone(), index);
                    m.pathname = interpolated.path.clone();
                    m.status = if route.needs_loading() {
                        MatchStatus::Pending
                    } else {
                        MatchStatus::Success
                    };
                    m.params_error = params_error;
                    m.cause = cause;
                    m.ssr = route.options.ssr.unwrap_or(true);
                    m.static_data = route.static_data().clone();
                    m
                }
            };
            m.index = index;
            m.params = route_params.clone();
            m.strict_params = strict_params;
            m.search = search;
            m.strict_search = strict_search;
            m.search_error = search_error;
            m.loader_deps = loader_deps;
            if !opts.preload {
                m.global_not_found = global_not_found.as_ref() == Some(&route.id);
            }
            let parent_context = parent.map_or(&self.options.context, |p| &p.context);
            m.rebuild_context(parent_context);
            matches.push(m);
        }

        if !opts.build_location {
            self.run_context_builders(&mut matches, location, &matched.routes);
        }

        trace!(
            pathname = %location.pathname,
            matches = matches.len(),
            global_not_found = ?global_not_found,
            "matches built"
        );
        Ok(matches)
    }

    /// Second pass: fresh matches get their route context from the parent's.
    fn run_context_builders(&self, matches: &mut [Match], location: &Location, routes: &[&RouteDefinition]) {
        for index in 0..matches.len() {
            let parent_context: Context = match index {
                0 => self.options.context.clone(),
                _ => matches[index - 1].context.clone(),
            };
            let m = &mut matches[index];
            if self.state.get_match(&m.id).is_some() {
                continue;
            }
            if let Some(build) = &routes[index].options.context {
                m.route_context = build(&RouteContextCtx {
                    params: &m.params,
                    search: &m.search,
                    deps: &m.loader_deps,
                    context: &parent_context,
                    location,
                    cause: m.cause,
                    preload: m.preload,
                });
            }
            m.rebuild_context(&parent_context);
        }
    }
}
