//! Route tree index.
//!
//! # Responsibilities
//! - Flatten a nested [`Route`] into an arena of [`RouteDefinition`]s
//! - Compute ids and full paths from parent links
//! - Build id and full-path lookups plus the ranked flat list
//!
//! # Design Decisions
//! - Built once, immutable afterwards; a changed tree means a new index
//!   swapped in atomically by the owner
//! - Duplicate ids fail the build instead of shadowing silently

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::path::{join_paths, trim_path_left, trim_path_right, PathCache};
use crate::routing::control::RouteId;
use crate::routing::ranker::rank_routes;
use crate::routing::route::{Route, RouteDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTreeError {
    #[error("duplicate route id: {0}")]
    DuplicateId(RouteId),

    #[error("route tree must start with Route::root()")]
    MissingRoot,

    #[error("nested root route under {0}")]
    NestedRoot(RouteId),
}

/// Immutable, indexed route tree.
#[derive(Debug)]
pub struct RouteTree {
    routes: Vec<RouteDefinition>,
    by_id: HashMap<RouteId, usize>,
    by_path: HashMap<String, usize>,
    ranked: Vec<usize>,
}

impl RouteTree {
    pub fn new(root: Route) -> Result<Self, RouteTreeError> {
        Self::with_cache(root, &PathCache::default())
    }

    pub fn with_cache(root: Route, cache: &PathCache) -> Result<Self, RouteTreeError> {
        if !root.is_root {
            return Err(RouteTreeError::MissingRoot);
        }
        let mut routes = Vec::new();
        let mut by_id = HashMap::new();
        flatten(root, None, &mut routes, &mut by_id)?;

        let mut by_path = HashMap::new();
        for route in routes.iter().filter(|r| !r.is_root() && r.path.is_some()) {
            let trimmed = trim_path_right(&route.full_path);
            if !by_path.contains_key(&trimmed) || route.full_path.ends_with('/') {
                by_path.insert(trimmed, route.index);
            }
        }

        let ranked = rank_routes(
            cache,
            routes
                .iter()
                .filter(|r| !r.is_root() && r.path.is_some())
                .map(|r| (r.index, r.full_path.as_str())),
        );
        for (rank, &index) in ranked.iter().enumerate() {
            routes[index].rank = Some(rank);
        }

        debug!(routes = routes.len(), ranked = ranked.len(), "route tree indexed");
        Ok(Self {
            routes,
            by_id,
            by_path,
            ranked,
        })
    }

    pub fn root(&self) -> &RouteDefinition {
        &self.routes[0]
    }

    pub fn get(&self, id: &RouteId) -> Option<&RouteDefinition> {
        self.by_id.get(id).map(|&i| &self.routes[i])
    }

    pub fn get_str(&self, id: &str) -> Option<&RouteDefinition> {
        self.get(&RouteId::from(id))
    }

    pub fn at(&self, index: usize) -> &RouteDefinition {
        &self.routes[index]
    }

    /// Lookup by full path; trailing slashes are ignored.
    pub fn by_full_path(&self, path: &str) -> Option<&RouteDefinition> {
        self.by_path
            .get(&trim_path_right(path))
            .map(|&i| &self.routes[i])
    }

    /// Routes in rank order, most specific first.
    pub fn ranked(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.ranked.iter().map(|&i| &self.routes[i])
    }

    /// `route` and its ancestors, root first.
    pub fn branch<'a>(&'a self, route: &'a RouteDefinition) -> Vec<&'a RouteDefinition> {
        let mut chain = vec![route];
        let mut cursor = route.parent;
        while let Some(i) = cursor {
            chain.push(&self.routes[i]);
            cursor = self.routes[i].parent;
        }
        chain.reverse();
        chain
    }

    pub fn parent(&self, route: &RouteDefinition) -> Option<&RouteDefinition> {
        route.parent.map(|i| &self.routes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn flatten(
    route: Route,
    parent: Option<usize>,
    routes: &mut Vec<RouteDefinition>,
    by_id: &mut HashMap<RouteId, usize>,
) -> Result<(), RouteTreeError> {
    let index = routes.len();
    let (id, path, full_path) = match parent {
        None => (RouteId::root(), None, "/".to_string()),
        Some(p) => {
            let parent_def = &routes[p];
            if route.is_root {
                return Err(RouteTreeError::NestedRoot(parent_def.id.clone()));
            }
            let path = route.path.as_deref().map(|p| {
                if p == "/" {
                    p.to_string()
                } else {
                    trim_path_left(p)
                }
            });
            let custom = route.id.clone().or_else(|| path.clone()).unwrap_or_default();
            let parent_id = if parent_def.id.is_root() {
                ""
            } else {
                parent_def.id.as_str()
            };
            let id = join_paths(["/", parent_id, custom.as_str()]);
            let full_path = match &path {
                Some(path) => join_paths([parent_def.full_path.as_str(), path.as_str()]),
                None => parent_def.full_path.clone(),
            };
            (RouteId(id), path, full_path)
        }
    };

    if by_id.contains_key(&id) {
        return Err(RouteTreeError::DuplicateId(id));
    }
    by_id.insert(id.clone(), index);
    routes.push(RouteDefinition::new(id, path, full_path, parent, index, route.options));
    if let Some(p) = parent {
        routes[p].children.push(index);
    }

    for child in route.children {
        flatten(child, Some(index), routes, by_id)?;
    }
    Ok(())
}
