//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (addresses parse, intervals > 0, redirect statuses)
//! - Check the route manifest compiles (unique ids, well-formed entries)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::manifest::build_tree;
use crate::config::schema::{EngineConfig, RouteConfig};
use crate::routing::RouteTreeError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("server.{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("basepath `{0}` must start with `/`")]
    Basepath(String),

    #[error("route {route}: redirect status {status} is not a 3xx code")]
    RedirectStatus { route: String, status: u16 },

    #[error("route {route}: cannot both redirect and raise not-found")]
    ConflictingControlFlow { route: String },

    #[error("pathless route under {parent} needs an id")]
    MissingId { parent: String },

    #[error("route mask `{0}` must be absolute")]
    RelativeMask(String),

    #[error(transparent)]
    Tree(#[from] RouteTreeError),
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroInterval("request_timeout_secs"));
    }
    if !config.router.basepath.starts_with('/') {
        errors.push(ValidationError::Basepath(config.router.basepath.clone()));
    }
    for mask in &config.router.masks {
        for side in [&mask.from, &mask.to] {
            if !side.starts_with('/') {
                errors.push(ValidationError::RelativeMask(side.clone()));
            }
        }
    }

    let before = errors.len();
    for route in &config.routes {
        validate_route(route, "/", &mut errors);
    }
    // only worth compiling once every entry is well-formed
    if errors.len() == before {
        if let Err(e) = build_tree(&config.routes) {
            errors.push(e.into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, parent: &str, errors: &mut Vec<ValidationError>) {
    let name = match (&route.path, &route.id) {
        (_, Some(id)) => id.clone(),
        (Some(path), None) => path.clone(),
        (None, None) => {
            errors.push(ValidationError::MissingId {
                parent: parent.to_string(),
            });
            return;
        }
    };
    if let Some(redirect) = &route.redirect {
        if !(300..400).contains(&redirect.status) {
            errors.push(ValidationError::RedirectStatus {
                route: name.clone(),
                status: redirect.status,
            });
        }
        if route.not_found {
            errors.push(ValidationError::ConflictingControlFlow { route: name.clone() });
        }
    }
    for child in &route.children {
        validate_route(child, &name, errors);
    }
}
