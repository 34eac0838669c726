//! Router lifecycle events.

use crate::location::Location;
use crate::path::trim_path_right;

/// What changed between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationChange {
    pub from_location: Option<Location>,
    pub to_location: Location,
    pub path_changed: bool,
    pub href_changed: bool,
    pub hash_changed: bool,
}

impl LocationChange {
    pub fn new(from: Option<&Location>, to: &Location) -> Self {
        let (path_changed, href_changed, hash_changed) = match from {
            Some(from) => (
                trim_path_right(&from.pathname) != trim_path_right(&to.pathname),
                trim_path_right(&from.href) != trim_path_right(&to.href),
                from.hash != to.hash,
            ),
            None => (true, true, true),
        };
        Self {
            from_location: from.cloned(),
            to_location: to.clone(),
            path_changed,
            href_changed,
            hash_changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    /// A navigation is about to build matches.
    BeforeNavigate(LocationChange),
    /// Pending matches are set; hooks are about to run.
    BeforeLoad(LocationChange),
    /// The cycle finished and is the latest one.
    Load(LocationChange),
    /// The router settled on this location.
    Resolved(LocationChange),
}

impl RouterEvent {
    pub fn change(&self) -> &LocationChange {
        match self {
            Self::BeforeNavigate(c) | Self::BeforeLoad(c) | Self::Load(c) | Self::Resolved(c) => c,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeNavigate(_) => "before_navigate",
            Self::BeforeLoad(_) => "before_load",
            Self::Load(_) => "load",
            Self::Resolved(_) => "resolved",
        }
    }
}
