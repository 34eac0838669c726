//! Location values and history state.

use serde::{Deserialize, Serialize};

use crate::location::Search;

/// State stored alongside each history entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryState {
    /// Random per-entry key.
    #[serde(default)]
    pub key: String,
    /// Position in the history stack; increases on push.
    #[serde(default)]
    pub index: usize,
    /// Real target hidden behind a masked public URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_location: Option<String>,
    /// Session key; a mismatch means the page was reloaded and the mask is dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_key: Option<String>,
    /// Caller-supplied state.
    #[serde(default, flatten)]
    pub user: Search,
}

impl HistoryState {
    /// Equality that ignores the per-entry key and index.
    pub fn same_content(&self, other: &HistoryState) -> bool {
        self.temp_location == other.temp_location
            && self.temp_key == other.temp_key
            && self.user == other.user
    }
}

/// A raw entry as the history collaborator stores it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryLocation {
    pub href: String,
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
    pub state: HistoryState,
}

/// Split an href into pathname, query and fragment.
pub fn parse_href(href: &str, state: HistoryState) -> HistoryLocation {
    let (rest, hash) = match href.find('#') {
        Some(i) => (&href[..i], &href[i..]),
        None => (href, ""),
    };
    let (pathname, search) = match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let pathname = if pathname.is_empty() { "/" } else { pathname };
    HistoryLocation {
        href: href.to_string(),
        pathname: pathname.to_string(),
        search: search.to_string(),
        hash: hash.to_string(),
        state,
    }
}

/// A fully parsed location as seen by the router.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Internal href (pathname + search + hash) after input rewriting.
    pub href: String,
    /// Href as shown externally, after output rewriting.
    pub public_href: String,
    pub pathname: String,
    pub search: Search,
    pub search_str: String,
    /// Fragment without the leading `#`.
    pub hash: String,
    pub state: HistoryState,
    /// Location shown in the address bar when this one is masked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_location: Option<Box<Location>>,
    #[serde(default)]
    pub unmask_on_reload: bool,
}

impl Location {
    /// Href that should be written to history for this location.
    pub fn history_href(&self) -> &str {
        match &self.masked_location {
            Some(masked) => &masked.public_href,
            None => &self.public_href,
        }
    }

    /// Same href and same state, ignoring per-entry bookkeeping.
    pub fn same_target(&self, other: &Location) -> bool {
        self.href == other.href && self.state.same_content(&other.state)
    }
}

pub(crate) fn format_href(pathname: &str, search_str: &str, hash: &str) -> String {
    let hash = if hash.is_empty() {
        String::new()
    } else {
        format!("#{hash}")
    };
    format!("{pathname}{search_str}{hash}")
}
