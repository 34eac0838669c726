//! Path template subsystem.
//!
//! # Data Flow
//! ```text
//! "/posts/{-$lang}/$postId"
//!     → segment.rs (tokenize into typed segments, memoized via lru.rs)
//!     → matcher.rs (pairwise consumption against a concrete pathname)
//!     → interpolate.rs (params → concrete pathname, relative resolution)
//! ```
//!
//! # Design Decisions
//! - Segments are immutable and cached by their exact source text
//! - Two caches: concrete pathnames are parsed as literals, route
//!   templates are parsed with `$`/`{}` syntax
//! - Matching walks segments in order; no regex compilation

pub mod interpolate;
pub mod lru;
pub mod matcher;
pub mod segment;

pub use interpolate::{interpolate_path, resolve_path, InterpolateOptions, Interpolated, TrailingSlash};
pub use matcher::{match_by_path, match_pathname, MatchOptions};
pub use segment::{PathCache, Segment, SegmentKind, Segments};

use std::collections::BTreeMap;

/// Captured path parameters, ordered by name.
pub type Params = BTreeMap<String, String>;

/// Collapse runs of slashes into one.
pub fn clean_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                out.push(ch);
            }
            prev_slash = true;
        } else {
            out.push(ch);
            prev_slash = false;
        }
    }
    out
}

/// Join path pieces with `/` and clean the result.
pub fn join_paths<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/");
    clean_path(&joined)
}

/// Strip leading slashes, except for the bare root.
pub fn trim_path_left(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    path.trim_start_matches('/').to_string()
}

/// Strip trailing slashes, except for the bare root.
pub fn trim_path_right(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    path.trim_end_matches('/').to_string()
}

pub fn trim_path(path: &str) -> String {
    trim_path_right(&trim_path_left(path))
}

/// Remove `basepath` from the front of `path`. Returns the path unchanged when
/// it does not live under the basepath.
pub fn remove_basepath(basepath: &str, path: &str, case_sensitive: bool) -> String {
    match basepath {
        "" | "/" => path.to_string(),
        base => {
            let head = match path.get(..base.len()) {
                Some(head) => head,
                None => return path.to_string(),
            };
            let same = if case_sensitive {
                head == base
            } else {
                head.eq_ignore_ascii_case(base)
            };
            if !same {
                return path.to_string();
            }
            match path.as_bytes().get(base.len()) {
                None => "/".to_string(),
                Some(b'/') => path[base.len()..].to_string(),
                Some(_) => path.to_string(),
            }
        }
    }
}
