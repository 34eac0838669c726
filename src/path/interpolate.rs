//! Param interpolation and relative path resolution.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::path::matcher::SPLAT;
use crate::path::segment::{PathCache, Segment, SegmentKind};
use crate::path::{clean_path, join_paths, remove_basepath, Params};

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters `encodeURI` leaves alone (splats keep their slashes).
const URI: &AsciiSet = &COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Trailing-slash policy applied when resolving paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    #[default]
    Never,
    Always,
    Preserve,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolateOptions<'a> {
    /// Keep `$`-syntax for wildcards and optionals (used for match ids).
    pub leave_wildcards: bool,
    /// Keep `$name` placeholders instead of substituting values.
    pub leave_params: bool,
    /// Characters that should appear unencoded in param values.
    pub allowed_chars: &'a [char],
}

/// Result of [`interpolate_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    pub path: String,
    /// Params the template actually referenced.
    pub used_params: Params,
    pub missing_params: bool,
}

fn encode_param(key: &str, value: &str, allowed: &[char]) -> String {
    if key == SPLAT || key == "*" {
        return utf8_percent_encode(value, URI).to_string();
    }
    let mut encoded = utf8_percent_encode(value, COMPONENT).to_string();
    for ch in allowed {
        let mut buf = [0u8; 4];
        let raw = ch.encode_utf8(&mut buf);
        let escaped = utf8_percent_encode(raw, COMPONENT).to_string();
        if escaped != *raw {
            encoded = encoded.replace(&escaped, raw);
        }
    }
    encoded
}

/// Substitute `params` into `template`.
pub fn interpolate_path(
    cache: &PathCache,
    template: &str,
    params: &Params,
    opts: InterpolateOptions<'_>,
) -> Interpolated {
    let segments = cache.route_segments(template);
    let mut used = Params::new();
    let mut missing = false;
    let mut parts: Vec<String> = Vec::with_capacity(segments.len());

    for segment in segments.iter() {
        let prefix = segment.prefix.as_deref().unwrap_or("");
        let suffix = segment.suffix.as_deref().unwrap_or("");
        let part = match segment.kind {
            SegmentKind::Static => Some(segment.value.clone()),
            SegmentKind::Wildcard => match params.get(SPLAT) {
                None => {
                    missing = true;
                    if opts.leave_wildcards {
                        Some(format!("{prefix}${suffix}"))
                    } else if !prefix.is_empty() || !suffix.is_empty() {
                        Some(format!("{prefix}{suffix}"))
                    } else {
                        None
                    }
                }
                Some(value) => {
                    used.insert(SPLAT.to_string(), value.clone());
                    let encoded = encode_param(SPLAT, value, opts.allowed_chars);
                    if opts.leave_wildcards {
                        Some(format!("{prefix}${encoded}{suffix}"))
                    } else {
                        Some(format!("{prefix}{encoded}{suffix}"))
                    }
                }
            },
            SegmentKind::Param => {
                let value = params.get(&segment.value);
                if value.is_none() {
                    missing = true;
                }
                if let Some(v) = value {
                    used.insert(segment.value.clone(), v.clone());
                }
                let encoded = value.map(|v| encode_param(&segment.value, v, opts.allowed_chars));
                if opts.leave_params {
                    Some(segment.to_template())
                } else {
                    Some(format!(
                        "{prefix}{}{suffix}",
                        encoded.unwrap_or_else(|| "undefined".to_string())
                    ))
                }
            }
            SegmentKind::OptionalParam => match params.get(&segment.value) {
                None => {
                    if opts.leave_params {
                        Some(segment.to_template())
                    } else if opts.leave_wildcards {
                        Some(format!("{prefix}{}{suffix}", segment.value))
                    } else if !prefix.is_empty() || !suffix.is_empty() {
                        Some(format!("{prefix}{suffix}"))
                    } else {
                        None
                    }
                }
                Some(v) => {
                    used.insert(segment.value.clone(), v.clone());
                    let encoded = encode_param(&segment.value, v, opts.allowed_chars);
                    if opts.leave_params {
                        Some(segment.to_template())
                    } else if opts.leave_wildcards {
                        Some(format!("{prefix}{}{encoded}{suffix}", segment.value))
                    } else {
                        Some(format!("{prefix}{encoded}{suffix}"))
                    }
                }
            },
        };
        if let Some(part) = part {
            parts.push(part);
        }
    }

    Interpolated {
        path: join_paths(parts),
        used_params: used,
        missing_params: missing,
    }
}

/// Resolve `to` relative to `base` (both may carry template syntax).
///
/// `..` pops, `.` stays, a leading `/` restarts from the root. The result is
/// re-prefixed with `basepath`.
pub fn resolve_path(
    cache: &PathCache,
    basepath: &str,
    base: &str,
    to: &str,
    trailing_slash: TrailingSlash,
    case_sensitive: bool,
) -> String {
    let base = remove_basepath(basepath, base, case_sensitive);
    let to = remove_basepath(basepath, to, case_sensitive);

    let mut out: Vec<Segment> = cache.route_segments(&base).to_vec();
    let to_segments = cache.route_segments(&to);

    if out.len() > 1 && out.last().is_some_and(Segment::is_slash) {
        out.pop();
    }

    let len = to_segments.len();
    for (index, segment) in to_segments.iter().enumerate() {
        match segment.value.as_str() {
            "/" if segment.kind == SegmentKind::Static => {
                if index == 0 {
                    out = vec![segment.clone()];
                } else if index == len - 1 {
                    out.push(segment.clone());
                }
            }
            ".." if segment.kind == SegmentKind::Static => {
                out.pop();
            }
            "." if segment.kind == SegmentKind::Static => {}
            _ => out.push(segment.clone()),
        }
    }

    if out.len() > 1 {
        if out.last().is_some_and(Segment::is_slash) {
            if trailing_slash == TrailingSlash::Never {
                out.pop();
            }
        } else if trailing_slash == TrailingSlash::Always {
            out.push(Segment::literal("/"));
        }
    }

    let mut pieces = vec![basepath.to_string()];
    pieces.extend(out.iter().map(Segment::to_template));
    clean_path(&join_paths(pieces))
}
