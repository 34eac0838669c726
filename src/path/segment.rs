//! Path template tokenizer.
//!
//! Grammar per `/`-separated part:
//! - `$`, `{$}`, `pre{$}post` → wildcard
//! - `{-$name}`, `pre{-$name}post` → optional param
//! - `$name`, `{$name}`, `pre{$name}post` → required param
//! - anything else → static text (percent-decoded, `%25` preserved)

use percent_encoding::percent_decode_str;
use std::sync::Arc;

use crate::path::clean_path;
use crate::path::lru::Memoizer;

const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Kind of a parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Static,
    Param,
    OptionalParam,
    Wildcard,
}

/// One parsed piece of a path.
///
/// For params `value` holds the bare name (no `$`); for wildcards it is `$`;
/// for static segments it is the literal text, with `/` denoting a leading or
/// trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl Segment {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Static,
            value: value.into(),
            prefix: None,
            suffix: None,
        }
    }

    fn dynamic(kind: SegmentKind, value: &str, prefix: &str, suffix: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            kind,
            value: value.to_string(),
            prefix: non_empty(prefix),
            suffix: non_empty(suffix),
        }
    }

    pub fn is_slash(&self) -> bool {
        self.kind == SegmentKind::Static && self.value == "/"
    }

    pub fn has_affixes(&self) -> bool {
        self.prefix.is_some() || self.suffix.is_some()
    }

    /// Render the segment back into template syntax.
    pub fn to_template(&self) -> String {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let suffix = self.suffix.as_deref().unwrap_or("");
        match self.kind {
            SegmentKind::Static => self.value.clone(),
            SegmentKind::Wildcard if self.has_affixes() => format!("{prefix}{{$}}{suffix}"),
            SegmentKind::Wildcard => "$".to_string(),
            SegmentKind::Param if self.has_affixes() => {
                format!("{prefix}{{${}}}{suffix}", self.value)
            }
            SegmentKind::Param => format!("${}", self.value),
            SegmentKind::OptionalParam => format!("{prefix}{{-${}}}{suffix}", self.value),
        }
    }
}

/// Parsed segment sequence, shared between cache and callers.
pub type Segments = Arc<[Segment]>;

/// Memoized parsers for concrete pathnames and route templates.
#[derive(Debug)]
pub struct PathCache {
    base: Memoizer<String, Segments>,
    route: Memoizer<String, Segments>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl PathCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            base: Memoizer::new(capacity),
            route: Memoizer::new(capacity),
        }
    }

    /// Parse a concrete pathname. Every part is literal; `$` has no meaning.
    pub fn base_segments(&self, pathname: &str) -> Segments {
        self.base
            .get_or_compute(pathname, || parse_pathname(pathname, false).into())
    }

    /// Parse a route template.
    pub fn route_segments(&self, template: &str) -> Segments {
        self.route
            .get_or_compute(template, || parse_pathname(template, true).into())
    }
}

/// Tokenize `pathname`. Leading and trailing slashes become `/` segments.
pub fn parse_pathname(pathname: &str, template: bool) -> Vec<Segment> {
    if pathname.is_empty() {
        return Vec::new();
    }
    let cleaned = clean_path(pathname);
    let mut rest = cleaned.as_str();
    let mut segments = Vec::new();

    if let Some(stripped) = rest.strip_prefix('/') {
        rest = stripped;
        segments.push(Segment::literal("/"));
    }
    if rest.is_empty() {
        return segments;
    }

    for part in rest.split('/').filter(|p| !p.is_empty()) {
        let segment = if template {
            parse_template_part(part)
        } else {
            Segment::literal(decode_part(part))
        };
        segments.push(segment);
    }

    if rest.ends_with('/') {
        segments.push(Segment::literal("/"));
    }
    segments
}

fn parse_template_part(part: &str) -> Segment {
    if let Some(idx) = part.find("{$}") {
        return Segment::dynamic(SegmentKind::Wildcard, "$", &part[..idx], &part[idx + 3..]);
    }
    if let Some((prefix, name, suffix)) = find_braced(part, "{-$") {
        return Segment::dynamic(SegmentKind::OptionalParam, name, prefix, suffix);
    }
    if let Some((prefix, name, suffix)) = find_braced(part, "{$") {
        return Segment::dynamic(SegmentKind::Param, name, prefix, suffix);
    }
    if part == "$" {
        return Segment::dynamic(SegmentKind::Wildcard, "$", "", "");
    }
    if let Some(name) = part.strip_prefix('$') {
        return Segment::dynamic(SegmentKind::Param, name, "", "");
    }
    Segment::literal(decode_part(part))
}

/// Find the first `<open>ident}` occurrence and split the part around it.
fn find_braced<'a>(part: &'a str, open: &str) -> Option<(&'a str, &'a str, &'a str)> {
    let mut from = 0;
    while let Some(rel) = part[from..].find(open) {
        let start = from + rel;
        let name_start = start + open.len();
        let name_len = ident_len(&part[name_start..]);
        let close = name_start + name_len;
        if name_len > 0 && part[close..].starts_with('}') {
            return Some((&part[..start], &part[name_start..close], &part[close + 1..]));
        }
        from = start + 1;
    }
    None
}

fn ident_len(s: &str) -> usize {
    let mut len = 0;
    for (i, ch) in s.char_indices() {
        let ok = if i == 0 {
            ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
        };
        if !ok {
            break;
        }
        len = i + ch.len_utf8();
    }
    len
}

/// Decode a static part; an encoded `%` stays encoded so it is not decoded twice.
fn decode_part(part: &str) -> String {
    if !part.contains('%') {
        return part.to_string();
    }
    part.split("%25")
        .map(|piece| percent_decode_str(piece).decode_utf8_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("%25")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(segments: &[Segment]) -> Vec<(SegmentKind, &str)> {
        segments.iter().map(|s| (s.kind, s.value.as_str())).collect()
    }

    #[test]
    fn test_parse_params_and_wildcards() {
        let segs = parse_pathname("/posts/$postId/{-$lang}/$", true);
        assert_eq!(
            kinds(&segs),
            vec![
                (SegmentKind::Static, "/"),
                (SegmentKind::Static, "posts"),
                (SegmentKind::Param, "postId"),
                (SegmentKind::OptionalParam, "lang"),
                (SegmentKind::Wildcard, "$"),
            ]
        );
    }

    #[test]
    fn test_parse_affixes() {
        let segs = parse_pathname("/files/prefix{$id}.txt/img{$}", true);
        assert_eq!(segs[2].kind, SegmentKind::Param);
        assert_eq!(segs[2].value, "id");
        assert_eq!(segs[2].prefix.as_deref(), Some("prefix"));
        assert_eq!(segs[2].suffix.as_deref(), Some(".txt"));
        assert_eq!(segs[3].kind, SegmentKind::Wildcard);
        assert_eq!(segs[3].prefix.as_deref(), Some("img"));
        assert_eq!(segs[3].suffix, None);
    }

    #[test]
    fn test_trailing_slash_is_kept() {
        let segs = parse_pathname("/posts/", true);
        assert_eq!(kinds(&segs), vec![(SegmentKind::Static, "/"), (SegmentKind::Static, "posts"), (SegmentKind::Static, "/")]);
    }

    #[test]
    fn test_base_parsing_is_literal() {
        let segs = parse_pathname("/a/$b", false);
        assert_eq!(segs[2].kind, SegmentKind::Static);
        assert_eq!(segs[2].value, "$b");
    }

    #[test]
    fn test_percent_decoding_preserves_encoded_percent() {
        let segs = parse_pathname("/caf%C3%A9/100%25", false);
        assert_eq!(segs[1].value, "café");
        assert_eq!(segs[2].value, "100%25");
    }

    #[test]
    fn test_unrecognized_brace_is_static() {
        let segs = parse_pathname("/{oops}", true);
        assert_eq!(segs[1].kind, SegmentKind::Static);
        assert_eq!(segs[1].value, "{oops}");
    }

    #[test]
    fn test_template_round_trip() {
        for t in ["$id", "{-$lang}", "pre{$id}.json", "{$}", "$", "x{-$o}y"] {
            let seg = parse_template_part(t);
            assert_eq!(parse_template_part(&seg.to_template()), seg, "template {t}");
        }
    }

    #[test]
    fn test_cache_returns_shared_segments() {
        let cache = PathCache::default();
        let a = cache.route_segments("/a/$b");
        let b = cache.route_segments("/a/$b");
        assert!(Arc::ptr_eq(&a, &b));
        // base and route parses are kept apart
        assert_eq!(cache.base_segments("/a/$b")[2].kind, SegmentKind::Static);
    }
}
