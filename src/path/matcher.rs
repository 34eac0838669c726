//! Pathname-against-template matching.
//!
//! # Responsibilities
//! - Walk pathname and template segments pairwise, left to right
//! - Extract and decode params (`*`/`_splat` for wildcards, `**` for fuzzy leftovers)
//! - Decide optional-param ownership with a forward scan of the template
//!
//! # Design Decisions
//! - Ordered consumption rather than a compiled regex: an optional param must
//!   yield its token when a later static segment wants it
//! - Static comparison is case-insensitive unless requested otherwise
//! - Params are URL-decoded once, here

use percent_encoding::percent_decode_str;

use crate::path::segment::{PathCache, Segment, SegmentKind};
use crate::path::{join_paths, remove_basepath, Params};

/// Key under which a wildcard capture is stored.
pub const SPLAT: &str = "_splat";
/// Legacy alias of [`SPLAT`].
pub const SPLAT_LEGACY: &str = "*";
/// Key under which a fuzzy match exposes the unmatched remainder.
pub const FUZZY_REST: &str = "**";

/// Options for a single match attempt.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions<'a> {
    /// Route template; `None` behaves like a bare wildcard.
    pub to: Option<&'a str>,
    pub fuzzy: bool,
    pub case_sensitive: bool,
}

/// Match `pathname` against `opts.to`. Returns the captured params on success.
///
/// Without a template every pathname matches with empty params.
pub fn match_pathname(
    cache: &PathCache,
    basepath: &str,
    pathname: &str,
    opts: &MatchOptions<'_>,
) -> Option<Params> {
    let params = match_by_path(cache, basepath, pathname, opts);
    if opts.to.is_some() && params.is_none() {
        return None;
    }
    Some(params.unwrap_or_default())
}

/// Match a concrete pathname (which must live under `basepath`) against a template.
pub fn match_by_path(
    cache: &PathCache,
    basepath: &str,
    pathname: &str,
    opts: &MatchOptions<'_>,
) -> Option<Params> {
    if basepath != "/" && !basepath.is_empty() {
        let under = if opts.case_sensitive {
            pathname.starts_with(basepath)
        } else {
            pathname
                .get(..basepath.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(basepath))
        };
        if !under {
            return None;
        }
    }
    let from = remove_basepath(basepath, pathname, opts.case_sensitive);
    let to = remove_basepath(basepath, opts.to.unwrap_or("$"), opts.case_sensitive);

    let base = cache.base_segments(&with_leading_slash(&from));
    let route = cache.route_segments(&with_leading_slash(&to));

    let mut params = Params::new();
    is_match(&base, &route, &mut params, opts.fuzzy, opts.case_sensitive).then_some(params)
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Strip declared prefix/suffix from `value`; `None` when they are absent.
fn strip_affixes<'v>(segment: &Segment, value: &'v str) -> Option<&'v str> {
    let prefix = segment.prefix.as_deref().unwrap_or("");
    let suffix = segment.suffix.as_deref().unwrap_or("");
    let rest = value.strip_prefix(prefix)?;
    rest.strip_suffix(suffix)
}

fn eq_segment(route: &str, base: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        route == base
    } else {
        route.to_lowercase() == base.to_lowercase()
    }
}

/// Core pairwise walk. Fills `params` as it goes.
pub(crate) fn is_match(
    base: &[Segment],
    route: &[Segment],
    params: &mut Params,
    fuzzy: bool,
    case_sensitive: bool,
) -> bool {
    let mut bi = 0;
    let mut ri = 0;

    while bi < base.len() || ri < route.len() {
        let base_seg = base.get(bi);

        if let Some(route_seg) = route.get(ri) {
            match route_seg.kind {
                SegmentKind::Wildcard => {
                    let rest = &base[bi.min(base.len())..];
                    let remaining = join_paths(rest.iter().map(|s| s.value.as_str()));
                    let splat = if route_seg.has_affixes() {
                        if base_seg.is_none() {
                            return false;
                        }
                        match strip_affixes(route_seg, &remaining) {
                            Some(inner) => decode_component(inner),
                            None => return false,
                        }
                    } else {
                        decode_component(&remaining)
                    };
                    params.insert(SPLAT_LEGACY.to_string(), splat.clone());
                    params.insert(SPLAT.to_string(), splat);
                    return true;
                }
                SegmentKind::Static => {
                    if route_seg.value == "/" && base_seg.map_or(true, |b| b.value.is_empty()) {
                        ri += 1;
                        continue;
                    }
                    match base_seg {
                        Some(b) if eq_segment(&route_seg.value, &b.value, case_sensitive) => {
                            bi += 1;
                            ri += 1;
                            continue;
                        }
                        _ => return false,
                    }
                }
                SegmentKind::Param => {
                    let Some(b) = base_seg else { return false };
                    if b.value == "/" {
                        return false;
                    }
                    let raw = if route_seg.has_affixes() {
                        match strip_affixes(route_seg, &b.value) {
                            Some(inner) => inner,
                            None => return false,
                        }
                    } else {
                        b.value.as_str()
                    };
                    params.insert(route_seg.value.clone(), decode_component(raw));
                    bi += 1;
                    ri += 1;
                    continue;
                }
                SegmentKind::OptionalParam => {
                    let Some(b) = base_seg else {
                        ri += 1;
                        continue;
                    };
                    if b.value == "/" {
                        ri += 1;
                        continue;
                    }
                    let captured = if route_seg.has_affixes() {
                        strip_affixes(route_seg, &b.value).map(decode_component)
                    } else if optional_owns_token(base, route, ri, &b.value) {
                        Some(decode_component(&b.value))
                    } else {
                        None
                    };
                    if let Some(value) = captured {
                        params.insert(route_seg.value.clone(), value);
                        bi += 1;
                    }
                    ri += 1;
                    continue;
                }
            }
        }

        // template exhausted with pathname left over
        if bi < base.len() && ri >= route.len() {
            let rest = base[bi..].iter().map(|s| s.value.as_str()).collect::<Vec<_>>();
            params.insert(FUZZY_REST.to_string(), join_paths(rest));
            return fuzzy && route.last().map_or(true, |s| !s.is_slash());
        }

        // pathname exhausted with template left over
        if ri < route.len() && bi >= base.len() {
            return route[ri..]
                .iter()
                .all(|s| s.kind == SegmentKind::OptionalParam);
        }

        break;
    }

    true
}

/// Forward scan deciding whether the optional param at `ri` should consume
/// `token`, or leave it for a later template segment.
fn optional_owns_token(base: &[Segment], route: &[Segment], ri: usize, token: &str) -> bool {
    for future in &route[ri + 1..] {
        match future.kind {
            SegmentKind::Static if future.value == token => return false,
            SegmentKind::Param | SegmentKind::Wildcard => {
                return base.len() >= route.len();
            }
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::interpolate_path;

    fn m(path: &str, to: &str, fuzzy: bool) -> Option<Params> {
        let cache = PathCache::default();
        match_by_path(
            &cache,
            "/",
            path,
            &MatchOptions {
                to: Some(to),
                fuzzy,
                case_sensitive: false,
            },
        )
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_static_and_param() {
        assert_eq!(m("/posts/42", "/posts/$postId", false), Some(params(&[("postId", "42")])));
        assert_eq!(m("/posts", "/posts/$postId", false), None);
        assert_eq!(m("/POSTS/1", "/posts/$id", false), Some(params(&[("id", "1")])));
    }

    #[test]
    fn test_case_sensitive() {
        let cache = PathCache::default();
        let opts = MatchOptions {
            to: Some("/Posts"),
            fuzzy: false,
            case_sensitive: true,
        };
        assert!(match_by_path(&cache, "/", "/posts", &opts).is_none());
        assert!(match_by_path(&cache, "/", "/Posts", &opts).is_some());
    }

    #[test]
    fn test_param_is_decoded() {
        assert_eq!(m("/u/a%20b", "/u/$name", false), Some(params(&[("name", "a b")])));
    }

    #[test]
    fn test_wildcard() {
        let p = m("/files/a/b/c.txt", "/files/$", false).unwrap();
        assert_eq!(p.get("_splat").map(String::as_str), Some("a/b/c.txt"));
        assert_eq!(p.get("*").map(String::as_str), Some("a/b/c.txt"));
    }

    #[test]
    fn test_wildcard_remainder_has_single_slashes() {
        let p = m("/files/a/b/", "/files/$", false).unwrap();
        assert_eq!(p.get("_splat").map(String::as_str), Some("a/b/"));
    }

    #[test]
    fn test_wildcard_with_affixes() {
        let p = m("/files/a/b.json", "/files/{$}.json", false).unwrap();
        assert_eq!(p.get("_splat").map(String::as_str), Some("a/b"));
        assert!(m("/files/a/b.txt", "/files/{$}.json", false).is_none());
        assert!(m("/files", "/files/pre{$}", false).is_none());
    }

    #[test]
    fn test_param_with_affixes() {
        assert_eq!(
            m("/img/photo-12.png", "/img/photo-{$id}.png", false),
            Some(params(&[("id", "12")]))
        );
        assert!(m("/img/pic-12.png", "/img/photo-{$id}.png", false).is_none());
    }

    #[test]
    fn test_fuzzy_leftover() {
        assert_eq!(m("/posts/42/edit", "/posts/$postId", false), None);
        let p = m("/posts/42/edit", "/posts/$postId", true).unwrap();
        assert_eq!(p.get("postId").map(String::as_str), Some("42"));
        assert_eq!(p.get("**").map(String::as_str), Some("edit"));
    }

    #[test]
    fn test_fuzzy_refused_after_trailing_slash_template() {
        assert!(m("/posts/42", "/posts/", true).is_none());
    }

    #[test]
    fn test_trailing_slash_in_template_tolerates_missing() {
        assert!(m("/posts", "/posts/", false).is_some());
    }

    #[test]
    fn test_optional_param_present_and_absent() {
        assert_eq!(m("/en/about", "/{-$lang}/about", false), Some(params(&[("lang", "en")])));
        assert_eq!(m("/about", "/{-$lang}/about", false), Some(params(&[])));
        assert_eq!(m("/posts", "/posts/{-$page}", false), Some(params(&[])));
    }

    #[test]
    fn test_optional_param_defers_to_later_static() {
        // "edit" belongs to the trailing literal, not the optional param
        assert_eq!(m("/posts/edit", "/posts/{-$id}/edit", false), Some(params(&[])));
        assert_eq!(
            m("/posts/5/edit", "/posts/{-$id}/edit", false),
            Some(params(&[("id", "5")]))
        );
    }

    #[test]
    fn test_optional_param_defers_to_required_param_when_short() {
        assert_eq!(
            m("/docs/intro", "/docs/{-$version}/$page", false),
            Some(params(&[("page", "intro")]))
        );
        assert_eq!(
            m("/docs/v2/intro", "/docs/{-$version}/$page", false),
            Some(params(&[("version", "v2"), ("page", "intro")]))
        );
    }

    #[test]
    fn test_adjacent_optionals_then_wildcard() {
        // short pathname: both optionals yield to the wildcard
        let p = m("/a/x", "/a/{-$one}/{-$two}/$", false).unwrap();
        assert_eq!(p.get("_splat").map(String::as_str), Some("x"));
        assert!(!p.contains_key("one"));
        // long pathname: optionals consume in order, wildcard takes the rest
        let p = m("/a/x/y/z/w", "/a/{-$one}/{-$two}/$", false).unwrap();
        assert_eq!(p.get("one").map(String::as_str), Some("x"));
        assert_eq!(p.get("two").map(String::as_str), Some("y"));
        assert_eq!(p.get("_splat").map(String::as_str), Some("z/w"));
    }

    #[test]
    fn test_basepath_is_required() {
        let cache = PathCache::default();
        let opts = MatchOptions {
            to: Some("/posts"),
            fuzzy: false,
            case_sensitive: false,
        };
        assert!(match_by_path(&cache, "/app", "/app/posts", &opts).is_some());
        assert!(match_by_path(&cache, "/app", "/posts", &opts).is_none());
    }

    #[test]
    fn test_interpolate_then_match_round_trip() {
        let cases: &[(&str, &[(&str, &str)])] = &[
            ("/posts/$postId", &[("postId", "42")]),
            ("/u/$user/repos/$repo", &[("user", "ann smith"), ("repo", "a/b")]),
            ("/files/pre{$name}.txt", &[("name", "notes")]),
            ("/", &[]),
        ];
        let cache = PathCache::default();
        for (template, pairs) in cases {
            let p = params(pairs);
            let built = interpolate_path(&cache, template, &p, Default::default());
            let back = match_by_path(
                &cache,
                "/",
                &built.path,
                &MatchOptions {
                    to: Some(template),
                    fuzzy: false,
                    case_sensitive: true,
                },
            );
            assert_eq!(back, Some(p), "template {template} built {}", built.path);
        }
    }
}
