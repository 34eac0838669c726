//! Route specificity ranking.
//!
//! # Responsibilities
//! - Score each segment of a route's full path
//! - Order routes most-specific first, deterministically
//!
//! # Design Decisions
//! - Scores are compared as vectors, first difference wins
//! - Prefix/suffix bonuses are tiny so they only break ties between
//!   otherwise equal dynamic segments
//! - Final tie-breaks are segment text and declaration order, so the
//!   ordering is total and stable

use std::cmp::Ordering;

use crate::path::{trim_path_left, PathCache, Segment, SegmentKind, Segments};

const SLASH_SCORE: f64 = 0.75;
const STATIC_SCORE: f64 = 1.0;
const PARAM_SCORE: f64 = 0.5;
const OPTIONAL_PARAM_SCORE: f64 = 0.4;
const WILDCARD_SCORE: f64 = 0.25;
const STATIC_AFTER_BONUS: f64 = 0.2;
const PREFIX_BONUS: f64 = 0.02;
const SUFFIX_BONUS: f64 = 0.01;
const PREFIX_CHAR_BONUS: f64 = 0.0002;
const SUFFIX_CHAR_BONUS: f64 = 0.0001;

/// Score vector and tie-break data for one route.
#[derive(Debug, Clone)]
pub struct RouteScore {
    /// Declaration index of the route.
    pub index: usize,
    pub segments: Segments,
    pub scores: Vec<f64>,
    pub optional_params: usize,
    /// Some dynamic segment is followed by a non-slash static segment.
    pub has_static_after: bool,
}

impl RouteScore {
    pub fn new(cache: &PathCache, full_path: &str, index: usize) -> Self {
        let trimmed = trim_path_left(full_path);
        let parsed = cache.route_segments(&trimmed);
        let mut start = 0;
        while parsed.len() - start > 1 && parsed[start].is_slash() {
            start += 1;
        }
        let segments: Segments = parsed[start..].into();

        let mut optional_params = 0;
        let mut has_static_after = false;
        let scores = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if segment.is_slash() {
                    return SLASH_SCORE;
                }
                let base = match segment.kind {
                    SegmentKind::Static => return STATIC_SCORE,
                    SegmentKind::Param => PARAM_SCORE,
                    SegmentKind::OptionalParam => {
                        optional_params += 1;
                        OPTIONAL_PARAM_SCORE
                    }
                    SegmentKind::Wildcard => WILDCARD_SCORE,
                };
                let static_after = segments[i + 1..]
                    .iter()
                    .any(|s| s.kind == SegmentKind::Static && !s.is_slash());
                if static_after {
                    has_static_after = true;
                    affix_score(segment, base + STATIC_AFTER_BONUS)
                } else {
                    affix_score(segment, base)
                }
            })
            .collect();

        Self {
            index,
            segments,
            scores,
            optional_params,
            has_static_after,
        }
    }
}

fn affix_score(segment: &Segment, base: f64) -> f64 {
    let mut score = base;
    if let Some(prefix) = &segment.prefix {
        score += PREFIX_BONUS + PREFIX_CHAR_BONUS * prefix.len() as f64;
    }
    if let Some(suffix) = &segment.suffix {
        score += SUFFIX_BONUS + SUFFIX_CHAR_BONUS * suffix.len() as f64;
    }
    score
}

/// Most-specific first.
pub fn compare(a: &RouteScore, b: &RouteScore) -> Ordering {
    for (x, y) in a.scores.iter().zip(&b.scores) {
        if x != y {
            return y.partial_cmp(x).unwrap_or(Ordering::Equal);
        }
    }

    if a.scores.len() != b.scores.len() {
        if a.optional_params != b.optional_params {
            match (a.has_static_after, b.has_static_after) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => return a.optional_params.cmp(&b.optional_params),
            }
        }
        return b.scores.len().cmp(&a.scores.len());
    }

    for (x, y) in a.segments.iter().zip(b.segments.iter()) {
        if x.value != y.value {
            return x.value.cmp(&y.value);
        }
    }
    a.index.cmp(&b.index)
}

/// Rank `(declaration index, full path)` pairs. Returns declaration indices,
/// most specific first.
pub fn rank_routes<'a, I>(cache: &PathCache, routes: I) -> Vec<usize>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut scored: Vec<RouteScore> = routes
        .into_iter()
        .map(|(index, full_path)| RouteScore::new(cache, full_path, index))
        .collect();
    scored.sort_by(compare);
    scored.into_iter().map(|s| s.index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(paths: &[&str]) -> Vec<String> {
        let cache = PathCache::default();
        rank_routes(&cache, paths.iter().copied().enumerate())
            .into_iter()
            .map(|i| paths[i].to_string())
            .collect()
    }

    #[test]
    fn test_static_beats_dynamic() {
        assert_eq!(rank(&["/posts/$id", "/posts/new"]), vec!["/posts/new", "/posts/$id"]);
        assert_eq!(rank(&["/$a", "/about"]), vec!["/about", "/$a"]);
    }

    #[test]
    fn test_param_beats_optional_beats_wildcard() {
        assert_eq!(
            rank(&["/files/$", "/files/{-$o}", "/files/$id"]),
            vec!["/files/$id", "/files/{-$o}", "/files/$"]
        );
    }

    #[test]
    fn test_static_after_dynamic_bonus() {
        assert_eq!(
            rank(&["/$org/$repo", "/$org/settings"]),
            vec!["/$org/settings", "/$org/$repo"]
        );
        // a wildcard followed by a literal beats a bare wildcard
        assert_eq!(rank(&["/$", "/$/edit"]), vec!["/$/edit", "/$"]);
    }

    #[test]
    fn test_longer_wins_on_prefix_tie() {
        assert_eq!(rank(&["/posts", "/posts/$id"]), vec!["/posts/$id", "/posts"]);
        assert_eq!(rank(&["/posts", "/posts/"]), vec!["/posts/", "/posts"]);
    }

    #[test]
    fn test_fewer_optionals_win_on_prefix_tie() {
        assert_eq!(
            rank(&["/a/{-$x}/{-$y}", "/a/{-$x}"]),
            vec!["/a/{-$x}", "/a/{-$x}/{-$y}"]
        );
    }

    #[test]
    fn test_affix_bonuses_only_break_ties() {
        assert_eq!(
            rank(&["/f/$id", "/f/{$id}.json", "/f/img{$id}"]),
            vec!["/f/img{$id}", "/f/{$id}.json", "/f/$id"]
        );
        // never outranks a static segment
        assert_eq!(rank(&["/f/img{$id}", "/f/x"]), vec!["/f/x", "/f/img{$id}"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let paths = ["/", "/a/$b", "/a/$c", "/$x/y", "/a", "/a/{-$d}", "/$"];
        let first = rank(&paths);
        let second = rank(&paths);
        assert_eq!(first, second);
        // equal scores fall back to segment text
        let b = first.iter().position(|p| p == "/a/$b");
        let c = first.iter().position(|p| p == "/a/$c");
        assert!(b < c);
    }
}
