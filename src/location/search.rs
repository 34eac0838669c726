//! Query string codec and search middlewares.
//!
//! Values that parse as JSON are kept typed (`?page=2` → `2`, `?f={"a":1}` →
//! object); everything else stays a string. Stringifying reverses this, and
//! quotes strings that would otherwise be read back as another type.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::form_urlencoded;

use crate::location::Search;

/// Custom query string parser.
pub type SearchParser = Arc<dyn Fn(&str) -> Search + Send + Sync>;

/// Custom query string serializer. Must return `""` or a string starting with `?`.
pub type SearchStringifier = Arc<dyn Fn(&Search) -> String + Send + Sync>;

/// Parse `?a=1&b=x` (leading `?` optional).
pub fn default_parse_search(query: &str) -> Search {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut search = Search::new();
    for (key, raw) in form_urlencoded::parse(query.as_bytes()) {
        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(raw.into_owned()),
        };
        search.insert(key.into_owned(), value);
    }
    search
}

/// Serialize a search map. Null values are dropped.
pub fn default_stringify_search(search: &Search) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in search {
        let encoded = match value {
            Value::Null => continue,
            Value::String(s) if serde_json::from_str::<Value>(s).is_err() => s.clone(),
            other => other.to_string(),
        };
        out.append_pair(key, &encoded);
        any = true;
    }
    if any {
        format!("?{}", out.finish())
    } else {
        String::new()
    }
}

/// How a navigation derives its search from the current one.
#[derive(Clone, Default)]
pub enum SearchUpdate {
    /// Start from an empty search.
    #[default]
    Clear,
    /// Keep the current search as is.
    Keep,
    Replace(Search),
    Update(Arc<dyn Fn(&Search) -> Search + Send + Sync>),
}

impl SearchUpdate {
    pub fn update<F>(f: F) -> Self
    where
        F: Fn(&Search) -> Search + Send + Sync + 'static,
    {
        Self::Update(Arc::new(f))
    }

    pub fn apply(&self, current: &Search) -> Search {
        match self {
            Self::Clear => Search::new(),
            Self::Keep => current.clone(),
            Self::Replace(search) => search.clone(),
            Self::Update(f) => f(current),
        }
    }
}

impl fmt::Debug for SearchUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => f.write_str("Clear"),
            Self::Keep => f.write_str("Keep"),
            Self::Replace(s) => f.debug_tuple("Replace").field(s).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// Argument handed to a search middleware.
pub struct MiddlewareCtx<'a> {
    pub search: Search,
    next: &'a dyn Fn(Search) -> Search,
}

impl<'a> MiddlewareCtx<'a> {
    pub fn new(search: Search, next: &'a dyn Fn(Search) -> Search) -> Self {
        Self { search, next }
    }

    /// Run the rest of the chain.
    pub fn next(&self, search: Search) -> Search {
        (self.next)(search)
    }
}

/// One link of the search chain built for `build_location`.
pub type SearchMiddleware = Arc<dyn Fn(MiddlewareCtx<'_>) -> Search + Send + Sync>;

/// Keep `keys` from the current search when the destination drops them.
/// An empty key list retains every current key.
pub fn retain_search_params(keys: &[&str]) -> SearchMiddleware {
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    Arc::new(move |ctx: MiddlewareCtx<'_>| {
        let current = ctx.search.clone();
        let mut result = ctx.next(ctx.search.clone());
        for (key, value) in current {
            if (keys.is_empty() || keys.contains(&key)) && !result.contains_key(&key) {
                result.insert(key, value);
            }
        }
        result
    })
}

/// Remove `keys` from the outgoing search.
pub fn strip_search_params(keys: &[&str]) -> SearchMiddleware {
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    Arc::new(move |ctx: MiddlewareCtx<'_>| {
        let mut result = ctx.next(ctx.search.clone());
        result.retain(|key, _| !keys.contains(key));
        result
    })
}

/// Remove keys whose outgoing value equals the given default.
pub fn strip_default_search_params(defaults: Search) -> SearchMiddleware {
    Arc::new(move |ctx: MiddlewareCtx<'_>| {
        let mut result = ctx.next(ctx.search.clone());
        result.retain(|key, value| defaults.get(key) != Some(value));
        result
    })
}

/// Run `middlewares` in order, ending with `last`.
pub fn run_middlewares(
    middlewares: &[SearchMiddleware],
    search: Search,
    last: &dyn Fn(Search) -> Search,
) -> Search {
    match middlewares.split_first() {
        None => last(search),
        Some((head, rest)) => {
            let next = |s: Search| run_middlewares(rest, s, last);
            head(MiddlewareCtx::new(search, &next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search(v: Value) -> Search {
        match v {
            Value::Object(map) => map,
            _ => Search::new(),
        }
    }

    #[test]
    fn test_parse_typed_values() {
        let s = default_parse_search("?page=2&q=hello%20world&flag=true&f=%7B%22a%22%3A1%7D");
        assert_eq!(s["page"], json!(2));
        assert_eq!(s["q"], json!("hello world"));
        assert_eq!(s["flag"], json!(true));
        assert_eq!(s["f"], json!({"a": 1}));
    }

    #[test]
    fn test_stringify_quotes_ambiguous_strings() {
        let s = search(json!({"page": 2, "id": "2", "q": "rust"}));
        let out = default_stringify_search(&s);
        assert_eq!(out, "?id=%222%22&page=2&q=rust");
        assert_eq!(default_parse_search(&out), s);
    }

    #[test]
    fn test_stringify_empty() {
        assert_eq!(default_stringify_search(&Search::new()), "");
        assert_eq!(default_stringify_search(&search(json!({"a": null}))), "");
    }

    #[test]
    fn test_search_update() {
        let current = search(json!({"a": 1}));
        assert!(SearchUpdate::Clear.apply(&current).is_empty());
        assert_eq!(SearchUpdate::Keep.apply(&current), current);
        let bumped = SearchUpdate::update(|s| {
            let mut s = s.clone();
            s.insert("b".into(), json!(2));
            s
        })
        .apply(&current);
        assert_eq!(bumped, search(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_middleware_chain() {
        let chain = vec![retain_search_params(&["theme"]), strip_search_params(&["debug"])];
        let current = search(json!({"theme": "dark", "page": 3}));
        let out = run_middlewares(&chain, current, &|_| search(json!({"debug": 1, "q": "x"})));
        assert_eq!(out, search(json!({"theme": "dark", "q": "x"})));
    }

    #[test]
    fn test_strip_defaults() {
        let chain = vec![strip_default_search_params(search(json!({"page": 1})))];
        let out = run_middlewares(&chain, Search::new(), &|_| search(json!({"page": 1, "q": "a"})));
        assert_eq!(out, search(json!({"q": "a"})));
        let out = run_middlewares(&chain, Search::new(), &|_| search(json!({"page": 2})));
        assert_eq!(out, search(json!({"page": 2})));
    }
}
