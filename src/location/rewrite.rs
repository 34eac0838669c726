//! Incoming/outgoing URL rewriting.
//!
//! Input rewrites run when a history entry is parsed into a [`Location`];
//! output rewrites run when a built location is turned into its public
//! href. The basepath is just one rewrite pair.
//!
//! [`Location`]: crate::location::Location

use std::fmt;
use std::sync::Arc;
use url::{Position, Url};

use crate::path::{join_paths, remove_basepath};

const BASE_ORIGIN: &str = "http://localhost";

/// Transform applied to a URL; return it unchanged to opt out.
pub type UrlRewriteFn = Arc<dyn Fn(Url) -> Url + Send + Sync>;

#[derive(Clone, Default)]
pub struct Rewrite {
    pub input: Option<UrlRewriteFn>,
    pub output: Option<UrlRewriteFn>,
}

impl fmt::Debug for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewrite")
            .field("input", &self.input.is_some())
            .field("output", &self.output.is_some())
            .finish()
    }
}

impl Rewrite {
    pub fn new<I, O>(input: I, output: O) -> Self
    where
        I: Fn(Url) -> Url + Send + Sync + 'static,
        O: Fn(Url) -> Url + Send + Sync + 'static,
    {
        Self {
            input: Some(Arc::new(input)),
            output: Some(Arc::new(output)),
        }
    }

    /// Strip `basepath` on the way in, reattach it on the way out.
    pub fn basepath(basepath: &str, case_sensitive: bool) -> Self {
        let base = basepath.trim_end_matches('/').to_string();
        if base.is_empty() {
            return Self::default();
        }
        let strip = base.clone();
        Self::new(
            move |mut url| {
                let path = remove_basepath(&strip, url.path(), case_sensitive);
                url.set_path(&path);
                url
            },
            move |mut url| {
                let path = join_paths([base.as_str(), url.path()]);
                url.set_path(&path);
                url
            },
        )
    }

    /// Chain two rewrites: `self` is closest to the public URL.
    ///
    /// Input runs `self` then `inner`; output runs `inner` then `self`.
    pub fn compose(self, inner: Rewrite) -> Self {
        Self {
            input: chain(self.input, inner.input),
            output: chain(inner.output, self.output),
        }
    }

    /// Public href → internal href.
    pub fn apply_input(&self, href: &str) -> String {
        apply(self.input.as_ref(), href)
    }

    /// Internal href → public href. Cross-origin results come back absolute.
    pub fn apply_output(&self, href: &str) -> String {
        apply(self.output.as_ref(), href)
    }
}

fn chain(first: Option<UrlRewriteFn>, second: Option<UrlRewriteFn>) -> Option<UrlRewriteFn> {
    match (first, second) {
        (Some(a), Some(b)) => Some(Arc::new(move |url: Url| b(a(url)))),
        (a, None) => a,
        (None, b) => b,
    }
}

fn apply(rewrite: Option<&UrlRewriteFn>, href: &str) -> String {
    let Some(rewrite) = rewrite else {
        return href.to_string();
    };
    let Ok(base) = Url::parse(BASE_ORIGIN) else {
        return href.to_string();
    };
    let Ok(url) = base.join(href) else {
        return href.to_string();
    };
    let out = rewrite(url);
    if out.origin() == base.origin() {
        out[Position::BeforePath..].to_string()
    } else {
        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basepath_round_trip() {
        let rw = Rewrite::basepath("/app", false);
        assert_eq!(rw.apply_input("/app/posts?x=1#h"), "/posts?x=1#h");
        assert_eq!(rw.apply_input("/app"), "/");
        assert_eq!(rw.apply_output("/posts?x=1"), "/app/posts?x=1");
        assert_eq!(rw.apply_output("/"), "/app/");
    }

    #[test]
    fn test_root_basepath_is_noop() {
        let rw = Rewrite::basepath("/", false);
        assert!(rw.input.is_none());
        assert_eq!(rw.apply_output("/a"), "/a");
    }

    #[test]
    fn test_cross_origin_output_is_absolute() {
        let rw = Rewrite::new(
            |url| url,
            |mut url| {
                let _ = url.set_host(Some("cdn.example.com"));
                url
            },
        );
        assert_eq!(rw.apply_output("/a"), "http://cdn.example.com/a");
    }

    #[test]
    fn test_compose_orders_transforms() {
        let locale = Rewrite::new(
            |mut url| {
                let path = url.path().trim_start_matches("/en").to_string();
                url.set_path(if path.is_empty() { "/" } else { &path });
                url
            },
            |mut url| {
                let path = format!("/en{}", url.path());
                url.set_path(&path);
                url
            },
        );
        let rw = Rewrite::basepath("/app", false).compose(locale);
        assert_eq!(rw.apply_input("/app/en/posts"), "/posts");
        assert_eq!(rw.apply_output("/posts"), "/app/en/posts");
    }
}
