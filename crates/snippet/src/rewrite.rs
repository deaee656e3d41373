//! Reference rewriting - route relative resource links through the relay
//!
//! A relative `href`/`src` only works on the page it came from. Each one is
//! resolved against the source origin and replaced with
//! `<relay-base>?<percent-encoded absolute URL>`, so the fragment keeps
//! loading its assets when embedded on another origin.

use crate::error::Result;
use dom::Document;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Bytes JavaScript's `encodeURIComponent` leaves alone, so links
/// rewritten here match the ones the runtime patch builds
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Elements whose `href` is rewritten
pub const HREF_TAGS: &[&str] = &["a", "img", "link", "script"];

/// Elements whose `src` is rewritten
pub const SRC_TAGS: &[&str] = &["img", "script"];

/// Already-absolute values are left alone. Scheme-relative (`//host/x`)
/// and fragment/query-only references count as relative.
pub fn is_absolute(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// `<relay-base>?<encoded>`
pub fn relay_url(relay_base: &str, absolute: &str) -> String {
    format!(
        "{}?{}",
        relay_base,
        utf8_percent_encode(absolute, URI_COMPONENT)
    )
}

pub struct ReferenceRewriter {
    relay_base: String,
    origin: Option<Url>,
}

impl ReferenceRewriter {
    /// `origin` is `scheme://host[:port]` of the source page. An origin that
    /// does not parse disables resolution; values are then relayed as-is.
    pub fn new(relay_base: impl Into<String>, origin: &str) -> Self {
        let origin = match Url::parse(origin) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Unparseable source origin");
                None
            }
        };
        Self {
            relay_base: relay_base.into(),
            origin,
        }
    }

    /// Absolute form of `value`, falling back to the literal value
    pub fn resolve(&self, value: &str) -> String {
        self.origin
            .as_ref()
            .and_then(|origin| origin.join(value).ok())
            .map(String::from)
            .unwrap_or_else(|| value.to_string())
    }

    /// Replacement for an attribute value, or `None` if it stays as is
    pub fn rewrite_value(&self, value: &str) -> Option<String> {
        if is_absolute(value) {
            return None;
        }
        Some(relay_url(&self.relay_base, &self.resolve(value)))
    }

    /// Rewrite every applicable attribute of the live tree in place.
    /// Returns the number of attributes changed.
    pub fn rewrite(&self, doc: &mut Document) -> Result<usize> {
        let mut rewritten = 0;

        for node_id in doc.elements() {
            let tag = doc.tag_name(node_id)?;
            let attrs: &[&str] = match (HREF_TAGS.contains(&tag), SRC_TAGS.contains(&tag)) {
                (true, true) => &["href", "src"],
                (true, false) => &["href"],
                (false, true) => &["src"],
                (false, false) => continue,
            };

            for &attr in attrs {
                let Some(value) = doc.attr(node_id, attr)? else {
                    continue;
                };
                if let Some(replacement) = self.rewrite_value(value) {
                    doc.set_attr(node_id, attr, replacement)?;
                    rewritten += 1;
                }
            }
        }

        tracing::debug!(rewritten, "Rewrote references");
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELAY: &str = "https://corsproxy.io/";

    fn rewriter() -> ReferenceRewriter {
        ReferenceRewriter::new(RELAY, "https://example.com")
    }

    #[test]
    fn test_relay_url_encodes_whole_url() {
        assert_eq!(
            relay_url(RELAY, "https://example.com/a/b.js?x=1&y=2"),
            "https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fa%2Fb.js%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_absolute_values_are_skipped() {
        let rewriter = rewriter();
        assert_eq!(rewriter.rewrite_value("https://cdn.example.net/x.js"), None);
        assert_eq!(rewriter.rewrite_value("http://example.com/"), None);
    }

    #[test]
    fn test_relative_forms_resolve_against_origin() {
        let rewriter = rewriter();
        assert_eq!(rewriter.resolve("/static/app.css"), "https://example.com/static/app.css");
        assert_eq!(rewriter.resolve("#top"), "https://example.com/#top");
        assert_eq!(rewriter.resolve("?page=2"), "https://example.com/?page=2");
        assert_eq!(rewriter.resolve("//cdn.example.net/x.js"), "https://cdn.example.net/x.js");
        assert_eq!(rewriter.resolve("img/logo.png"), "https://example.com/img/logo.png");
    }

    #[test]
    fn test_unresolvable_value_is_relayed_literally() {
        let rewriter = ReferenceRewriter::new(RELAY, "not an origin");
        assert_eq!(
            rewriter.rewrite_value("/a b"),
            Some("https://corsproxy.io/?%2Fa%20b".to_string())
        );
    }

    #[test]
    fn test_relay_url_matches_encode_uri_component() {
        // encodeURIComponent("/a b+c~(x)!'*é") in a browser
        assert_eq!(
            relay_url(RELAY, "/a b+c~(x)!'*\u{e9}"),
            "https://corsproxy.io/?%2Fa%20b%2Bc~(x)!'*%C3%A9"
        );
    }

    #[test]
    fn test_rewrite_document() {
        let mut doc = Document::parse(
            r#"<html><head>
<link rel="stylesheet" href="/style.css">
<link rel="icon" href="https://example.com/favicon.ico">
<script src="/app.js"></script>
</head><body>
<a href="/about">About</a>
<a href="https://other.org/">Other</a>
<img src="/logo.png" alt="logo">
<iframe src="/embed"></iframe>
<div href="/not-a-link"></div>
</body></html>"#,
        )
        .unwrap();

        let rewritten = rewriter().rewrite(&mut doc).unwrap();
        assert_eq!(rewritten, 4);

        let attr = |selector: &str, name: &str| {
            let id = doc.select(selector).unwrap()[0];
            doc.attr(id, name).unwrap().map(str::to_string)
        };

        assert_eq!(
            attr("link[rel=stylesheet]", "href").as_deref(),
            Some("https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fstyle.css")
        );
        assert_eq!(
            attr("link[rel=icon]", "href").as_deref(),
            Some("https://example.com/favicon.ico")
        );
        assert_eq!(
            attr("script", "src").as_deref(),
            Some("https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fapp.js")
        );
        assert_eq!(
            attr("img", "src").as_deref(),
            Some("https://corsproxy.io/?https%3A%2F%2Fexample.com%2Flogo.png")
        );
        assert_eq!(attr("iframe", "src").as_deref(), Some("/embed"));
        assert_eq!(attr("div", "href").as_deref(), Some("/not-a-link"));
    }
}
