//! Runtime patch injected into every extracted fragment
//!
//! The script is a pure function of the source URL, its origin, the
//! caller's query string and the relay base. It
//! - replays the source URL's fragment into `window.location.hash`,
//! - merges the request's query parameters into the address bar without
//!   navigating,
//! - wraps `window.fetch` so relative requests reach the source origin
//!   through the relay.

/// Inputs of the runtime patch
#[derive(Debug, Clone, Copy)]
pub struct PatchParams<'a> {
    pub source_url: &'a str,
    pub origin: &'a str,
    pub query: &'a str,
    pub relay_base: &'a str,
}

/// Render the patch script
pub fn runtime_patch(params: &PatchParams<'_>) -> String {
    format!(
        r#"
(function () {{
    // Replay the upstream fragment, if any
    const source = new URL({source_url});
    if (source.hash.length > 0) {{
        window.location.hash = source.hash;
    }}

    // Merge the request's query parameters into the address bar
    const preserved = new URLSearchParams({query});
    const current = new URL(window.location.href);
    for (const key of new Set(preserved.keys())) {{
        if (!current.searchParams.has(key)) {{
            for (const value of preserved.getAll(key)) {{
                current.searchParams.append(key, value);
            }}
        }}
    }}
    if (current.href !== window.location.href) {{
        window.history.replaceState(window.history.state, '', current.href);
    }}

    // Route relative fetches to the upstream origin through the relay
    const originalFetch = window.fetch;
    window.fetch = async function (input, init) {{
        let url = input instanceof Request ? input.url : String(input);

        if (!url.startsWith('http://') && !url.startsWith('https://')) {{
            const fullUrl = new URL(url, {origin}).href;
            url = {relay_base} + '?' + encodeURIComponent(fullUrl);
        }}

        if (input instanceof Request) {{
            input = new Request(url, input);
        }} else {{
            input = url;
        }}

        return originalFetch(input, init);
    }};
}})();
"#,
        source_url = js_string(params.source_url),
        query = js_string(params.query),
        origin = js_string(params.origin),
        relay_base = js_string(params.relay_base),
    )
}

/// JavaScript string literal that cannot terminate the enclosing
/// `<script>` element
fn js_string(value: &str) -> String {
    // Serializing a &str cannot fail
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(source_url: &'a str, query: &'a str) -> PatchParams<'a> {
        PatchParams {
            source_url,
            origin: "https://example.com",
            query,
            relay_base: "https://corsproxy.io/",
        }
    }

    #[test]
    fn test_patch_embeds_parameters() {
        let script = runtime_patch(&params(
            "https://example.com/app#readSpeed=573",
            "url=https%3A%2F%2Fexample.com%2Fapp&selector=canvas",
        ));

        assert!(script.contains(r#"new URL("https://example.com/app#readSpeed=573")"#));
        assert!(script.contains(
            r#"new URLSearchParams("url=https%3A%2F%2Fexample.com%2Fapp&selector=canvas")"#
        ));
        assert!(script.contains(r#"new URL(url, "https://example.com").href"#));
        assert!(script.contains(r#"url = "https://corsproxy.io/" + '?' + encodeURIComponent(fullUrl);"#));
        assert!(script.contains("window.history.replaceState"));
        assert!(script.contains("window.location.hash = source.hash"));
    }

    #[test]
    fn test_patch_is_deterministic() {
        let a = runtime_patch(&params("https://example.com/", ""));
        let b = runtime_patch(&params("https://example.com/", ""));
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_cannot_break_out_of_script() {
        let script = runtime_patch(&params(
            "https://example.com/?q=</script><script>alert(1)",
            "x=\"quoted\"",
        ));

        assert!(!script.contains("</script>"));
        assert!(script.contains(r#"<\/script>"#));
        assert!(script.contains(r#"new URLSearchParams("x=\"quoted\"")"#));
    }
}
