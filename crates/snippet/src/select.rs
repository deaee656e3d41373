//! Selector evaluation across the caller's ordered expression list

use crate::error::{Result, SnippetError};
use dom::{Document, NodeId};

/// Resolve every expression, in order, and concatenate the matches
///
/// The first expression that fails to compile or matches nothing aborts
/// the whole evaluation. Duplicates across expressions are kept.
pub fn evaluate<S: AsRef<str>>(doc: &Document, selectors: &[S]) -> Result<Vec<NodeId>> {
    let mut matched = Vec::new();

    for selector in selectors {
        let selector = selector.as_ref();
        let found = doc.select(selector)?;
        if found.is_empty() {
            tracing::debug!(selector, "Selector matched nothing");
            return Err(SnippetError::NoMatch(selector.to_string()));
        }

        tracing::debug!(selector, matches = found.len(), "Selector matched");
        matched.extend(found);
    }

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>T</title></head>
<body><div class="a">X</div><div class="b">Y</div></body></html>"#;

    #[test]
    fn test_concatenates_in_order() {
        let doc = Document::parse(PAGE).unwrap();

        let matched = evaluate(&doc, &[".b", "div"]).unwrap();
        assert_eq!(matched.len(), 3);
        assert_eq!(matched[0], matched[2]);
    }

    #[test]
    fn test_unmatched_selector_aborts() {
        let doc = Document::parse(PAGE).unwrap();

        match evaluate(&doc, &["head", ".missing", "div"]) {
            Err(SnippetError::NoMatch(expr)) => assert_eq!(expr, ".missing"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_first_failure_is_reported() {
        let doc = Document::parse(PAGE).unwrap();

        match evaluate(&doc, &[".missing", "div["]) {
            Err(SnippetError::NoMatch(expr)) => assert_eq!(expr, ".missing"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
        match evaluate(&doc, &["div[", ".missing"]) {
            Err(SnippetError::InvalidSelector(expr)) => assert_eq!(expr, "div["),
            other => panic!("expected InvalidSelector, got {:?}", other),
        }
    }
}
