//! Script injection - caller snippets into `<body>`, runtime patch into `<head>`

use crate::error::{Result, SnippetError};
use dom::{Document, NodeId};

/// Append caller snippets to `<body>` and the runtime patch to `<head>`
///
/// Both targets are located, body first, before anything is attached, so
/// a request that fails here leaves the tree as pruning left it. `<body>`
/// is only required when there are snippets to place in it.
pub fn inject<S: AsRef<str>>(doc: &mut Document, snippets: &[S], patch: &str) -> Result<()> {
    let body = if snippets.is_empty() {
        None
    } else {
        Some(doc.find_first_by_tag("body").ok_or(SnippetError::MissingBody)?)
    };
    let head = doc
        .find_first_by_tag("head")
        .ok_or(SnippetError::MissingHead)?;

    if let Some(body) = body {
        for snippet in snippets {
            let script = new_script(doc, snippet.as_ref())?;
            doc.append_child(body, script)?;
        }
    }

    let script = new_script(doc, patch)?;
    doc.append_child(head, script)?;

    tracing::debug!(snippets = snippets.len(), "Injected scripts");
    Ok(())
}

/// `<script>` holding `code` verbatim
fn new_script(doc: &mut Document, code: &str) -> Result<NodeId> {
    let script = doc.create_element("script");
    if !code.is_empty() {
        let text = doc.create_text(code);
        doc.append_child(script, text)?;
    }
    Ok(script)
}
