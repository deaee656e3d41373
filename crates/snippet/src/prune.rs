//! Pruning - keep matched elements and their ancestor chains, drop the rest
//!
//! Membership is by node identity. Two subtrees with identical markup are
//! treated independently; only the one that was matched survives.

use crate::error::Result;
use ahash::AHashSet;
use dom::{Document, NodeId};

/// Matched nodes plus every ancestor up to, but excluding, the document
/// container. Siblings are never included.
pub fn keep_set(doc: &Document, matches: &[NodeId]) -> Result<AHashSet<NodeId>> {
    let root = doc.root();
    let mut keep = AHashSet::with_capacity(matches.len() * 8);

    for &node_id in matches {
        // Already present means its ancestors are present too
        if !keep.insert(node_id) {
            continue;
        }

        let mut current = doc.parent(node_id)?;
        while let Some(parent) = current {
            if parent == root || !keep.insert(parent) {
                break;
            }
            current = doc.parent(parent)?;
        }
    }

    Ok(keep)
}

/// Detach every live element outside `keep`
///
/// Walks a snapshot taken before the first mutation. Elements inside an
/// already-detached subtree are detached again, which is a no-op, so the
/// walk order does not matter. Returns the number of elements visited
/// for removal.
pub fn prune(doc: &mut Document, keep: &AHashSet<NodeId>) -> Result<usize> {
    let snapshot = doc.elements();
    let mut removed = 0;

    for node_id in snapshot {
        if !keep.contains(&node_id) {
            doc.detach(node_id)?;
            removed += 1;
        }
    }

    tracing::debug!(kept = keep.len(), removed, "Pruned document");
    Ok(removed)
}
