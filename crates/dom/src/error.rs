//! Error types for DOM operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use crate::types::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Cannot attach node {child} under its own descendant {parent}")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
