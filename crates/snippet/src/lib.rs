//! Selective document extraction
//!
//! Given rendered markup, a list of CSS selectors and a list of script
//! snippets, keep only the selected elements and their ancestors, route
//! relative references through a cross-origin relay, and inject the
//! snippets plus a runtime patch so the fragment works on another origin.

pub mod error;
pub mod inject;
pub mod patch;
pub mod pipeline;
pub mod prune;
pub mod rewrite;
pub mod select;

pub use error::{ErrorKind, Result, SnippetError};
pub use patch::{runtime_patch, PatchParams};
pub use pipeline::{Pipeline, PipelineConfig, SnippetRequest, DEFAULT_RELAY_BASE};
pub use rewrite::ReferenceRewriter;
