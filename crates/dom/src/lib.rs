//! Arena-backed HTML document model
//!
//! Parse rendered markup once, query it with CSS selectors, mutate it in
//! place (attach, detach, attribute writes) and serialize it back.
//!
//! ## Core Design
//!
//! ```text
//! markup → scraper::Html → DomArena (owned) → mutate → DomSerializer
//!                              ↓
//!                        NodeId (u32) = identity
//! ```
//!
//! Every node is addressed by its arena index, so membership tests compare
//! indices and never content.

pub mod arena;
pub mod document;
pub mod error;
pub mod serializer;
pub mod types;

pub use arena::DomArena;
pub use document::Document;
pub use error::{DomError, Result};
pub use serializer::{DomSerializer, SerializerConfig};
pub use types::*;
