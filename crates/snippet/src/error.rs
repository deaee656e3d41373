//! Error taxonomy for the extraction pipeline
//!
//! Every failure aborts the request. The display text of each variant is
//! the message returned to the caller.

use dom::DomError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnippetError>;

/// Broad class of a failure, used to pick the response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable request parameters
    Input,
    /// Selector does not compile or matches nothing
    Selector,
    /// A structural element is gone after pruning
    Structural,
    /// The renderer failed or timed out
    UpstreamFetch,
    /// Rendered content could not be turned into a document
    Parse,
    /// Tree invariant violated inside the pipeline
    Internal,
}

#[derive(Debug, Error)]
pub enum SnippetError {
    #[error("URL and at least one selector are required")]
    MissingParameters,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No elements found for selector: {0}")]
    NoMatch(String),

    #[error("No head tag found in result. Make sure to specify 'head' as a selector, or a child element of <head>")]
    MissingHead,

    #[error("No body tag found in result. Make sure to specify 'body' as a selector, or a child element of <body>")]
    MissingBody,

    #[error("Failed to fetch or render the page: {0}")]
    Fetch(String),

    #[error("Failed to parse HTML content: {0}")]
    Parse(String),

    #[error("Document error: {0}")]
    Document(DomError),
}

impl SnippetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnippetError::MissingParameters | SnippetError::InvalidUrl(_) => ErrorKind::Input,
            SnippetError::InvalidSelector(_) | SnippetError::NoMatch(_) => ErrorKind::Selector,
            SnippetError::MissingHead | SnippetError::MissingBody => ErrorKind::Structural,
            SnippetError::Fetch(_) => ErrorKind::UpstreamFetch,
            SnippetError::Parse(_) => ErrorKind::Parse,
            SnippetError::Document(_) => ErrorKind::Internal,
        }
    }
}

impl From<DomError> for SnippetError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::InvalidSelector(expr) => SnippetError::InvalidSelector(expr),
            DomError::Parse(msg) => SnippetError::Parse(msg),
            other => SnippetError::Document(other),
        }
    }
}
