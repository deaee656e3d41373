//! Pipeline orchestration
//!
//! ```text
//! markup → parse → select (all expressions) → prune → rewrite → inject → serialize
//! ```
//!
//! Rewriting runs after pruning so discarded elements are never rewritten;
//! rewriting only touches attribute values, so the output is the same
//! either way. The first failure aborts the run and is returned as is.

use crate::error::{Result, SnippetError};
use crate::patch::{runtime_patch, PatchParams};
use crate::rewrite::ReferenceRewriter;
use crate::{inject, prune, select};
use dom::Document;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// Relay used when none is configured
pub const DEFAULT_RELAY_BASE: &str = "https://corsproxy.io/";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the cross-origin relay, without query
    pub relay_base: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relay_base: DEFAULT_RELAY_BASE.to_string(),
        }
    }
}

/// One extraction request, as the caller sent it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRequest {
    pub url: Url,
    pub selectors: Vec<String>,
    pub scripts: Vec<String>,
    /// Raw query string of the request, replayed into the address bar
    pub query: String,
}

impl SnippetRequest {
    /// Read `url`, repeated `selector` and repeated `js` from a raw query
    /// string. Empty values count as absent.
    pub fn from_query(query: Option<&str>) -> Result<Self> {
        let query = query.unwrap_or_default();

        let mut url = None;
        let mut selectors = Vec::new();
        let mut scripts = Vec::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "url" if url.is_none() => url = Some(value.into_owned()),
                "selector" => selectors.push(value.into_owned()),
                "js" => scripts.push(value.into_owned()),
                _ => {}
            }
        }

        let (Some(url), false) = (url, selectors.is_empty()) else {
            return Err(SnippetError::MissingParameters);
        };

        let parsed = Url::parse(&url).map_err(|_| SnippetError::InvalidUrl(url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SnippetError::InvalidUrl(url));
        }

        Ok(Self {
            url: parsed,
            selectors,
            scripts,
            query: query.to_string(),
        })
    }
}

/// Extraction pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse rendered markup and run the pipeline on it
    pub fn extract(&self, html: &str, request: &SnippetRequest, origin: &str) -> Result<String> {
        let doc = Document::parse(html)?;
        self.run(doc, request, origin)
    }

    /// Run the pipeline on a parsed document
    ///
    /// `origin` is `scheme://host[:port]` of the rendered page; relative
    /// references and relative fetches resolve against it.
    pub fn run(&self, mut doc: Document, request: &SnippetRequest, origin: &str) -> Result<String> {
        let matches = select::evaluate(&doc, &request.selectors)?;

        let keep = prune::keep_set(&doc, &matches)?;
        prune::prune(&mut doc, &keep)?;

        ReferenceRewriter::new(self.config.relay_base.as_str(), origin).rewrite(&mut doc)?;

        let patch = runtime_patch(&PatchParams {
            source_url: request.url.as_str(),
            origin,
            query: &request.query,
            relay_base: &self.config.relay_base,
        });
        inject::inject(&mut doc, &request.scripts, &patch)?;

        let output = doc.serialize()?;
        tracing::info!(
            url = %request.url,
            selectors = request.selectors.len(),
            scripts = request.scripts.len(),
            bytes = output.len(),
            "Extracted snippet"
        );
        Ok(output)
    }
}
