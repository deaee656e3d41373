//! Renderer - fetch a URL through a headless browser and capture the DOM
//!
//! Each render owns one CDP connection and one target for its whole
//! lifetime. Both are released on every exit path: explicitly when the
//! render returns, and from `Drop` when the render future is cancelled
//! (timeout, client disconnect).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::cdp::client::{CDPClient, CDPError, EventCallback};
use crate::cdp::protocol::{CDPEvent, CreateTargetResult, TargetId};
use crate::cdp::CDPSession;

/// Upper bound on cleanup so a wedged browser cannot pin a task forever
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Captures the rendered markup, doctype included, and the final location
const CAPTURE_SCRIPT: &str = r#"(() => {
    const doctype = document.doctype
        ? new XMLSerializer().serializeToString(document.doctype)
        : '';
    return { html: doctype + document.documentElement.outerHTML, url: location.href };
})()"#;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Cdp(#[from] CDPError),

    #[error("Timed out after {}s waiting for the page to render", .0.as_secs())]
    Timeout(Duration),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Invalid render result: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// A page after JavaScript has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// Final URL after redirects
    pub url: Url,
    /// `scheme://host[:port]` of the final URL
    pub origin: String,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>, url: Url) -> Self {
        let origin = url.origin().ascii_serialization();
        Self {
            html: html.into(),
            url,
            origin,
        }
    }
}

/// Something that can turn a URL into rendered markup
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url`, failing with `RenderError::Timeout` once `timeout` elapses
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage>;
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Browser-level DevTools WebSocket URL
    pub cdp_url: String,
    /// Extra time after the load event for late scripts to settle
    pub settle: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            cdp_url: "ws://localhost:9222/devtools/browser".to_string(),
            settle: Duration::from_millis(500),
        }
    }
}

#[derive(Deserialize)]
struct Capture {
    html: String,
    url: String,
}

/// Renderer backed by a Chrome DevTools Protocol endpoint
pub struct CdpRenderer {
    config: RendererConfig,
}

impl CdpRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    async fn render_inner(&self, url: &Url) -> Result<RenderedPage> {
        let client = CDPClient::connect(&self.config.cdp_url).await?;
        let mut guard = ReleaseGuard::new(client.clone());

        let result = self.open_and_capture(&client, &mut guard, url).await;

        guard.release().await;
        result
    }

    async fn open_and_capture(
        &self,
        client: &Arc<CDPClient>,
        guard: &mut ReleaseGuard,
        url: &Url,
    ) -> Result<RenderedPage> {
        let created = client
            .send_request(
                "Target.createTarget",
                Some(json!({ "url": "about:blank" })),
                None,
            )
            .await?;
        let created: CreateTargetResult =
            serde_json::from_value(created).map_err(CDPError::from)?;
        guard.target = Some(created.target_id.clone());

        self.capture(client.clone(), created.target_id, url).await
    }

    async fn capture(
        &self,
        client: Arc<CDPClient>,
        target_id: TargetId,
        url: &Url,
    ) -> Result<RenderedPage> {
        let session = CDPSession::attach(client.clone(), target_id, &["Page", "Runtime"]).await?;

        // Subscribe before navigating so the load event cannot be missed
        let (load_tx, mut load_rx) = mpsc::unbounded_channel();
        let session_id = session.session_id.clone();
        let on_load: EventCallback = Arc::new(move |event: CDPEvent| {
            if event.session_id.as_deref() == Some(session_id.as_str()) {
                let _ = load_tx.send(());
            }
        });
        client.subscribe("Page.loadEventFired", on_load);

        let navigation = session.navigate(url.as_str()).await?;
        if let Some(error) = navigation.error_text {
            return Err(RenderError::Navigation(error));
        }

        load_rx.recv().await.ok_or(CDPError::Closed)?;
        tracing::debug!(%url, "Load event fired");

        if !self.config.settle.is_zero() {
            tokio::time::sleep(self.config.settle).await;
        }

        let value = session.evaluate(CAPTURE_SCRIPT).await?;
        let capture: Capture = serde_json::from_value(value)
            .map_err(|e| RenderError::InvalidResponse(e.to_string()))?;
        let final_url = Url::parse(&capture.url).unwrap_or_else(|_| url.clone());

        Ok(RenderedPage::new(capture.html, final_url))
    }
}

impl Default for CdpRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

#[async_trait]
impl Renderer for CdpRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage> {
        tracing::info!(%url, timeout_secs = timeout.as_secs(), "Rendering page");

        match tokio::time::timeout(timeout, self.render_inner(url)).await {
            Ok(Ok(page)) => {
                tracing::info!(url = %page.url, bytes = page.html.len(), "Rendered page");
                Ok(page)
            }
            Ok(Err(e)) => {
                tracing::warn!(%url, error = %e, "Render failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(%url, "Render timed out");
                Err(RenderError::Timeout(timeout))
            }
        }
    }
}

/// Closes the target and the connection, whichever way the render ends
struct ReleaseGuard {
    client: Option<Arc<CDPClient>>,
    target: Option<TargetId>,
}

impl ReleaseGuard {
    fn new(client: Arc<CDPClient>) -> Self {
        Self {
            client: Some(client),
            target: None,
        }
    }

    async fn release(&mut self) {
        if let Some(client) = self.client.take() {
            release(client, self.target.take()).await;
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let target = self.target.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release(client, target));
            }
            Err(_) => tracing::warn!("No runtime to release browser target on"),
        }
    }
}

async fn release(client: Arc<CDPClient>, target: Option<TargetId>) {
    let cleanup = async {
        if let Some(target_id) = target {
            if let Err(e) = client
                .send_request(
                    "Target.closeTarget",
                    Some(json!({ "targetId": target_id })),
                    None,
                )
                .await
            {
                tracing::warn!("Failed to close target {}: {}", target_id, e);
            }
        }
        if let Err(e) = client.close().await {
            tracing::debug!("Failed to close CDP connection: {}", e);
        }
    };

    if tokio::time::timeout(RELEASE_TIMEOUT, cleanup).await.is_err() {
        tracing::warn!("Timed out releasing browser resources");
    }
}
