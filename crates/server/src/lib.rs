//! HTTP front end for snippet extraction
//!
//! `GET /api/v1/snippet?url=..&selector=..[&selector=..][&js=..]` renders
//! the page, runs the extraction pipeline and answers with the resulting
//! markup. Failures answer `{"error": "<message>"}` with a status derived
//! from the error kind.

pub mod config;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use browser::Renderer;
use serde_json::json;
use snippet::{ErrorKind, Pipeline, SnippetError, SnippetRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

pub use config::{ConfigError, ServerConfig};

/// Shared state behind every request
pub struct AppState {
    renderer: Arc<dyn Renderer>,
    pipeline: Pipeline,
    render_timeout: Duration,
}

impl AppState {
    pub fn new(renderer: Arc<dyn Renderer>, pipeline: Pipeline, render_timeout: Duration) -> Self {
        Self {
            renderer,
            pipeline,
            render_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/snippet", get(snippet))
        .with_state(Arc::new(state))
}

/// Error response: `{"error": "<message>"}`
pub struct ApiError(pub SnippetError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Input | ErrorKind::Selector | ErrorKind::Structural => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::UpstreamFetch => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Parse | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SnippetError> for ApiError {
    fn from(err: SnippetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn snippet(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let request_id = Uuid::now_v7();
    let span = tracing::info_span!("snippet", %request_id);

    async move {
        match extract(&state, query.as_deref()).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                let error = ApiError(e);
                tracing::warn!(status = %error.status(), error = %error.0, "Request failed");
                error.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn extract(state: &AppState, query: Option<&str>) -> Result<String, SnippetError> {
    // Bad input never reaches the browser
    let request = SnippetRequest::from_query(query)?;

    let page = state
        .renderer
        .render(&request.url, state.render_timeout)
        .await
        .map_err(|e| SnippetError::Fetch(e.to_string()))?;

    // Opaque final locations (about:, data:) fall back to the requested origin
    let origin = if page.origin == "null" {
        request.url.origin().ascii_serialization()
    } else {
        page.origin
    };

    state.pipeline.extract(&page.html, &request, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use browser::{RenderError, RenderedPage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use url::Url;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Demo</title></head>
  <body>
    <nav><a href="/home">Home</a></nav>
    <div class="card"><img src="/img/a.png"><a href="https://cdn.example.org/x">x</a></div>
  </body>
</html>"#;

    enum Outcome {
        Page(&'static str, &'static str),
        Timeout,
    }

    struct FakeRenderer {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl FakeRenderer {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, _url: &Url, timeout: Duration) -> browser::renderer::Result<RenderedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Page(html, final_url) => {
                    Ok(RenderedPage::new(html, Url::parse(final_url).unwrap()))
                }
                Outcome::Timeout => Err(RenderError::Timeout(timeout)),
            }
        }
    }

    fn app(renderer: Arc<FakeRenderer>) -> Router {
        router(AppState::new(
            renderer,
            Pipeline::default(),
            Duration::from_secs(60),
        ))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn error_message(body: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_extracts_selected_fragment() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/demo"));

        let (status, content_type, body) = call(
            app(renderer.clone()),
            "/api/v1/snippet?url=https%3A%2F%2Fexample.com%2Fdemo&selector=head&selector=.card+img&selector=.card+a&js=console.log(1)",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert_eq!(renderer.calls(), 1);

        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains(r#"<div class="card">"#));
        assert!(!body.contains("<nav>"));
        assert!(body.contains("https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fimg%2Fa.png"));
        assert!(body.contains(r#"href="https://cdn.example.org/x""#));
        assert!(body.contains("<script>console.log(1)</script>"));
    }

    #[tokio::test]
    async fn test_missing_selector_skips_render() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, content_type, body) =
            call(app(renderer.clone()), "/api/v1/snippet?url=https://example.com/").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(content_type.unwrap().starts_with("application/json"));
        assert_eq!(
            error_message(&body),
            "URL and at least one selector are required"
        );
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, _, _) = call(app(renderer.clone()), "/api/v1/snippet").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_http_url_is_rejected() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, _, body) = call(
            app(renderer.clone()),
            "/api/v1/snippet?url=file%3A%2F%2F%2Fetc%2Fpasswd&selector=body",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Invalid URL: file:///etc/passwd");
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_selector() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, _, body) = call(
            app(renderer),
            "/api/v1/snippet?url=https://example.com/&selector=head&selector=.missing",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(&body),
            "No elements found for selector: .missing"
        );
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, _, body) = call(
            app(renderer),
            "/api/v1/snippet?url=https://example.com/&selector=div%5B",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Invalid selector: div[");
    }

    #[tokio::test]
    async fn test_missing_head() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "https://example.com/"));

        let (status, _, body) = call(
            app(renderer),
            "/api/v1/snippet?url=https://example.com/&selector=.card",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&body).starts_with("No head tag found in result."));
    }

    #[tokio::test]
    async fn test_render_timeout_is_unavailable() {
        let renderer = FakeRenderer::new(Outcome::Timeout);

        let (status, _, body) = call(
            app(renderer.clone()),
            "/api/v1/snippet?url=https://example.com/&selector=body",
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            error_message(&body),
            "Failed to fetch or render the page: Timed out after 60s waiting for the page to render"
        );
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn test_opaque_final_url_uses_requested_origin() {
        let renderer = FakeRenderer::new(Outcome::Page(PAGE, "about:blank"));

        let (status, _, body) = call(
            app(renderer),
            "/api/v1/snippet?url=https://example.com/demo&selector=head&selector=nav+a",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fhome"));
    }

    #[test]
    fn test_status_per_error_kind() {
        let cases = [
            (SnippetError::MissingParameters, StatusCode::BAD_REQUEST),
            (SnippetError::NoMatch("p".into()), StatusCode::BAD_REQUEST),
            (SnippetError::MissingBody, StatusCode::BAD_REQUEST),
            (SnippetError::Fetch("refused".into()), StatusCode::SERVICE_UNAVAILABLE),
            (SnippetError::Parse("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
