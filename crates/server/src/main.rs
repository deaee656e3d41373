use browser::{CdpRenderer, Renderer};
use server::{router, AppState, ServerConfig};
use snippet::Pipeline;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let renderer: Arc<dyn Renderer> = Arc::new(CdpRenderer::new(config.renderer.clone()));
    let pipeline = Pipeline::new(config.pipeline.clone());
    let app = router(AppState::new(renderer, pipeline, config.render_timeout));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, cdp_url = %config.renderer.cdp_url, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
