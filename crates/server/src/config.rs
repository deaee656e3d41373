//! Server configuration, read from the environment
//!
//! | variable | default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `5001` |
//! | `CDP_URL` | `ws://localhost:9222/devtools/browser` |
//! | `RENDER_TIMEOUT_SECS` | `60` |
//! | `RENDER_SETTLE_MS` | `500` |
//! | `RELAY_BASE` | `https://corsproxy.io/` |

use browser::RendererConfig;
use serde::{Deserialize, Serialize};
use snippet::PipelineConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one page render
    pub render_timeout: Duration,
    pub renderer: RendererConfig,
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            render_timeout: Duration::from_secs(60),
            renderer: RendererConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty keys keep their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = parse(&get, "PORT")? {
            config.port = port;
        }
        if let Some(cdp_url) = get("CDP_URL") {
            config.renderer.cdp_url = cdp_url;
        }
        if let Some(secs) = parse(&get, "RENDER_TIMEOUT_SECS")? {
            config.render_timeout = Duration::from_secs(secs);
        }
        if let Some(millis) = parse(&get, "RENDER_SETTLE_MS")? {
            config.renderer.settle = Duration::from_millis(millis);
        }
        if let Some(relay_base) = get("RELAY_BASE") {
            config.pipeline.relay_base = relay_base;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}
