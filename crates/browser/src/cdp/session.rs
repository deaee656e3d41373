//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.

use super::client::{CDPClient, CDPError, Result};
use super::protocol::{AttachToTargetResult, NavigateResult, SessionId, TargetId};
use serde_json::{json, Value};
use std::sync::Arc;

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,
}

impl CDPSession {
    /// Attach to a target and enable the given domains
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: &[&str],
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // A domain we rely on that fails to enable is fatal
        for result in futures_util::future::join_all(enable_futures).await {
            result?;
        }

        Ok(Self {
            client,
            target_id,
            session_id,
        })
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<NavigateResult> {
        let result = self
            .send("Page.navigate", Some(json!({ "url": url.into() })))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Evaluate JavaScript and return the value by copy
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                })),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            return Err(CDPError::Protocol {
                code: 0,
                message: details["text"].as_str().unwrap_or("evaluation threw").to_string(),
            });
        }

        Ok(result["result"]["value"].clone())
    }
}
