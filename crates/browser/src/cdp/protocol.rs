//! CDP Protocol Types
//!
//! These are the fundamental types for CDP communication.
//! Keep them minimal - add domain-specific types only when needed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing
pub type RequestId = u64;

/// Target ID from Chrome
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CDPError>,
}

/// CDP Error
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CDPError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Unified CDP Message (response or event)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// Result of Target.createTarget
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetResult {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

/// Result of Target.attachToTarget
#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResult {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

/// Result of Page.navigate
#[derive(Debug, Clone, Deserialize)]
pub struct NavigateResult {
    #[serde(rename = "frameId", default)]
    pub frame_id: Option<String>,
    /// Set when the navigation itself failed (DNS, refused connection, ...)
    #[serde(rename = "errorText", default)]
    pub error_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_empty_fields() {
        let request = CDPRequest {
            id: 1,
            method: "Browser.getVersion".to_string(),
            params: None,
            session_id: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"id":1,"method":"Browser.getVersion"}"#);
    }

    #[test]
    fn test_message_distinguishes_response_and_event() {
        let response: CDPMessage =
            serde_json::from_str(r#"{"id":3,"error":{"code":-32000,"message":"nope"}}"#).unwrap();
        match response {
            CDPMessage::Response(r) => assert_eq!(r.error.unwrap().message, "nope"),
            other => panic!("expected response, got {:?}", other),
        }

        let event: CDPMessage = serde_json::from_str(r#"{"method":"Page.loadEventFired"}"#).unwrap();
        assert!(matches!(event, CDPMessage::Event(_)));
    }

    #[test]
    fn test_navigate_result_error_text() {
        let result: NavigateResult =
            serde_json::from_str(r#"{"frameId":"F","errorText":"net::ERR_NAME_NOT_RESOLVED"}"#)
                .unwrap();
        assert_eq!(result.error_text.as_deref(), Some("net::ERR_NAME_NOT_RESOLVED"));
    }
}
