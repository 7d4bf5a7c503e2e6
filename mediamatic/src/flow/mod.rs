//! Hosted analysis flow abstraction and the Langflow client

mod extract;
mod langflow;

pub use extract::{extract_text, lookup, message_text, PathStep, MESSAGE_TEXT_PATH, NO_ANALYSIS_TEXT};
pub use langflow::LangflowClient;

use crate::Tweaks;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the flow service
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid JSON in flow response: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// One flow execution: the request body plus the endpoint it targets
#[derive(Debug, Clone, Serialize)]
pub struct RunFlowRequest {
    /// Flow endpoint, part of the URL rather than the body
    #[serde(skip)]
    pub endpoint: String,

    /// The user's message
    pub input_value: String,

    pub output_type: String,

    pub input_type: String,

    /// Omitted from the body when there are no tweaks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweaks: Option<Tweaks>,
}

impl RunFlowRequest {
    pub fn new(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            input_value: message.into(),
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            tweaks: None,
        }
    }

    pub fn with_types(mut self, output_type: impl Into<String>, input_type: impl Into<String>) -> Self {
        self.output_type = output_type.into();
        self.input_type = input_type.into();
        self
    }

    pub fn with_tweaks(mut self, tweaks: Tweaks) -> Self {
        self.tweaks = if tweaks.is_empty() { None } else { Some(tweaks) };
        self
    }
}

/// Outcome of a flow run.
///
/// Serializes to the raw response body on success and to `{"error": ...}`
/// on failure, so callers can render either shape uniformly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlowReply {
    Failed { error: String },
    Output(Value),
}

impl FlowReply {
    /// Classify a decoded response body. Any body carrying an `error` key is a failure.
    pub fn from_body(body: Value) -> Self {
        match body.get("error") {
            Some(Value::String(message)) => FlowReply::Failed {
                error: message.clone(),
            },
            Some(other) => FlowReply::Failed {
                error: other.to_string(),
            },
            None => FlowReply::Output(body),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        FlowReply::Failed {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FlowReply::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FlowReply::Failed { error } => Some(error),
            FlowReply::Output(_) => None,
        }
    }

    /// Extracted message text, or `None` for a failed run
    pub fn text(&self) -> Option<String> {
        match self {
            FlowReply::Output(body) => Some(extract_text(body)),
            FlowReply::Failed { .. } => None,
        }
    }
}

/// Trait for flow services
#[async_trait]
pub trait FlowRunner: Send + Sync {
    /// Runner name for logging/identification
    fn name(&self) -> &str;

    /// Execute the flow once. Never fails: transport and service errors
    /// come back as [`FlowReply::Failed`].
    async fn run_flow(&self, request: &RunFlowRequest) -> FlowReply;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_without_tweaks() {
        let request = RunFlowRequest::new("flow-1", "How did reels do?").with_tweaks(Tweaks::new());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "input_value": "How did reels do?",
                "output_type": "chat",
                "input_type": "chat"
            })
        );
    }

    #[test]
    fn test_request_body_with_tweaks() {
        let mut tweaks = Tweaks::new();
        tweaks.insert("ChatInput-9vauS".to_string(), json!({}));
        tweaks.insert("Prompt-4Mipb".to_string(), json!({ "template": "x" }));

        let request = RunFlowRequest::new("flow-1", "").with_tweaks(tweaks);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["input_value"], "");
        assert_eq!(body["tweaks"]["ChatInput-9vauS"], json!({}));
        assert_eq!(body["tweaks"]["Prompt-4Mipb"], json!({ "template": "x" }));
        assert!(body.get("endpoint").is_none());
    }

    #[test]
    fn test_reply_from_error_body() {
        let reply = FlowReply::from_body(json!({ "error": "upstream timeout" }));
        assert_eq!(reply, FlowReply::failed("upstream timeout"));
        assert_eq!(reply.error(), Some("upstream timeout"));
        assert_eq!(reply.text(), None);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({ "error": "upstream timeout" })
        );
    }

    #[test]
    fn test_reply_non_string_error_is_still_failure() {
        let reply = FlowReply::from_body(json!({ "error": { "code": 42 } }));
        assert!(reply.is_error());
        assert_eq!(reply.error(), Some(r#"{"code":42}"#));
    }

    #[test]
    fn test_reply_empty_object_is_success_with_fallback() {
        let reply = FlowReply::from_body(json!({}));
        assert!(!reply.is_error());
        assert_eq!(reply.text().as_deref(), Some(NO_ANALYSIS_TEXT));
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({}));
    }
}
