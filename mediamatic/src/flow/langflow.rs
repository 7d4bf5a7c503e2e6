//! Langflow run API client
//!
//! Executes a hosted flow graph with a single POST to
//! `{base_url}/lf/{flow_graph_id}/api/v1/run/{endpoint}`.
//!
//! Configuration:
//! - base_url: Langflow host (e.g. https://api.langflow.astra.datastax.com)
//! - flow_graph_id: the hosted "langflow id"
//! - application_token: sent as a bearer token
//!
//! There is no retry: a flow run may have side effects on the server.

use super::{FlowError, FlowReply, FlowRunner, RunFlowRequest};
use crate::FlowConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Langflow client
pub struct LangflowClient {
    client: Client,
    base_url: String,
    flow_graph_id: String,
    application_token: String,
}

impl LangflowClient {
    /// Create a client using the transport's default timeout
    pub fn new(
        base_url: impl Into<String>,
        flow_graph_id: impl Into<String>,
        application_token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            flow_graph_id: flow_graph_id.into(),
            application_token: application_token.into(),
        }
    }

    /// Replace the HTTP client with one that enforces `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, FlowError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Build a client from the `[flow]` config section
    pub fn from_config(config: &FlowConfig) -> anyhow::Result<Self> {
        let client = Self::new(&config.base_url, &config.flow_graph_id, config.token()?);
        match config.request_timeout_secs {
            Some(secs) => Ok(client.with_timeout(Duration::from_secs(secs))?),
            None => Ok(client),
        }
    }

    /// Full run URL for an endpoint
    pub fn run_url(&self, endpoint: &str) -> String {
        format!(
            "{}/lf/{}/api/v1/run/{}",
            self.base_url, self.flow_graph_id, endpoint
        )
    }

    /// Issue the request and decode the body, without classifying it
    pub async fn execute(&self, request: &RunFlowRequest) -> Result<Value, FlowError> {
        let url = self.run_url(&request.endpoint);

        debug!(
            url = %url,
            input_len = request.input_value.len(),
            tweaks = request.tweaks.as_ref().map_or(0, |t| t.len()),
            "Running flow"
        );

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.application_token))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FlowError::Status { status, body });
        }

        let value: Value = serde_json::from_str(&body)?;

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            body_len = body.len(),
            "Flow run completed"
        );

        Ok(value)
    }
}

#[async_trait]
impl FlowRunner for LangflowClient {
    fn name(&self) -> &str {
        "langflow"
    }

    async fn run_flow(&self, request: &RunFlowRequest) -> FlowReply {
        let reply = match self.execute(request).await {
            Ok(body) => FlowReply::from_body(body),
            Err(e) => FlowReply::failed(e.to_string()),
        };

        if let Some(error) = reply.error() {
            warn!(endpoint = %request.endpoint, error = %error, "Flow run failed");
        }

        reply
    }
}
