//! Media-matic - social-media engagement dashboard
//!
//! This crate provides:
//! - A client for a hosted Langflow analysis flow
//! - A history ledger of past analyses, one per client session
//! - Canned analysis templates
//! - Mock engagement metrics with CSV export
//! - REST API for the dashboard front end

pub mod analysis;
pub mod api;
pub mod flow;
pub mod history;
pub mod metrics;
pub mod session;
pub mod templates;

pub use analysis::{AnalysisError, AnalysisService};
pub use flow::{FlowReply, FlowRunner, LangflowClient, RunFlowRequest};
pub use history::{HistoryEntry, HistoryLedger};
pub use session::SessionStore;

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable that overrides `flow.application_token`
pub const TOKEN_ENV_VAR: &str = "LANGFLOW_APPLICATION_TOKEN";

/// Per-node overrides passed verbatim to the flow graph
pub type Tweaks = BTreeMap<String, serde_json::Value>;

/// Configuration for the dashboard
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DashboardConfig {
    /// Number of history entries shown most-recent-first
    #[serde(default = "default_history_display_limit")]
    pub history_display_limit: usize,

    /// Analysis flow configuration
    pub flow: FlowConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_history_display_limit() -> usize { 5 }

impl DashboardConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("Failed to parse dashboard config")
    }

    /// Load a configuration file, applying the token environment override
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            config.flow.application_token = Some(token);
        }

        Ok(config)
    }
}

/// Configuration for the hosted analysis flow
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FlowConfig {
    /// Base URL of the flow service
    pub base_url: String,

    /// Identifier of the hosted flow graph (the "langflow id")
    pub flow_graph_id: String,

    /// Flow endpoint to execute
    pub endpoint: String,

    /// Bearer credential
    pub application_token: Option<String>,

    #[serde(default = "default_io_type")]
    pub output_type: String,

    #[serde(default = "default_io_type")]
    pub input_type: String,

    /// Per-node overrides
    #[serde(default)]
    pub tweaks: Tweaks,

    /// Optional request timeout; the transport default applies when unset
    pub request_timeout_secs: Option<u64>,
}

fn default_io_type() -> String { "chat".to_string() }

impl FlowConfig {
    /// The configured token, or an error naming the env override
    pub fn token(&self) -> anyhow::Result<&str> {
        match self.application_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => anyhow::bail!(
                "No application token configured (set flow.application_token or {})",
                TOKEN_ENV_VAR
            ),
        }
    }
}

/// Configuration for the REST server
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String { "0.0.0.0:8080".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[flow]
base_url = "https://flows.example.com"
flow_graph_id = "graph-1"
endpoint = "flow-1"
"#;

    #[test]
    fn test_config_defaults() {
        let config = DashboardConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.history_display_limit, 5);
        assert_eq!(config.flow.output_type, "chat");
        assert_eq!(config.flow.input_type, "chat");
        assert!(config.flow.tweaks.is_empty());
        assert!(config.flow.request_timeout_secs.is_none());
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_config_tweaks_are_kept_verbatim() {
        let contents = r#"
history_display_limit = 3

[flow]
base_url = "https://flows.example.com"
flow_graph_id = "graph-1"
endpoint = "flow-1"
application_token = "secret"

[flow.tweaks]
"ChatInput-9vauS" = {}
"OpenAIModel-SPpeb" = { temperature = 0.2 }
"#;
        let config = DashboardConfig::from_toml_str(contents).unwrap();
        assert_eq!(config.history_display_limit, 3);
        assert_eq!(config.flow.tweaks.len(), 2);
        assert_eq!(config.flow.tweaks["ChatInput-9vauS"], serde_json::json!({}));
        assert_eq!(
            config.flow.tweaks["OpenAIModel-SPpeb"],
            serde_json::json!({ "temperature": 0.2 })
        );
        assert_eq!(config.flow.token().unwrap(), "secret");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let config = DashboardConfig::from_toml_str(MINIMAL).unwrap();
        let err = config.flow.token().unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV_VAR));
    }
}
