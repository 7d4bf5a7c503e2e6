//! Analysis submission: validation, one flow run, history bookkeeping

use crate::flow::{extract_text, message_text, FlowReply, FlowRunner, RunFlowRequest};
use crate::history::{HistoryEntry, HistoryLedger};
use crate::templates::AnalysisTemplate;
use crate::{FlowConfig, Tweaks};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Errors from submitting an analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Please enter a message")]
    EmptyPrompt,

    #[error("An analysis is already in progress")]
    Busy,

    #[error("Analysis failed: {0}")]
    Flow(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
}

/// Fixed part of every flow request
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub endpoint: String,
    pub output_type: String,
    pub input_type: String,
    pub tweaks: Tweaks,
}

impl AnalysisSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            tweaks: Tweaks::new(),
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            output_type: config.output_type.clone(),
            input_type: config.input_type.clone(),
            tweaks: config.tweaks.clone(),
        }
    }

    pub fn request(&self, message: &str) -> RunFlowRequest {
        RunFlowRequest::new(&self.endpoint, message)
            .with_types(&self.output_type, &self.input_type)
            .with_tweaks(self.tweaks.clone())
    }
}

/// Analysis front end for one session.
///
/// Submissions are serialized: while a flow run is outstanding, further
/// submissions fail with [`AnalysisError::Busy`]. Dropping an in-flight
/// future abandons the run without touching the ledger.
pub struct AnalysisService {
    runner: Arc<dyn FlowRunner>,
    ledger: Arc<HistoryLedger>,
    settings: AnalysisSettings,
    display_limit: usize,
    in_flight: Mutex<()>,
}

impl AnalysisService {
    pub fn new(runner: Arc<dyn FlowRunner>, ledger: Arc<HistoryLedger>, settings: AnalysisSettings) -> Self {
        Self {
            runner,
            ledger,
            settings,
            display_limit: 5,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }

    pub fn ledger(&self) -> &Arc<HistoryLedger> {
        &self.ledger
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    /// Entries to display, newest first
    pub fn recent_history(&self) -> Vec<HistoryEntry> {
        self.ledger.recent(self.display_limit)
    }

    /// Analyze a free-text prompt, sent exactly as given
    pub async fn analyze(&self, prompt: &str) -> Result<HistoryEntry, AnalysisError> {
        // Only the empty string is refused. Whitespace is a message like any other.
        if prompt.is_empty() {
            return Err(AnalysisError::EmptyPrompt);
        }
        self.submit(prompt, prompt.to_string()).await
    }

    /// Run a template, optionally with a customized prompt.
    ///
    /// The prompt is not validated: a customized prompt is sent even when empty.
    pub async fn run_template(
        &self,
        template: AnalysisTemplate,
        prompt: Option<&str>,
    ) -> Result<HistoryEntry, AnalysisError> {
        let prompt = prompt.unwrap_or_else(|| template.prompt());
        self.submit(prompt, template.history_label()).await
    }

    /// Run a template by id or display name
    pub async fn run_template_named(
        &self,
        name: &str,
        prompt: Option<&str>,
    ) -> Result<HistoryEntry, AnalysisError> {
        let template = AnalysisTemplate::parse(name)
            .ok_or_else(|| AnalysisError::UnknownTemplate(name.to_string()))?;
        self.run_template(template, prompt).await
    }

    async fn submit(&self, message: &str, label: String) -> Result<HistoryEntry, AnalysisError> {
        let _guard = self.in_flight.try_lock().map_err(|_| AnalysisError::Busy)?;

        let request = self.settings.request(message);
        let body = match self.runner.run_flow(&request).await {
            FlowReply::Output(body) => body,
            FlowReply::Failed { error } => return Err(AnalysisError::Flow(error)),
        };

        // A body without `error` counts as success even when the text is missing.
        if message_text(&body).is_none() {
            warn!(runner = %self.runner.name(), "Flow response has no message text, recording fallback");
        }

        let entry = HistoryEntry::new(label, extract_text(&body));
        self.ledger.append(entry.clone());

        info!(
            runner = %self.runner.name(),
            response_len = entry.response.len(),
            history_len = self.ledger.len(),
            "Analysis complete"
        );

        Ok(entry)
    }
}
