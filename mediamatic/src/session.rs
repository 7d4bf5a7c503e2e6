//! Per-client analysis sessions
//!
//! Every session owns its own [`HistoryLedger`] and submission guard. The
//! flow runner and request settings are shared. Ending a session drops its
//! ledger.

use crate::analysis::{AnalysisService, AnalysisSettings};
use crate::flow::FlowRunner;
use crate::history::HistoryLedger;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the session id on API requests and responses
pub const SESSION_HEADER: &str = "x-session-id";

/// Live sessions keyed by id
pub struct SessionStore {
    runner: Arc<dyn FlowRunner>,
    settings: AnalysisSettings,
    display_limit: usize,
    sessions: DashMap<String, Arc<AnalysisService>>,
}

impl SessionStore {
    pub fn new(runner: Arc<dyn FlowRunner>, settings: AnalysisSettings) -> Self {
        Self {
            runner,
            settings,
            display_limit: 5,
            sessions: DashMap::new(),
        }
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    /// Existing session, if any
    pub fn get(&self, id: &str) -> Option<Arc<AnalysisService>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    /// Session for `id`, started with an empty ledger on first use
    pub fn get_or_create(&self, id: &str) -> Arc<AnalysisService> {
        let entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = %id, "Starting session");
            Arc::new(self.new_service())
        });
        Arc::clone(entry.value())
    }

    /// Session for `id`, or a new one under a fresh id when `id` is absent
    pub fn resolve(&self, id: Option<&str>) -> (String, Arc<AnalysisService>) {
        let id = match id {
            Some(id) => id.to_string(),
            None => new_session_id(),
        };
        let service = self.get_or_create(&id);
        (id, service)
    }

    /// Drop a session and its ledger. Returns false for unknown ids.
    pub fn end(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session = %id, "Ended session");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn new_service(&self) -> AnalysisService {
        AnalysisService::new(
            Arc::clone(&self.runner),
            Arc::new(HistoryLedger::new()),
            self.settings.clone(),
        )
        .with_display_limit(self.display_limit)
    }
}

fn new_session_id() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}
