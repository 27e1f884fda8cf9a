use crate::config::ConsoleConfig;
use crate::db::HistoryDatabase;
use crate::http::Session;
use crate::models::{history::OperationRecord, operation::OperationState};
use crate::operations::{MultipleOperation, Operation};
use chrono::Utc;
use std::sync::Arc;

pub const QUALIFIER: &str = "io";
pub const ORG: &str = "vmconsole";
pub const APP: &str = "vmconsole";
pub const APPID: &str = constcat::concat!(QUALIFIER, ".", ORG, ".", APP);

pub struct Console {
    config: ConsoleConfig,
    history: Option<HistoryDatabase>,
}

impl Console {
    /// Opens the history database when enabled; a history that cannot be
    /// opened is logged and the console runs without one.
    pub async fn new(config: ConsoleConfig) -> Self {
        let history = if config.record_history {
            match HistoryDatabase::create().await {
                Ok(history) => Some(history),
                Err(e) => {
                    log::error!("failed to open operation history: {e:?}");
                    None
                }
            }
        } else {
            None
        };
        Self::with_history(config, history)
    }

    pub fn with_history(config: ConsoleConfig, history: Option<HistoryDatabase>) -> Self {
        Self { config, history }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn history(&self) -> Option<&HistoryDatabase> {
        self.history.as_ref()
    }

    pub fn batch(
        &self,
        title: impl Into<String>,
        start_description: impl Into<String>,
        end_description: impl Into<String>,
        operations: Vec<Arc<dyn Operation>>,
    ) -> MultipleOperation {
        MultipleOperation::new(
            title,
            start_description,
            end_description,
            operations,
            self.config.show_sub_operation_details,
            self.config.stop_on_first_error,
        )
    }

    /// Runs `operation` to completion and records the outcome in the history.
    pub async fn run(&self, operation: &dyn Operation, session: &Session) -> OperationState {
        let started_at = Utc::now();
        operation.run_to_completion(session).await;
        let state = operation.handle().snapshot();

        match &state.error_message {
            Some(message) => log::warn!("'{}' finished with error: {message}", state.title),
            None => log::info!("'{}' finished", state.title),
        }

        if let Some(history) = &self.history {
            let record = OperationRecord::from_state(&state, started_at, Utc::now());
            if let Err(e) = history.record(&record).await {
                log::error!("failed to record '{}' in history: {e:?}", state.title);
            }
        }
        state
    }
}
