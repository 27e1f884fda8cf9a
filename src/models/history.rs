use crate::models::{operation::OperationState, operation_status::OperationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OperationRecord {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: OperationStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn from_state(
        state: &OperationState,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: state.title.clone(),
            description: state.description.clone(),
            status: state.status,
            error_message: state.error_message.clone(),
            started_at,
            finished_at,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
