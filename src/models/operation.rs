use crate::models::operation_status::OperationStatus;
use serde::{Deserialize, Serialize};

/// Title and description of the sub-operation a composite is currently running.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SubOperationInfo {
    pub title: String,
    pub description: String,
}

/// Snapshot of everything an observer can see about an operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OperationState {
    pub title: String,
    pub description: String,
    pub percent_complete: u8,
    pub status: OperationStatus,
    pub error_message: Option<String>,
    pub sub_operation: Option<SubOperationInfo>,
}

impl OperationState {
    pub fn new(title: String, description: String) -> Self {
        Self {
            title,
            description,
            ..Default::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct OperationProgress {
    pub percent_complete: u8,
    pub operation_label: String,
    pub sub_operation_label: Option<String>,
    pub cancellable: bool,
}

impl OperationProgress {
    pub fn from_state(state: &OperationState, cancellable: bool) -> Self {
        let sub_operation_label = state.sub_operation.as_ref().map(|sub| {
            if sub.description.is_empty() {
                sub.title.clone()
            } else {
                format!("{}: {}", sub.title, sub.description)
            }
        });
        Self {
            percent_complete: state.percent_complete,
            operation_label: state.title.clone(),
            sub_operation_label,
            cancellable: cancellable && !state.is_completed(),
        }
    }
}
