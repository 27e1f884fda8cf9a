use super::{Operation, OperationError, OperationHandle};
use crate::http::{task::TaskStatus, ApiError, Session};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Starts an asynchronous API call and follows the server task it creates
/// until the task finishes.
pub struct ApiCallOperation {
    handle: OperationHandle,
    method: String,
    params: Vec<Value>,
    poll_interval: Duration,
    result: Mutex<Option<String>>,
}

impl ApiCallOperation {
    pub fn new(title: impl Into<String>, method: impl Into<String>, params: Vec<Value>) -> Self {
        let method = method.into();
        Self {
            handle: OperationHandle::new(title, format!("Waiting to call {method}")),
            method,
            params,
            poll_interval: DEFAULT_POLL_INTERVAL,
            result: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn vm_start(vm_ref: &str, vm_name: &str) -> Self {
        // start_paused = false, force = false
        Self::new(
            format!("Start '{vm_name}'"),
            "VM.start",
            vec![json!(vm_ref), json!(false), json!(false)],
        )
    }

    pub fn vm_clean_shutdown(vm_ref: &str, vm_name: &str) -> Self {
        Self::new(
            format!("Shut down '{vm_name}'"),
            "VM.clean_shutdown",
            vec![json!(vm_ref)],
        )
    }

    pub fn vm_clean_reboot(vm_ref: &str, vm_name: &str) -> Self {
        Self::new(
            format!("Reboot '{vm_name}'"),
            "VM.clean_reboot",
            vec![json!(vm_ref)],
        )
    }

    pub fn vm_snapshot(vm_ref: &str, vm_name: &str, snapshot_name: &str) -> Self {
        Self::new(
            format!("Snapshot '{vm_name}'"),
            "VM.snapshot",
            vec![json!(vm_ref), json!(snapshot_name)],
        )
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The task result (usually an object reference) once the call succeeded.
    pub fn result(&self) -> Option<String> {
        self.result
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn follow_task(&self, session: &Session, task: &str) -> Result<(), OperationError> {
        let mut cancel_sent = false;
        loop {
            tokio::select! {
                () = self.handle.cancelled(), if !cancel_sent => {
                    cancel_sent = true;
                    self.handle.set_description(format!("Cancelling {}", self.method));
                    if let Err(e) = session.cancel_task(task).await {
                        log::warn!("failed to cancel task {task}: {e}");
                    }
                    continue;
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }

            let record = session.task_record(task).await?;
            self.handle.set_percent_complete(record.percent_complete());
            match record.status {
                TaskStatus::Pending | TaskStatus::Cancelling => {}
                TaskStatus::Success => {
                    *self
                        .result
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(record.result);
                    self.handle.set_percent_complete(100);
                    return Ok(());
                }
                TaskStatus::Failure => {
                    return Err(ApiError::Failure(record.error_info).into());
                }
                TaskStatus::Cancelled => return Err(OperationError::Cancelled),
            }
        }
    }
}

#[async_trait]
impl Operation for ApiCallOperation {
    fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    async fn run(&self, session: &Session) -> Result<(), OperationError> {
        if self.handle.is_cancelled() {
            return Err(OperationError::Cancelled);
        }

        self.handle.set_description(format!("Calling {}", self.method));
        let task = session.call_async(&self.method, self.params.clone()).await?;
        log::debug!("{} is tracked by task {task}", self.method);

        let outcome = self.follow_task(session, &task).await;
        if let Err(e) = session.destroy_task(&task).await {
            log::warn!("failed to destroy task {task}: {e}");
        }

        if outcome.is_ok() {
            self.handle.set_description("Completed");
        }
        outcome
    }
}
