use crate::models::{
    operation::{OperationState, SubOperationInfo},
    operation_status::OperationStatus,
};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OperationEvent {
    DescriptionChanged(String),
    ProgressChanged(u8),
    SubOperationChanged { title: String, description: String },
    ErrorChanged(Option<String>),
    Completed(OperationStatus),
}

pub type Listener = Arc<dyn Fn(&OperationEvent) + Send + Sync>;

/// Shared, observable state of one operation.
///
/// Clones refer to the same operation. Listeners run synchronously on the
/// thread that changed the state and never while the state lock is held, so a
/// listener may freely read this or any other handle.
#[derive(Clone)]
pub struct OperationHandle {
    inner: Arc<HandleInner>,
}

/// Non-owning reference to an [`OperationHandle`], used by listeners to avoid cycles.
#[derive(Clone)]
pub struct WeakOperationHandle {
    inner: Weak<HandleInner>,
}

struct HandleInner {
    state: Mutex<OperationState>,
    listeners: Mutex<Vec<Listener>>,
    cancellation: CancellationToken,
}

impl OperationHandle {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                state: Mutex::new(OperationState::new(title.into(), description.into())),
                listeners: Mutex::new(Vec::new()),
                cancellation: CancellationToken::new(),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakOperationHandle {
        WeakOperationHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
    }

    pub fn snapshot(&self) -> OperationState {
        self.state().clone()
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    pub fn description(&self) -> String {
        self.state().description.clone()
    }

    pub fn percent_complete(&self) -> u8 {
        self.state().percent_complete
    }

    pub fn status(&self) -> OperationStatus {
        self.state().status
    }

    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    pub fn has_error(&self) -> bool {
        self.state().has_error()
    }

    pub fn error_message(&self) -> Option<String> {
        self.state().error_message.clone()
    }

    pub fn sub_operation(&self) -> Option<SubOperationInfo> {
        self.state().sub_operation.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        {
            let mut state = self.state();
            if state.description == description {
                return;
            }
            state.description.clone_from(&description);
        }
        self.emit(&OperationEvent::DescriptionChanged(description));
    }

    /// Values above 100 are clamped.
    pub fn set_percent_complete(&self, percent: u8) {
        let percent = percent.min(100);
        {
            let mut state = self.state();
            if state.percent_complete == percent {
                return;
            }
            state.percent_complete = percent;
        }
        self.emit(&OperationEvent::ProgressChanged(percent));
    }

    pub fn set_error(&self, message: Option<String>) {
        {
            let mut state = self.state();
            if state.error_message == message {
                return;
            }
            state.error_message.clone_from(&message);
        }
        self.emit(&OperationEvent::ErrorChanged(message));
    }

    pub fn set_sub_operation(&self, title: impl Into<String>, description: impl Into<String>) {
        let info = SubOperationInfo {
            title: title.into(),
            description: description.into(),
        };
        self.state().sub_operation = Some(info.clone());
        self.emit(&OperationEvent::SubOperationChanged {
            title: info.title,
            description: info.description,
        });
    }

    pub fn cancel(&self) {
        if !self.inner.cancellation.is_cancelled() {
            log::debug!("cancellation requested for '{}'", self.title());
            self.inner.cancellation.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancellation.cancelled().await;
    }

    pub(crate) fn begin(&self) {
        self.state().status = OperationStatus::Running;
        self.set_error(None);
        self.set_percent_complete(0);
    }

    pub(crate) fn complete(&self, status: OperationStatus) {
        self.state().status = status;
        self.emit(&OperationEvent::Completed(status));
    }

    fn state(&self) -> MutexGuard<'_, OperationState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, event: &OperationEvent) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(event);
        }
    }
}

impl WeakOperationHandle {
    pub fn upgrade(&self) -> Option<OperationHandle> {
        self.inner.upgrade().map(|inner| OperationHandle { inner })
    }
}

impl std::fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("state", &*self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
