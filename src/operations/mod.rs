//! Operations run against a [`Session`]: the trait every unit of work
//! implements, its observable handle, and the composite that sequences them.

pub mod api_call;
pub mod handle;
pub mod multiple;

use crate::http::{ApiError, Session};
use crate::models::operation_status::OperationStatus;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

pub use api_call::ApiCallOperation;
pub use handle::{Listener, OperationEvent, OperationHandle, WeakOperationHandle};
pub use multiple::MultipleOperation;

pub const CANCELLED_MESSAGE: &str = "Operation cancelled.";
pub const MULTIPLE_ERRORS_MESSAGE: &str = "Some errors were encountered.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}", MULTIPLE_ERRORS_MESSAGE)]
    MultipleFailures(usize),

    #[error("{}", CANCELLED_MESSAGE)]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait Operation: Send + Sync {
    fn handle(&self) -> &OperationHandle;

    /// Performs the work. Implementations report progress through
    /// [`Operation::handle`] and should observe its cancellation token.
    async fn run(&self, session: &Session) -> Result<(), OperationError>;

    fn cancel(&self) {
        self.handle().cancel();
    }

    /// Runs the operation and folds every outcome into its handle. Never fails
    /// and never unwinds, even if `run` panics.
    async fn run_to_completion(&self, session: &Session) {
        let handle = self.handle();
        handle.begin();
        log::debug!("running '{}'", handle.title());

        let status = match AssertUnwindSafe(self.run(session)).catch_unwind().await {
            Ok(Ok(())) => OperationStatus::Succeeded,
            Ok(Err(OperationError::Cancelled)) => {
                handle.set_error(Some(CANCELLED_MESSAGE.to_string()));
                OperationStatus::Cancelled
            }
            Ok(Err(e)) => {
                handle.set_error(Some(e.to_string()));
                OperationStatus::Failed
            }
            Err(_) => {
                log::error!("'{}' panicked", handle.title());
                handle.set_error(Some(UNKNOWN_ERROR_MESSAGE.to_string()));
                OperationStatus::Failed
            }
        };
        handle.complete(status);
    }
}
