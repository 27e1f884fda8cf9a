use super::{Operation, OperationError, OperationEvent, OperationHandle, WeakOperationHandle};
use crate::http::Session;
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// Runs a fixed list of sub-operations one after the other as a single unit of
/// work, with one aggregated progress value and one terminal error.
pub struct MultipleOperation {
    handle: OperationHandle,
    sub_operations: Vec<Arc<dyn Operation>>,
    end_description: String,
    stop_on_first_error: bool,
}

#[derive(Debug, Default)]
struct RunErrors {
    first: Option<String>,
    messages: Vec<String>,
}

impl RunErrors {
    /// Returns `true` when `message` is the first error of the run.
    fn record(&mut self, message: String) -> bool {
        let is_first = self.first.is_none();
        if is_first {
            self.first = Some(message.clone());
        }
        self.messages.push(message);
        is_first
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn into_result(self) -> Result<(), OperationError> {
        match (self.first, self.messages.len()) {
            (None, _) => Ok(()),
            (Some(first), 1) => Err(OperationError::Failed(first)),
            (Some(_), count) => Err(OperationError::MultipleFailures(count)),
        }
    }
}

impl MultipleOperation {
    pub fn new(
        title: impl Into<String>,
        start_description: impl Into<String>,
        end_description: impl Into<String>,
        sub_operations: Vec<Arc<dyn Operation>>,
        show_sub_operation_details: bool,
        stop_on_first_error: bool,
    ) -> Self {
        let handle = OperationHandle::new(title, start_description);
        let siblings: Arc<[WeakOperationHandle]> = sub_operations
            .iter()
            .map(|sub_operation| sub_operation.handle().downgrade())
            .collect();

        for sub_operation in &sub_operations {
            let parent = handle.downgrade();
            let source = sub_operation.handle().downgrade();
            let siblings = siblings.clone();
            sub_operation
                .handle()
                .subscribe(Arc::new(move |event: &OperationEvent| {
                    if !matches!(
                        event,
                        OperationEvent::ProgressChanged(_) | OperationEvent::DescriptionChanged(_)
                    ) {
                        return;
                    }
                    if let (Some(parent), Some(source)) = (parent.upgrade(), source.upgrade()) {
                        on_sub_operation_changed(
                            &parent,
                            &source,
                            &siblings,
                            show_sub_operation_details,
                        );
                    }
                }));
        }

        let children: Vec<Weak<dyn Operation>> =
            sub_operations.iter().map(Arc::downgrade).collect();
        handle.subscribe(Arc::new(move |event: &OperationEvent| {
            if let OperationEvent::Completed(_) = event {
                cancel_unfinished(&children);
            }
        }));

        Self {
            handle,
            sub_operations,
            end_description: end_description.into(),
            stop_on_first_error,
        }
    }

    pub fn sub_operations(&self) -> &[Arc<dyn Operation>] {
        &self.sub_operations
    }
}

#[async_trait]
impl Operation for MultipleOperation {
    fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    async fn run(&self, session: &Session) -> Result<(), OperationError> {
        let title = self.handle.title();
        let total = self.sub_operations.len();
        let mut errors = RunErrors::default();
        let mut skipped = 0;

        let cancelled_at_start = self.handle.is_cancelled();
        self.handle.set_percent_complete(0);

        for (index, sub_operation) in self.sub_operations.iter().enumerate() {
            if self.handle.is_cancelled() {
                skipped = total - index;
                log::info!("'{title}' cancelled, skipping {skipped} remaining sub-operation(s)");
                break;
            }

            let sub_handle = sub_operation.handle();
            self.handle.set_sub_operation(sub_handle.title(), sub_handle.description());
            sub_operation.run_to_completion(session).await;

            if let Some(message) = sub_handle.error_message() {
                log::warn!("'{}' failed: {message}", sub_handle.title());
                if errors.record(message.clone()) {
                    self.handle.set_error(Some(message));
                }
                if self.stop_on_first_error {
                    skipped = total - index - 1;
                    if skipped > 0 {
                        log::info!(
                            "'{title}' stopping on first error, skipping {skipped} sub-operation(s)"
                        );
                    }
                    break;
                }
            }
        }

        self.handle.set_percent_complete(100);
        self.handle.set_description(self.end_description.clone());

        // NOTE: a cancellation that arrived after every sub-operation had already
        //       succeeded did not change the outcome, so it is not reported.
        let stopped_by_cancel = self.handle.is_cancelled()
            && (cancelled_at_start || skipped > 0 || !errors.is_empty());
        if stopped_by_cancel {
            return Err(OperationError::Cancelled);
        }
        if errors.messages.len() > 1 {
            log::error!(
                "'{title}' finished with {} errors: {}",
                errors.messages.len(),
                errors.messages.join("; ")
            );
        }
        errors.into_result()
    }

    fn cancel(&self) {
        self.handle.cancel();
        for sub_operation in &self.sub_operations {
            if !sub_operation.handle().is_completed() {
                sub_operation.cancel();
            }
        }
    }
}

fn on_sub_operation_changed(
    parent: &OperationHandle,
    source: &OperationHandle,
    siblings: &[WeakOperationHandle],
    show_sub_operation_details: bool,
) {
    let description = source.description();
    parent.set_sub_operation(source.title(), description.clone());
    if show_sub_operation_details {
        parent.set_description(description);
    }

    let percents: Vec<u8> = siblings
        .iter()
        .map(|sibling| {
            sibling
                .upgrade()
                .map_or(0, |sibling| sibling.percent_complete())
        })
        .collect();
    if let Some(mean) = mean_percent(&percents) {
        parent.set_percent_complete(mean);
    }
}

fn cancel_unfinished(children: &[Weak<dyn Operation>]) {
    for child in children.iter().filter_map(Weak::upgrade) {
        if !child.handle().is_completed() {
            child.cancel();
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mean_percent(percents: &[u8]) -> Option<u8> {
    if percents.is_empty() {
        return None;
    }
    let total: usize = percents.iter().map(|&percent| usize::from(percent)).sum();
    Some((total / percents.len()) as u8)
}
