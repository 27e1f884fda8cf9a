use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::sync::Notify;
use vmconsole::operations::{Operation, OperationError, OperationHandle};
use vmconsole::Session;

#[derive(Clone)]
pub enum Outcome {
    Succeed,
    Fail(String),
    Panic,
}

/// An operation that walks through fixed progress steps and then finishes
/// with a chosen outcome. It never observes its own cancellation flag.
pub struct ScriptedOperation {
    handle: OperationHandle,
    steps: Vec<u8>,
    description: Option<String>,
    outcome: Outcome,
    runs: AtomicUsize,
    gate: Option<Gate>,
}

#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

impl ScriptedOperation {
    pub fn new(title: &str, outcome: Outcome) -> Self {
        Self {
            handle: OperationHandle::new(title, "Queued"),
            steps: vec![100],
            description: None,
            outcome,
            runs: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn succeeding(title: &str) -> Arc<Self> {
        Arc::new(Self::new(title, Outcome::Succeed))
    }

    pub fn failing(title: &str, message: &str) -> Arc<Self> {
        Arc::new(Self::new(title, Outcome::Fail(message.to_string())))
    }

    pub fn with_steps(mut self, steps: &[u8]) -> Self {
        self.steps = steps.to_vec();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Blocks the run after it starts until `gate.release` is notified.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operation for ScriptedOperation {
    fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    async fn run(&self, _session: &Session) -> Result<(), OperationError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(description) = &self.description {
            self.handle.set_description(description.clone());
        }
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        for &step in &self.steps {
            self.handle.set_percent_complete(step);
            tokio::task::yield_now().await;
        }
        match &self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail(message) => Err(OperationError::Failed(message.clone())),
            Outcome::Panic => panic!("scripted panic in '{}'", self.handle.title()),
        }
    }
}
