//! Task queue seam between the request path and out-of-process export work.
//!
//! ## Contract
//!
//! - `TaskQueue::enqueue(job_id)` hands one unit of work to the queue; the job
//!   id is the only argument the worker receives
//! - once the work finishes the queue calls exactly one of
//!   `TaskCallbacks::on_success` / `TaskCallbacks::on_failure`
//! - retries, scaling and scheduling are the queue's business
//!
//! ## Components
//!
//! - `LocalTaskQueue`: in-process queue + worker loop (dev, single binary)
//! - `RecordingTaskQueue`: records dispatches without running anything (tests)

pub mod local;

use std::sync::Mutex;

use async_trait::async_trait;

use reportflow_core::ExportJobId;
use reportflow_reports::ContentArtifact;

pub use local::{
    ExportProcessor, LocalTaskQueue, NullExportProcessor, ProcessingError, WorkerConfig,
    WorkerHandle, WorkerStats,
};

/// Queue that accepts export work.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, job_id: ExportJobId) -> Result<(), TaskQueueError>;
}

/// Terminal callbacks invoked by the queue after processing.
#[async_trait]
pub trait TaskCallbacks: Send + Sync {
    async fn on_success(&self, job_id: ExportJobId, output: TaskOutput);

    async fn on_failure(&self, job_id: ExportJobId, failure: TaskFailure);
}

/// What a successful unit of work hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Produced artifact, if the worker reports one.
    pub artifact: Option<ContentArtifact>,
}

/// Diagnostic info for a failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Stringified cause.
    pub error: String,
    /// Stringified failure classification.
    pub error_type: String,
}

impl TaskFailure {
    pub fn new(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: error_type.into(),
        }
    }
}

/// Task queue error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskQueueError {
    #[error("task queue is closed")]
    Closed,
    #[error("task queue error: {0}")]
    Backend(String),
}

/// Queue that only records what it was asked to run.
#[derive(Debug, Default)]
pub struct RecordingTaskQueue {
    dispatched: Mutex<Vec<ExportJobId>>,
    fail_with: Option<TaskQueueError>,
}

impl RecordingTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that refuses every enqueue with `error`.
    pub fn failing(error: TaskQueueError) -> Self {
        Self {
            dispatched: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn dispatched(&self) -> Vec<ExportJobId> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched().len()
    }
}

impl TaskQueue for RecordingTaskQueue {
    fn enqueue(&self, job_id: ExportJobId) -> Result<(), TaskQueueError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.dispatched
            .lock()
            .map_err(|_| TaskQueueError::Backend("recording queue lock poisoned".to_string()))?
            .push(job_id);
        Ok(())
    }
}
