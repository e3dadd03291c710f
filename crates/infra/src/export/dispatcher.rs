use std::sync::Arc;

use tracing::{info, warn};

use reportflow_core::ExportJobId;

use crate::task_queue::{TaskQueue, TaskQueueError};

/// Hands created jobs to the task queue.
#[derive(Clone)]
pub struct TaskDispatcher {
    queue: Arc<dyn TaskQueue>,
}

impl TaskDispatcher {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    /// One enqueue per call; no retries here.
    pub fn dispatch(&self, job_id: ExportJobId) -> Result<(), TaskQueueError> {
        match self.queue.enqueue(job_id) {
            Ok(()) => {
                info!(job_id = %job_id, "export job dispatched");
                Ok(())
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "export job dispatch failed");
                Err(err)
            }
        }
    }
}
