//! In-process task queue with a tokio worker loop.
//!
//! Stands in for an external queue when everything runs in one binary. Work is
//! kept in a FIFO; workers pop job ids, run the registered `ExportProcessor`,
//! and report the outcome through `TaskCallbacks`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use reportflow_core::ExportJobId;

use super::{TaskCallbacks, TaskFailure, TaskOutput, TaskQueue, TaskQueueError};

/// Produces the export for one job.
///
/// Rendering is outside this workspace; implementations plug in here.
#[async_trait]
pub trait ExportProcessor: Send + Sync {
    async fn process(&self, job_id: ExportJobId) -> Result<TaskOutput, ProcessingError>;
}

/// Failure raised while producing an export.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessingError {
    #[error("{0}")]
    Fetch(String),
    #[error("{0}")]
    Render(String),
    #[error("{0}")]
    Storage(String),
}

impl ProcessingError {
    /// Stable classification, reported alongside the cause.
    pub fn classification(&self) -> &'static str {
        match self {
            ProcessingError::Fetch(_) => "ProcessingError::Fetch",
            ProcessingError::Render(_) => "ProcessingError::Render",
            ProcessingError::Storage(_) => "ProcessingError::Storage",
        }
    }
}

impl From<&ProcessingError> for TaskFailure {
    fn from(err: &ProcessingError) -> Self {
        TaskFailure::new(err.to_string(), err.classification())
    }
}

/// Processor that acknowledges every job without producing output.
///
/// Used when no renderer is wired in, so jobs still reach a terminal status.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullExportProcessor;

#[async_trait]
impl ExportProcessor for NullExportProcessor {
    async fn process(&self, job_id: ExportJobId) -> Result<TaskOutput, ProcessingError> {
        debug!(job_id = %job_id, "no export renderer configured; acknowledging job");
        Ok(TaskOutput::default())
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent worker tasks
    pub concurrency: usize,
    /// Name for logging
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            name: "export-worker".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub current_running: usize,
}

/// Handle to control running workers.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown; in-flight jobs finish first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for join in self.joins {
            let _ = join.await;
        }
    }
}

/// In-process task queue.
pub struct LocalTaskQueue {
    pending: Mutex<VecDeque<ExportJobId>>,
    notify: Notify,
    processor: Arc<dyn ExportProcessor>,
    callbacks: Arc<dyn TaskCallbacks>,
    stats: Mutex<WorkerStats>,
}

impl LocalTaskQueue {
    /// Create a queue that runs `processor` and reports to `callbacks`.
    pub fn new(processor: Arc<dyn ExportProcessor>, callbacks: Arc<dyn TaskCallbacks>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            processor,
            callbacks,
            stats: Mutex::new(WorkerStats::default()),
        }
    }

    /// Number of queued, not yet started jobs.
    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Run everything queued so far on the current task. Returns the number of
    /// jobs executed.
    pub async fn run_pending(&self) -> usize {
        let mut executed = 0;
        while let Some(job_id) = self.pop() {
            self.execute(job_id).await;
            executed += 1;
        }
        executed
    }

    /// Spawn background workers on the current tokio runtime.
    pub fn spawn(self: &Arc<Self>, config: WorkerConfig) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = (0..config.concurrency.max(1))
            .map(|n| {
                let queue = Arc::clone(self);
                let name = format!("{}-{}", config.name, n);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(async move { queue.worker_loop(name, shutdown).await })
            })
            .collect();

        WorkerHandle {
            shutdown: shutdown_tx,
            joins,
        }
    }

    fn pop(&self) -> Option<ExportJobId> {
        self.pending.lock().ok()?.pop_front()
    }

    fn update_stats(&self, f: impl FnOnce(&mut WorkerStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    async fn worker_loop(&self, name: String, mut shutdown: watch::Receiver<bool>) {
        info!(worker = %name, "export worker started");
        let started = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.pop() {
                Some(job_id) => {
                    debug!(worker = %name, job_id = %job_id, "picked up export job");
                    self.execute(job_id).await;
                }
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        changed = shutdown.changed() => {
                            // Handle dropped without an explicit shutdown.
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!(
            worker = %name,
            uptime_secs = started.elapsed().as_secs(),
            "export worker stopped"
        );
    }

    async fn execute(&self, job_id: ExportJobId) {
        self.update_stats(|s| s.current_running += 1);

        let processor = Arc::clone(&self.processor);
        let outcome = tokio::spawn(async move { processor.process(job_id).await }).await;

        let succeeded = match outcome {
            Ok(Ok(output)) => {
                self.callbacks.on_success(job_id, output).await;
                true
            }
            Ok(Err(err)) => {
                warn!(job_id = %job_id, error = %err, "export processing failed");
                self.callbacks.on_failure(job_id, TaskFailure::from(&err)).await;
                false
            }
            Err(join_err) => {
                error!(job_id = %job_id, error = %join_err, "export processor panicked");
                self.callbacks
                    .on_failure(job_id, TaskFailure::new(join_err.to_string(), "Panicked"))
                    .await;
                false
            }
        };

        self.update_stats(|s| {
            s.current_running = s.current_running.saturating_sub(1);
            s.jobs_processed += 1;
            if succeeded {
                s.jobs_succeeded += 1;
            } else {
                s.jobs_failed += 1;
            }
        });
    }
}

impl TaskQueue for LocalTaskQueue {
    fn enqueue(&self, job_id: ExportJobId) -> Result<(), TaskQueueError> {
        self.pending
            .lock()
            .map_err(|_| TaskQueueError::Backend("local queue lock poisoned".to_string()))?
            .push_back(job_id);
        self.notify.notify_one();
        Ok(())
    }
}
