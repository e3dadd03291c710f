//! Terminal transitions of export jobs.
//!
//! Both callbacks follow the same order: keyed store update, then the event,
//! then (failure only) the staff notification. Publishing and notifying are
//! fire-and-forget; the stored status is the source of truth.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use reportflow_core::ExportJobId;
use reportflow_events::{EventBus, EventEnvelope};
use reportflow_reports::{ExportEvent, ExportJob, JobStatus};

use crate::notifications::NotificationSender;
use crate::store::{ExportJobStore, StoreError};
use crate::task_queue::{TaskCallbacks, TaskFailure, TaskOutput};

/// Where lifecycle events go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

impl<B> EventSink for B
where
    B: EventBus<EventEnvelope<ExportEvent>>,
{
    fn emit(&self, event: ExportEvent) {
        let job_id = event.job().id;
        let envelope = EventEnvelope::wrap(job_id, event);
        let event_id = envelope.event_id();
        let event_type = envelope.event_type().to_string();

        match self.publish(envelope) {
            Ok(()) => debug!(job_id = %job_id, event_id = %event_id, event_type = %event_type, "export event published"),
            Err(err) => warn!(
                job_id = %job_id,
                event_id = %event_id,
                event_type = %event_type,
                error = ?err,
                "failed to publish export event"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Persist the processor's artifact on success instead of clearing it.
    pub keep_artifact_on_success: bool,
}

/// Applies terminal callbacks to export jobs.
pub struct JobLifecycleTransitioner {
    store: Arc<dyn ExportJobStore>,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn NotificationSender>,
    config: LifecycleConfig,
}

impl JobLifecycleTransitioner {
    pub fn new(
        store: Arc<dyn ExportJobStore>,
        events: Arc<dyn EventSink>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            events,
            notifier,
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// `PENDING -> SUCCESS`, then `export.succeeded`.
    pub async fn on_success(
        &self,
        job_id: ExportJobId,
        output: TaskOutput,
    ) -> Result<ExportJob, StoreError> {
        let artifact = if self.config.keep_artifact_on_success {
            output.artifact
        } else {
            None
        };

        let change = self
            .store
            .update_status(job_id, JobStatus::Success, artifact)
            .await?;
        info!(
            job_id = %job_id,
            previous = %change.previous.status,
            "export job succeeded"
        );

        self.events.emit(ExportEvent::succeeded(change.current.clone()));
        Ok(change.current)
    }

    /// `PENDING -> FAILED`, then `export.failed`, then the staff notification.
    pub async fn on_failure(
        &self,
        job_id: ExportJobId,
        failure: &TaskFailure,
    ) -> Result<ExportJob, StoreError> {
        let change = self
            .store
            .update_status(job_id, JobStatus::Failed, None)
            .await?;
        warn!(
            job_id = %job_id,
            error = %failure.error,
            error_type = %failure.error_type,
            "export job failed"
        );

        let job = change.current;
        self.events.emit(ExportEvent::failed(
            job.clone(),
            failure.error.clone(),
            failure.error_type.clone(),
        ));

        if let Err(err) = self.notifier.notify_export_failed(&job).await {
            warn!(job_id = %job_id, error = %err, "failed to send export failure notification");
        }

        Ok(job)
    }

    fn log_outcome(job_id: ExportJobId, callback: &str, result: Result<ExportJob, StoreError>) {
        match result {
            Ok(_) => {}
            Err(StoreError::AlreadyTerminal { status, .. }) => {
                warn!(
                    job_id = %job_id,
                    callback,
                    status = %status,
                    "ignoring terminal callback for finished export job"
                );
            }
            Err(err) => {
                error!(job_id = %job_id, callback, error = %err, "terminal callback not applied");
            }
        }
    }
}

#[async_trait]
impl TaskCallbacks for JobLifecycleTransitioner {
    async fn on_success(&self, job_id: ExportJobId, output: TaskOutput) {
        let result = JobLifecycleTransitioner::on_success(self, job_id, output).await;
        Self::log_outcome(job_id, "on_success", result);
    }

    async fn on_failure(&self, job_id: ExportJobId, failure: TaskFailure) {
        let result = JobLifecycleTransitioner::on_failure(self, job_id, &failure).await;
        Self::log_outcome(job_id, "on_failure", result);
    }
}
