//! Failure notifications for staff/operators.
//!
//! Sent once per failed export, after the job record and the failure event.
//! Delivery is best-effort: the lifecycle logs a delivery error and moves on.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use reportflow_core::ExportJobId;
use reportflow_reports::ExportJob;

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound notification channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Tell the people who care that `job` failed.
    async fn notify_export_failed(&self, job: &ExportJob) -> Result<(), NotificationError>;
}

/// Writes the notification to the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSender;

#[async_trait]
impl NotificationSender for TracingNotificationSender {
    async fn notify_export_failed(&self, job: &ExportJob) -> Result<(), NotificationError> {
        warn!(
            job_id = %job.id,
            export_type = %job.export_type,
            notification = "export_failed",
            "export failed; notifying staff"
        );
        Ok(())
    }
}

/// Keeps sent notifications in memory (tests, local runs).
#[derive(Debug, Default)]
pub struct InMemoryNotificationOutbox {
    sent: Mutex<Vec<ExportJobId>>,
}

impl InMemoryNotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job ids notified so far, in order.
    pub fn sent(&self) -> Vec<ExportJobId> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationOutbox {
    async fn notify_export_failed(&self, job: &ExportJob) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .map_err(|_| NotificationError::Delivery("outbox lock poisoned".to_string()))?
            .push(job.id);
        Ok(())
    }
}
