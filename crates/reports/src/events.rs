//! Domain events emitted when an export job reaches a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reportflow_events::Event;

use crate::job::ExportJob;

/// Event: the export finished and the job is `Success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSucceeded {
    pub job: ExportJob,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the export failed and the job is `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFailed {
    pub job: ExportJob,
    /// Stringified cause reported by the worker.
    pub message: String,
    /// Stringified failure classification.
    pub error_type: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExportEvent {
    ExportSucceeded(ExportSucceeded),
    ExportFailed(ExportFailed),
}

impl ExportEvent {
    pub fn succeeded(job: ExportJob) -> Self {
        ExportEvent::ExportSucceeded(ExportSucceeded {
            job,
            occurred_at: Utc::now(),
        })
    }

    pub fn failed(job: ExportJob, message: impl Into<String>, error_type: impl Into<String>) -> Self {
        ExportEvent::ExportFailed(ExportFailed {
            job,
            message: message.into(),
            error_type: error_type.into(),
            occurred_at: Utc::now(),
        })
    }

    /// Job state as of the transition.
    pub fn job(&self) -> &ExportJob {
        match self {
            ExportEvent::ExportSucceeded(e) => &e.job,
            ExportEvent::ExportFailed(e) => &e.job,
        }
    }
}

impl Event for ExportEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExportEvent::ExportSucceeded(_) => "export.succeeded",
            ExportEvent::ExportFailed(_) => "export.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExportEvent::ExportSucceeded(e) => e.occurred_at,
            ExportEvent::ExportFailed(e) => e.occurred_at,
        }
    }
}
