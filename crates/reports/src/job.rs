use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use reportflow_core::{DomainError, DomainResult, Entity, ExportJobId, ValueObject};

use crate::columns::ColumnSelection;

/// Kind of data an export produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportObjectType {
    Products,
    Orders,
}

impl ExportObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportObjectType::Products => "PRODUCTS",
            ExportObjectType::Orders => "ORDERS",
        }
    }
}

impl core::fmt::Display for ExportObjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ExportObjectType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCTS" => Ok(ExportObjectType::Products),
            "ORDERS" => Ok(ExportObjectType::Orders),
            other => Err(DomainError::validation(format!("unknown export type: {other}"))),
        }
    }
}

/// Export job status.
///
/// `Pending` is the only non-terminal state; a job leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!("unknown job status: {other}"))),
        }
    }
}

/// Opaque reference to produced export output (storage key, URL, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentArtifact(String);

impl ValueObject for ContentArtifact {}

impl ContentArtifact {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of a created job, as handed back to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ExportJobId,
    #[serde(rename = "type")]
    pub export_type: ExportObjectType,
}

/// A durable export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Unique job ID
    pub id: ExportJobId,
    /// What is being exported
    #[serde(rename = "type")]
    pub export_type: ExportObjectType,
    /// Requested columns, stored as submitted
    pub columns: ColumnSelection,
    /// Parsed filter payload, if one was submitted
    pub filter: Option<JsonValue>,
    /// Current status
    pub status: JobStatus,
    /// Produced output, once processing attaches one
    pub content_artifact: Option<ContentArtifact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportJob {
    /// Build a new job in `Pending`. Callers validate `columns` and `filter` first.
    pub fn pending(
        export_type: ExportObjectType,
        columns: ColumnSelection,
        filter: Option<JsonValue>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ExportJobId::new(),
            export_type,
            columns,
            filter,
            status: JobStatus::Pending,
            content_artifact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn report(&self) -> Report {
        Report {
            id: self.id,
            export_type: self.export_type,
        }
    }

    /// Move a pending job to a terminal status, replacing its artifact.
    pub fn finish(
        &mut self,
        status: JobStatus,
        content_artifact: Option<ContentArtifact>,
    ) -> DomainResult<()> {
        if !status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "{status} is not a terminal status"
            )));
        }
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "export job {} already finished with {}",
                self.id, self.status
            )));
        }

        self.status = status;
        self.content_artifact = content_artifact;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record produced output while the job is still running.
    pub fn attach_artifact(&mut self, artifact: ContentArtifact) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "export job {} already finished with {}",
                self.id, self.status
            )));
        }

        self.content_artifact = Some(artifact);
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Entity for ExportJob {
    type Id = ExportJobId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
