//! Export job persistence.
//!
//! One record per job, keyed by id. The only mutations are the initial insert,
//! an artifact attach while the job is pending, and the single terminal status
//! update, each of them atomic per key.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use reportflow_core::ExportJobId;
use reportflow_reports::{ContentArtifact, ExportJob, JobStatus};

pub use in_memory::InMemoryExportJobStore;
pub use postgres::PostgresExportJobStore;

/// Job store abstraction.
#[async_trait]
pub trait ExportJobStore: Send + Sync {
    /// Persist a freshly built job.
    async fn create(&self, job: ExportJob) -> Result<ExportJob, StoreError>;

    /// Get a job by ID.
    async fn get(&self, id: ExportJobId) -> Result<Option<ExportJob>, StoreError>;

    /// Keyed terminal update.
    ///
    /// Applies only to a `PENDING` job; a job that already finished yields
    /// `StoreError::AlreadyTerminal` and is left untouched.
    async fn update_status(
        &self,
        id: ExportJobId,
        status: JobStatus,
        content_artifact: Option<ContentArtifact>,
    ) -> Result<StatusChange, StoreError>;

    /// Record produced output for a job that is still pending.
    async fn attach_artifact(
        &self,
        id: ExportJobId,
        artifact: ContentArtifact,
    ) -> Result<ExportJob, StoreError>;

    /// Jobs in creation order, starting after the `after` cursor.
    async fn list(
        &self,
        first: usize,
        after: Option<ExportJobId>,
    ) -> Result<Vec<ExportJob>, StoreError>;

    /// Total number of jobs.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Outcome of a keyed status update.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub previous: ExportJob,
    pub current: ExportJob,
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("export job not found: {0}")]
    NotFound(ExportJobId),
    #[error("export job already exists: {0}")]
    AlreadyExists(ExportJobId),
    #[error("export job {id} already finished with {status}")]
    AlreadyTerminal { id: ExportJobId, status: JobStatus },
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("storage error: {0}")]
    Storage(String),
}
