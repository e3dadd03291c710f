//! In-memory job store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use reportflow_core::{DomainError, Entity, ExportJobId};
use reportflow_reports::{ContentArtifact, ExportJob, JobStatus};

use super::{ExportJobStore, StatusChange, StoreError};

/// In-memory job store.
///
/// Keyed by id in a `BTreeMap`; ids are time-ordered so iteration order is
/// creation order.
#[derive(Debug, Default)]
pub struct InMemoryExportJobStore {
    jobs: RwLock<BTreeMap<ExportJobId, ExportJob>>,
}

impl InMemoryExportJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<ExportJobId, ExportJob>>, StoreError> {
        self.jobs
            .read()
            .map_err(|_| StoreError::Storage("job store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<ExportJobId, ExportJob>>, StoreError> {
        self.jobs
            .write()
            .map_err(|_| StoreError::Storage("job store lock poisoned".to_string()))
    }
}

fn transition_error(job: &ExportJob, err: DomainError) -> StoreError {
    match err {
        DomainError::Conflict(_) => StoreError::AlreadyTerminal {
            id: job.id,
            status: job.status,
        },
        other => StoreError::InvalidTransition(other.to_string()),
    }
}

#[async_trait]
impl ExportJobStore for InMemoryExportJobStore {
    async fn create(&self, job: ExportJob) -> Result<ExportJob, StoreError> {
        let mut jobs = self.write()?;
        let id = *job.id();
        if jobs.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: ExportJobId) -> Result<Option<ExportJob>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: ExportJobId,
        status: JobStatus,
        content_artifact: Option<ContentArtifact>,
    ) -> Result<StatusChange, StoreError> {
        let mut jobs = self.write()?;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let previous = job.clone();
        job.finish(status, content_artifact)
            .map_err(|e| transition_error(&previous, e))?;

        Ok(StatusChange {
            previous,
            current: job.clone(),
        })
    }

    async fn attach_artifact(
        &self,
        id: ExportJobId,
        artifact: ContentArtifact,
    ) -> Result<ExportJob, StoreError> {
        let mut jobs = self.write()?;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let snapshot = job.clone();
        job.attach_artifact(artifact)
            .map_err(|e| transition_error(&snapshot, e))?;
        Ok(job.clone())
    }

    async fn list(
        &self,
        first: usize,
        after: Option<ExportJobId>,
    ) -> Result<Vec<ExportJob>, StoreError> {
        let jobs = self.read()?;
        let page = match after {
            Some(cursor) => jobs
                .range((std::ops::Bound::Excluded(cursor), std::ops::Bound::Unbounded))
                .map(|(_, job)| job.clone())
                .take(first)
                .collect(),
            None => jobs.values().take(first).cloned().collect(),
        };
        Ok(page)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }
}
