use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use reportflow_reports::{ColumnSelection, ExportJob, ExportObjectType, Report};

use crate::store::{ExportJobStore, StoreError};

/// Persists validated export requests as `PENDING` jobs.
#[derive(Clone)]
pub struct ExportJobFactory {
    store: Arc<dyn ExportJobStore>,
}

impl ExportJobFactory {
    pub fn new(store: Arc<dyn ExportJobStore>) -> Self {
        Self { store }
    }

    /// Inputs must already have passed column and filter validation.
    pub async fn create(
        &self,
        export_type: ExportObjectType,
        columns: ColumnSelection,
        filter: Option<JsonValue>,
    ) -> Result<Report, StoreError> {
        let job = self
            .store
            .create(ExportJob::pending(export_type, columns, filter))
            .await?;

        info!(job_id = %job.id, export_type = %job.export_type, "export job created");
        Ok(job.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryExportJobStore;
    use reportflow_reports::JobStatus;
    use serde_json::json;

    #[tokio::test]
    async fn creates_a_pending_job_with_the_given_inputs() {
        let store = InMemoryExportJobStore::arc();
        let factory = ExportJobFactory::new(store.clone());
        let columns = ColumnSelection::new(["ID", "NAME"]).with_channels(["c1"]);

        let report = factory
            .create(
                ExportObjectType::Products,
                columns.clone(),
                Some(json!({"search": "tee"})),
            )
            .await
            .unwrap();

        assert_eq!(report.export_type, ExportObjectType::Products);
        let job = store.get(report.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.columns, columns);
        assert_eq!(job.filter, Some(json!({"search": "tee"})));
        assert!(job.content_artifact.is_none());
    }
}
