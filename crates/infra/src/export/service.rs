//! Transport-agnostic entry point for export requests and job reads.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};

use reportflow_core::ExportJobId;
use reportflow_reports::{
    ColumnSelection, ColumnSelectionValidator, ContentArtifact, ExportError, ExportJob,
    ExportObjectType, Report,
};

use crate::filter_validation::FilterValidator;
use crate::store::{ExportJobStore, StoreError};
use crate::task_queue::{TaskFailure, TaskQueue, TaskQueueError};

use super::dispatcher::TaskDispatcher;
use super::factory::ExportJobFactory;
use super::lifecycle::JobLifecycleTransitioner;

/// Largest page `list_jobs` hands out.
pub const MAX_PAGE_SIZE: usize = 100;

/// Classification recorded when the queue refuses a freshly created job.
const DISPATCH_FAILURE_TYPE: &str = "TaskQueueError";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request failed validation; nothing was persisted.
    #[error(transparent)]
    Rejected(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The job exists but the queue refused it; it has been marked `FAILED`.
    #[error("export job {} could not be dispatched: {source}", .report.id)]
    Dispatch {
        report: Report,
        source: TaskQueueError,
    },
}

impl SubmitError {
    /// Caller mistakes, as opposed to failures on our side.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SubmitError::Rejected(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("export job not found: {0}")]
    NotFound(ExportJobId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One page of jobs in creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPage {
    pub jobs: Vec<ExportJob>,
    pub total_count: usize,
    /// Cursor to pass as `after` for the next page.
    pub end_cursor: Option<ExportJobId>,
    pub has_next_page: bool,
}

pub struct ExportService {
    columns: ColumnSelectionValidator,
    filters: FilterValidator,
    factory: ExportJobFactory,
    dispatcher: TaskDispatcher,
    lifecycle: Arc<JobLifecycleTransitioner>,
    store: Arc<dyn ExportJobStore>,
}

impl ExportService {
    pub fn new(
        store: Arc<dyn ExportJobStore>,
        queue: Arc<dyn TaskQueue>,
        lifecycle: Arc<JobLifecycleTransitioner>,
        filters: FilterValidator,
    ) -> Self {
        Self {
            columns: ColumnSelectionValidator::default(),
            filters,
            factory: ExportJobFactory::new(Arc::clone(&store)),
            dispatcher: TaskDispatcher::new(queue),
            lifecycle,
            store,
        }
    }

    pub fn with_column_limit(mut self, limit: usize) -> Self {
        self.columns = ColumnSelectionValidator::new(limit);
        self
    }

    /// Validate, persist and dispatch one export request.
    ///
    /// Validation failures come back as `SubmitError::Rejected` and leave no
    /// trace in the store or the queue.
    #[instrument(skip(self, columns, filter))]
    pub async fn submit_export(
        &self,
        export_type: ExportObjectType,
        columns: ColumnSelection,
        filter: Option<&str>,
    ) -> Result<Report, SubmitError> {
        let result = self.try_submit(export_type, columns, filter).await;

        match &result {
            Ok(report) => info!(job_id = %report.id, "export request accepted"),
            Err(err) if err.is_rejection() => info!(error = %err, "export request rejected"),
            Err(err) => error!(error = %err, "export submission failed"),
        }

        result
    }

    async fn try_submit(
        &self,
        export_type: ExportObjectType,
        columns: ColumnSelection,
        filter: Option<&str>,
    ) -> Result<Report, SubmitError> {
        self.columns.validate(&columns)?;
        let filter = self.filters.validate(export_type, filter).await?;

        let report = self.factory.create(export_type, columns, filter).await?;

        if let Err(source) = self.dispatcher.dispatch(report.id) {
            let failure = TaskFailure::new(source.to_string(), DISPATCH_FAILURE_TYPE);
            if let Err(err) = self.lifecycle.on_failure(report.id, &failure).await {
                error!(job_id = %report.id, error = %err, "could not mark undispatched job as failed");
            }
            return Err(SubmitError::Dispatch { report, source });
        }

        Ok(report)
    }

    pub async fn get_job(&self, id: ExportJobId) -> Result<ExportJob, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Up to `first` jobs created after `after`. `first` is clamped to
    /// `1..=MAX_PAGE_SIZE` so every non-final page moves the cursor forward.
    pub async fn list_jobs(
        &self,
        first: usize,
        after: Option<ExportJobId>,
    ) -> Result<JobPage, ServiceError> {
        let first = first.clamp(1, MAX_PAGE_SIZE);

        let mut jobs = self.store.list(first + 1, after).await?;
        let has_next_page = jobs.len() > first;
        jobs.truncate(first);

        let total_count = self.store.count().await?;

        Ok(JobPage {
            end_cursor: jobs.last().map(|job| job.id),
            jobs,
            total_count,
            has_next_page,
        })
    }

    /// Artifact currently recorded for the job, if any.
    pub async fn get_export_file(
        &self,
        id: ExportJobId,
    ) -> Result<Option<ContentArtifact>, ServiceError> {
        Ok(self.get_job(id).await?.content_artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reportflow_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use reportflow_reports::{ExportErrorCode, ExportEvent, JobStatus};
    use serde_json::{Value as JsonValue, json};

    use crate::filter_validation::{RemoteFilterValidator, TransportError};
    use crate::notifications::InMemoryNotificationOutbox;
    use crate::store::InMemoryExportJobStore;
    use crate::task_queue::{
        LocalTaskQueue, NullExportProcessor, RecordingTaskQueue, TaskCallbacks, TaskOutput,
    };

    struct RejectingRemote(&'static str);

    #[async_trait]
    impl RemoteFilterValidator for RejectingRemote {
        async fn validate(
            &self,
            _export_type: ExportObjectType,
            _filter: &JsonValue,
        ) -> Result<(), TransportError> {
            Err(TransportError::Query(self.0.to_string()))
        }
    }

    struct Harness {
        service: ExportService,
        store: Arc<InMemoryExportJobStore>,
        queue: Arc<RecordingTaskQueue>,
        lifecycle: Arc<JobLifecycleTransitioner>,
        outbox: Arc<InMemoryNotificationOutbox>,
        events: Subscription<EventEnvelope<ExportEvent>>,
    }

    fn harness_with(queue: RecordingTaskQueue, filters: FilterValidator) -> Harness {
        let store = InMemoryExportJobStore::arc();
        let queue = Arc::new(queue);
        let outbox = Arc::new(InMemoryNotificationOutbox::new());
        let bus = Arc::new(InMemoryEventBus::<EventEnvelope<ExportEvent>>::new());
        let events = bus.subscribe();
        let lifecycle = Arc::new(JobLifecycleTransitioner::new(
            store.clone(),
            bus,
            outbox.clone(),
        ));
        let service = ExportService::new(store.clone(), queue.clone(), lifecycle.clone(), filters);

        Harness {
            service,
            store,
            queue,
            lifecycle,
            outbox,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingTaskQueue::new(), FilterValidator::parse_only())
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn fields_only_request_creates_and_dispatches_once() {
        let h = harness();
        let columns = ColumnSelection::new(["ID", "VARIANT_ID"]);

        let report = h
            .service
            .submit_export(ExportObjectType::Products, columns, None)
            .await
            .unwrap();

        assert_eq!(report.export_type, ExportObjectType::Products);
        let job = h.store.get(report.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.columns.fields, vec!["ID", "VARIANT_ID"]);
        assert!(job.columns.attributes.is_empty());
        assert!(job.columns.warehouses.is_empty());
        assert!(job.columns.channels.is_empty());
        assert_eq!(h.queue.dispatched(), vec![report.id]);
    }

    #[tokio::test]
    async fn id_sets_are_stored_unmodified() {
        let h = harness();
        let columns = ColumnSelection::new(["ID"])
            .with_attributes(["1", "2", "3"])
            .with_warehouses(["4", "5", "6"])
            .with_channels(["7", "8", "9"]);

        let report = h
            .service
            .submit_export(ExportObjectType::Products, columns.clone(), None)
            .await
            .unwrap();

        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(job.columns, columns);
        assert_eq!(h.queue.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn too_many_attributes_is_rejected_without_dispatch() {
        let h = harness();
        let columns = ColumnSelection::new(["ID"]).with_attributes(ids(101));

        let err = h
            .service
            .submit_export(ExportObjectType::Products, columns, None)
            .await
            .unwrap_err();

        match err {
            SubmitError::Rejected(e) => {
                assert_eq!(e.code, ExportErrorCode::LimitExceeded);
                assert_eq!(e.field.as_deref(), Some("attributes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.queue.dispatch_count(), 0);
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn too_many_warehouses_is_rejected_without_dispatch() {
        let h = harness();
        let columns = ColumnSelection::new(["ID"]).with_warehouses(ids(101));

        let err = h
            .service
            .submit_export(ExportObjectType::Products, columns, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Rejected(ref e) if e.field.as_deref() == Some("warehouses")
        ));
        assert_eq!(h.queue.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn malformed_filter_is_rejected_without_dispatch() {
        let h = harness();

        let err = h
            .service
            .submit_export(
                ExportObjectType::Products,
                ColumnSelection::new(["ID"]),
                Some("{not a real json}"),
            )
            .await
            .unwrap_err();

        match err {
            SubmitError::Rejected(e) => assert_eq!(e.code, ExportErrorCode::InvalidFilter),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.queue.dispatch_count(), 0);
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remote_rejection_surfaces_the_remote_message() {
        let h = harness_with(
            RecordingTaskQueue::new(),
            FilterValidator::with_remote(Arc::new(RejectingRemote("remote error"))),
        );

        let err = h
            .service
            .submit_export(
                ExportObjectType::Products,
                ColumnSelection::new(["ID"]),
                Some(r#"{"notReal": "but json"}"#),
            )
            .await
            .unwrap_err();

        match err {
            SubmitError::Rejected(e) => {
                assert_eq!(e.code, ExportErrorCode::InvalidFilter);
                assert_eq!(e.message, "remote error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.queue.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn valid_filter_is_stored_parsed() {
        let h = harness();

        let report = h
            .service
            .submit_export(
                ExportObjectType::Orders,
                ColumnSelection::new(["ID"]),
                Some(r#"{"status": ["UNFULFILLED"]}"#),
            )
            .await
            .unwrap();

        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(job.export_type, ExportObjectType::Orders);
        assert_eq!(job.filter, Some(json!({"status": ["UNFULFILLED"]})));
    }

    #[tokio::test]
    async fn stored_filter_keeps_submitted_key_order() {
        let h = harness();
        let raw = r#"{"search":"mug","isPublished":true,"categories":["c2","c1"]}"#;

        let report = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), Some(raw))
            .await
            .unwrap();
        let nulled = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), Some("null"))
            .await
            .unwrap();

        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(serde_json::to_string(&job.filter.unwrap()).unwrap(), raw);
        assert_eq!(h.service.get_job(nulled.id).await.unwrap().filter, None);
        assert_eq!(h.queue.dispatched().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_failure_marks_the_job_failed() {
        let h = harness_with(
            RecordingTaskQueue::failing(TaskQueueError::Closed),
            FilterValidator::parse_only(),
        );

        let err = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap_err();

        let SubmitError::Dispatch { report, .. } = err else {
            panic!("expected a dispatch error");
        };
        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);

        let events = h.events.drain();
        assert_eq!(events.len(), 1);
        match events[0].payload() {
            ExportEvent::ExportFailed(e) => assert_eq!(e.error_type, "TaskQueueError"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(h.outbox.sent(), vec![report.id]);
    }

    #[tokio::test]
    async fn success_callback_finishes_the_job() {
        let h = harness();
        let report = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap();

        h.lifecycle
            .on_success(report.id, TaskOutput::default())
            .await
            .unwrap();

        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.content_artifact.is_none());
        assert_eq!(h.events.drain().len(), 1);
        assert!(h.outbox.is_empty());
    }

    #[tokio::test]
    async fn failure_callback_notifies_once() {
        let h = harness();
        let report = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap();

        h.lifecycle
            .on_failure(report.id, &TaskFailure::new("disk full", "ProcessingError::Storage"))
            .await
            .unwrap();

        let job = h.service.get_job(report.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.content_artifact.is_none());
        assert_eq!(h.events.drain().len(), 1);
        assert_eq!(h.outbox.len(), 1);
    }

    #[tokio::test]
    async fn local_queue_drives_jobs_to_success() {
        let store = InMemoryExportJobStore::arc();
        let bus = Arc::new(InMemoryEventBus::<EventEnvelope<ExportEvent>>::new());
        let events = bus.subscribe();
        let lifecycle = Arc::new(JobLifecycleTransitioner::new(
            store.clone(),
            bus,
            Arc::new(InMemoryNotificationOutbox::new()),
        ));
        let callbacks: Arc<dyn TaskCallbacks> = lifecycle.clone();
        let queue = Arc::new(LocalTaskQueue::new(Arc::new(NullExportProcessor), callbacks));
        let service = ExportService::new(
            store.clone(),
            queue.clone(),
            lifecycle,
            FilterValidator::parse_only(),
        );

        let report = service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap();
        assert_eq!(queue.run_pending().await, 1);

        assert_eq!(
            service.get_job(report.id).await.unwrap().status,
            JobStatus::Success
        );
        assert_eq!(events.drain().len(), 1);
    }

    #[tokio::test]
    async fn get_job_reports_missing_ids() {
        let h = harness();
        let id = ExportJobId::new();

        assert!(matches!(
            h.service.get_job(id).await,
            Err(ServiceError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            h.service.get_export_file(id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn export_file_follows_the_stored_artifact() {
        let h = harness();
        let report = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap();

        assert_eq!(h.service.get_export_file(report.id).await.unwrap(), None);

        h.store
            .attach_artifact(report.id, ContentArtifact::new("exports/products.csv"))
            .await
            .unwrap();
        assert_eq!(
            h.service.get_export_file(report.id).await.unwrap(),
            Some(ContentArtifact::new("exports/products.csv"))
        );
    }

    #[tokio::test]
    async fn rejections_are_told_apart_from_infrastructure_failures() {
        let h = harness();
        let err = h
            .service
            .submit_export(
                ExportObjectType::Products,
                ColumnSelection::new(["ID"]).with_channels(ids(101)),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_rejection());

        let h = harness_with(
            RecordingTaskQueue::failing(TaskQueueError::Closed),
            FilterValidator::parse_only(),
        );
        let err = h
            .service
            .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
            .await
            .unwrap_err();
        assert!(!err.is_rejection());
        assert!(!SubmitError::Store(StoreError::Storage("down".into())).is_rejection());
    }

    #[tokio::test]
    async fn zero_page_size_still_advances_the_cursor() {
        let h = harness();
        let mut created = Vec::new();
        for _ in 0..2 {
            let report = h
                .service
                .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
                .await
                .unwrap();
            created.push(report.id);
        }

        let page = h.service.list_jobs(0, None).await.unwrap();
        assert_eq!(page.jobs.len(), 1);
        assert_eq!(page.end_cursor, Some(created[0]));
        assert!(page.has_next_page);

        let last = h.service.list_jobs(0, page.end_cursor).await.unwrap();
        assert_eq!(last.end_cursor, Some(created[1]));
        assert!(!last.has_next_page);
    }

    #[tokio::test]
    async fn list_jobs_pages_in_creation_order() {
        let h = harness();
        let mut created = Vec::new();
        for _ in 0..5 {
            let report = h
                .service
                .submit_export(ExportObjectType::Products, ColumnSelection::new(["ID"]), None)
                .await
                .unwrap();
            created.push(report.id);
        }

        let first = h.service.list_jobs(2, None).await.unwrap();
        assert_eq!(first.total_count, 5);
        assert!(first.has_next_page);
        assert_eq!(
            first.jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
            created[..2].to_vec()
        );
        assert_eq!(first.end_cursor, Some(created[1]));

        let rest = h.service.list_jobs(10, first.end_cursor).await.unwrap();
        assert!(!rest.has_next_page);
        assert_eq!(
            rest.jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
            created[2..].to_vec()
        );
        assert_eq!(rest.end_cursor, Some(created[4]));
    }
}
