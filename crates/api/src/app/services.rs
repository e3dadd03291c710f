//! Infrastructure wiring for the HTTP API.

use std::sync::{Arc, Mutex};

use anyhow::Context;

use reportflow_events::{EventEnvelope, InMemoryEventBus};
use reportflow_infra::AppConfig;
use reportflow_infra::export::{ExportService, JobLifecycleTransitioner, LifecycleConfig};
use reportflow_infra::filter_validation::{FilterValidator, GraphqlFilterValidator};
use reportflow_infra::notifications::TracingNotificationSender;
use reportflow_infra::store::{ExportJobStore, InMemoryExportJobStore, PostgresExportJobStore};
use reportflow_infra::task_queue::{
    LocalTaskQueue, NullExportProcessor, TaskCallbacks, WorkerConfig, WorkerHandle, WorkerStats,
};
use reportflow_reports::ExportEvent;

pub type ExportEventBus = InMemoryEventBus<EventEnvelope<ExportEvent>>;

/// Everything the handlers need.
pub struct AppServices {
    pub exports: ExportService,
    pub events: Arc<ExportEventBus>,
    queue: Arc<LocalTaskQueue>,
    workers: Mutex<Option<WorkerHandle>>,
}

impl AppServices {
    pub fn worker_stats(&self) -> WorkerStats {
        self.queue.stats()
    }

    /// Stop the export workers, letting in-flight jobs finish.
    pub async fn shutdown(&self) {
        let handle = self.workers.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<Arc<AppServices>> {
    let store: Arc<dyn ExportJobStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresExportJobStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            tracing::info!("using postgres export job store");
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory export job store");
            InMemoryExportJobStore::arc()
        }
    };

    let filters = match &config.filter_validation {
        Some(remote) => {
            let validator =
                GraphqlFilterValidator::new(remote.url.clone(), remote.token.clone(), remote.timeout)
                    .context("failed to build remote filter validator")?;
            tracing::info!(endpoint = %remote.url, "remote filter validation enabled");
            FilterValidator::with_remote(Arc::new(validator))
        }
        None => FilterValidator::parse_only(),
    };

    let events = Arc::new(ExportEventBus::new());
    let lifecycle = Arc::new(
        JobLifecycleTransitioner::new(
            Arc::clone(&store),
            events.clone(),
            Arc::new(TracingNotificationSender),
        )
        .with_config(LifecycleConfig {
            keep_artifact_on_success: config.keep_artifact_on_success,
        }),
    );

    let callbacks: Arc<dyn TaskCallbacks> = lifecycle.clone();
    let queue = Arc::new(LocalTaskQueue::new(Arc::new(NullExportProcessor), callbacks));
    let workers = queue.spawn(WorkerConfig::default());

    let exports = ExportService::new(store, queue.clone(), lifecycle, filters)
        .with_column_limit(config.column_limit);

    Ok(Arc::new(AppServices {
        exports,
        events,
        queue,
        workers: Mutex::new(Some(workers)),
    }))
}
