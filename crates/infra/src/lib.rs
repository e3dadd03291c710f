//! Infrastructure layer: job storage, task queue, remote filter validation,
//! notifications, config, and the export pipeline that ties them together.

pub mod config;
pub mod export;
pub mod filter_validation;
pub mod notifications;
pub mod store;
pub mod task_queue;

pub use config::{AppConfig, ConfigError};
pub use export::{ExportService, JobLifecycleTransitioner, JobPage, ServiceError, SubmitError};
