//! Export request pipeline.
//!
//! ## Flow
//!
//! ```text
//! submit_export
//!   -> ColumnSelectionValidator   (LIMIT_EXCEEDED, nothing persisted)
//!   -> FilterValidator            (INVALID_FILTER, nothing persisted)
//!   -> ExportJobFactory           (one PENDING job)
//!   -> TaskDispatcher             (exactly one enqueue)
//!
//! task queue callback
//!   -> JobLifecycleTransitioner   (keyed update, event, notification)
//! ```

pub mod dispatcher;
pub mod factory;
pub mod lifecycle;
pub mod service;

pub use dispatcher::TaskDispatcher;
pub use factory::ExportJobFactory;
pub use lifecycle::{EventSink, JobLifecycleTransitioner, LifecycleConfig};
pub use service::{ExportService, JobPage, MAX_PAGE_SIZE, ServiceError, SubmitError};
