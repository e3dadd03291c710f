//! Export reports domain module.
//!
//! Business rules for export jobs: the job record and its status machine,
//! column-selection limits, filter parsing and the caller-facing error
//! taxonomy. Pure logic only (no IO, no HTTP, no storage).

pub mod columns;
pub mod error;
pub mod events;
pub mod filter;
pub mod job;

pub use columns::{ColumnSelection, ColumnSelectionValidator, DEFAULT_COLUMN_LIMIT};
pub use error::{ExportError, ExportErrorCode};
pub use events::{ExportEvent, ExportFailed, ExportSucceeded};
pub use filter::parse_filter;
pub use job::{ContentArtifact, ExportJob, ExportObjectType, JobStatus, Report};
