use serde::{Deserialize, Serialize};

use reportflow_core::ExportJobId;
use reportflow_reports::{ColumnSelection, ContentArtifact, JobStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub columns: ColumnSelection,
    #[serde(default)]
    pub filter: Option<ExportFilterInput>,
}

impl ExportRequest {
    pub fn filter_str(&self) -> Option<&str> {
        self.filter.as_ref().and_then(|f| f.filter_str.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilterInput {
    /// Raw JSON text, validated server-side.
    #[serde(default)]
    pub filter_str: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListExportsQuery {
    pub first: Option<usize>,
    pub after: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ExportFileResponse {
    pub id: ExportJobId,
    pub status: JobStatus,
    pub file: Option<ContentArtifact>,
}
