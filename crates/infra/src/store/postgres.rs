//! Postgres-backed export job store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` (on insert) |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed | N/A | `Storage` |
//! | Other | N/A | `Storage` |
//!
//! `filter` is a `JSON` (not `JSONB`) column written from text, so the
//! submitted key order is kept.
//!
//! Terminal updates run in a transaction that locks the row (`FOR UPDATE`),
//! checks that it is still `PENDING`, and writes the new status. Concurrent
//! callbacks for the same job serialize on the row lock; the loser sees the
//! terminal status and gets `AlreadyTerminal`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use reportflow_core::ExportJobId;
use reportflow_reports::{ColumnSelection, ContentArtifact, ExportJob, JobStatus};

use super::{ExportJobStore, StatusChange, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS export_jobs (
    id UUID PRIMARY KEY,
    export_type TEXT NOT NULL,
    columns JSONB NOT NULL,
    filter JSON NULL,
    status TEXT NOT NULL,
    content_artifact TEXT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

const SELECT_COLUMNS: &str =
    "id, export_type, columns, filter, status, content_artifact, created_at, updated_at";

/// Postgres-backed job store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; every method is a
/// single statement or a single transaction.
#[derive(Debug, Clone)]
pub struct PostgresExportJobStore {
    pool: Arc<PgPool>,
}

impl PostgresExportJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the `export_jobs` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        id: ExportJobId,
    ) -> Result<ExportJob, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM export_jobs WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_row", e))?
        .ok_or(StoreError::NotFound(id))?;

        decode(&row)
    }
}

#[async_trait]
impl ExportJobStore for PostgresExportJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id), err)]
    async fn create(&self, job: ExportJob) -> Result<ExportJob, StoreError> {
        let columns = serde_json::to_value(&job.columns)
            .map_err(|e| StoreError::Storage(format!("encode columns: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO export_jobs
                (id, export_type, columns, filter, status, content_artifact, created_at, updated_at)
            VALUES ($1, $2, $3, $4::json, $5, $6, $7, $8)
            "#,
        )
        .bind(*job.id.as_uuid())
        .bind(job.export_type.as_str())
        .bind(columns)
        .bind(job.filter.as_ref().map(|f| f.to_string()))
        .bind(job.status.as_str())
        .bind(job.content_artifact.as_ref().map(|a| a.as_str().to_string()))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(job.id)
            } else {
                map_sqlx_error("create", e)
            }
        })?;

        Ok(job)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: ExportJobId) -> Result<Option<ExportJob>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM export_jobs WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, content_artifact), err)]
    async fn update_status(
        &self,
        id: ExportJobId,
        status: JobStatus,
        content_artifact: Option<ContentArtifact>,
    ) -> Result<StatusChange, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "{status} is not a terminal status"
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_status.begin", e))?;

        let previous = Self::lock_row(&mut tx, id).await?;
        if previous.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id,
                status: previous.status,
            });
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE export_jobs
            SET status = $2, content_artifact = $3, updated_at = $4
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(*id.as_uuid())
        .bind(status.as_str())
        .bind(content_artifact.map(|a| a.as_str().to_string()))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_status", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_status.commit", e))?;

        Ok(StatusChange {
            previous,
            current: decode(&row)?,
        })
    }

    #[instrument(skip(self, artifact), err)]
    async fn attach_artifact(
        &self,
        id: ExportJobId,
        artifact: ContentArtifact,
    ) -> Result<ExportJob, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("attach_artifact.begin", e))?;

        let current = Self::lock_row(&mut tx, id).await?;
        if current.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id,
                status: current.status,
            });
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE export_jobs
            SET content_artifact = $2, updated_at = $3
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(*id.as_uuid())
        .bind(artifact.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_artifact", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("attach_artifact.commit", e))?;

        decode(&row)
    }

    #[instrument(skip(self), err)]
    async fn list(
        &self,
        first: usize,
        after: Option<ExportJobId>,
    ) -> Result<Vec<ExportJob>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM export_jobs
            WHERE ($1::uuid IS NULL OR id > $1)
            ORDER BY id ASC
            LIMIT $2
            "#
        ))
        .bind(after.map(|id| *id.as_uuid()))
        .bind(i64::try_from(first).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM export_jobs")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count", e))?;
        Ok(total.max(0) as usize)
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Storage(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

fn decode(row: &sqlx::postgres::PgRow) -> Result<ExportJob, StoreError> {
    ExportJob::try_from(ExportJobRow::from_pg_row(row)?)
}

#[derive(Debug)]
struct ExportJobRow {
    id: uuid::Uuid,
    export_type: String,
    columns: serde_json::Value,
    filter: Option<serde_json::Value>,
    status: String,
    content_artifact: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExportJobRow {
    fn from_pg_row(row: &sqlx::postgres::PgRow) -> Result<Self, StoreError> {
        let get = |e: sqlx::Error| map_sqlx_error("decode_row", e);
        Ok(ExportJobRow {
            id: row.try_get("id").map_err(get)?,
            export_type: row.try_get("export_type").map_err(get)?,
            columns: row.try_get("columns").map_err(get)?,
            filter: row.try_get("filter").map_err(get)?,
            status: row.try_get("status").map_err(get)?,
            content_artifact: row.try_get("content_artifact").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }
}

impl TryFrom<ExportJobRow> for ExportJob {
    type Error = StoreError;

    fn try_from(row: ExportJobRow) -> Result<Self, Self::Error> {
        let columns: ColumnSelection = serde_json::from_value(row.columns)
            .map_err(|e| StoreError::Storage(format!("decode columns: {e}")))?;

        Ok(ExportJob {
            id: ExportJobId::from_uuid(row.id),
            export_type: row
                .export_type
                .parse()
                .map_err(|e| StoreError::Storage(format!("decode export_type: {e}")))?,
            columns,
            filter: row.filter,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Storage(format!("decode status: {e}")))?,
            content_artifact: row.content_artifact.map(ContentArtifact::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
