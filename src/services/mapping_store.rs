//! Durable descriptor-id → person mapping backed by SQLite.

use crate::models::enrollment::EnrollmentRecord;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const MIGRATIONS: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum MappingStoreError {
    #[error("an enrollment for face `{0}` already exists")]
    DuplicateFace(String),
    #[error("mapping store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type MappingStoreResult<T> = Result<T, MappingStoreError>;

#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Insert a new record. Never overwrites an existing descriptor id.
    async fn put(&self, record: &EnrollmentRecord) -> MappingStoreResult<()>;

    async fn get(&self, face_id: &str) -> MappingStoreResult<Option<EnrollmentRecord>>;

    /// Every record, oldest first.
    async fn scan_all(&self) -> MappingStoreResult<Vec<EnrollmentRecord>>;

    /// Cheap connectivity probe used by readiness checks.
    async fn ping(&self) -> MappingStoreResult<()>;
}

/// SQLite implementation of [`MappingStore`].
#[derive(Clone)]
pub struct SqliteMappingStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMappingStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Run the embedded schema migration. Statements are idempotent.
    pub async fn run_migrations(&self) -> MappingStoreResult<usize> {
        let statements = MIGRATIONS
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(statements.len())
    }
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn put(&self, record: &EnrollmentRecord) -> MappingStoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO enrollments (face_id, person_name, image_key, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.face_id)
        .bind(&record.person_name)
        .bind(&record.image_key)
        .bind(record.created_at)
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(MappingStoreError::DuplicateFace(record.face_id.clone()))
            }
            Err(err) => Err(MappingStoreError::Sqlx(err)),
        }
    }

    async fn get(&self, face_id: &str) -> MappingStoreResult<Option<EnrollmentRecord>> {
        let record = sqlx::query_as::<_, EnrollmentRecord>(
            "SELECT face_id, person_name, image_key, created_at
             FROM enrollments WHERE face_id = ?",
        )
        .bind(face_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn scan_all(&self) -> MappingStoreResult<Vec<EnrollmentRecord>> {
        let records = sqlx::query_as::<_, EnrollmentRecord>(
            "SELECT face_id, person_name, image_key, created_at
             FROM enrollments ORDER BY created_at ASC, face_id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(records)
    }

    async fn ping(&self) -> MappingStoreResult<()> {
        match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?
        {
            1 => Ok(()),
            other => Err(MappingStoreError::Unavailable(format!(
                "unexpected result: {}",
                other
            ))),
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
