//! Period-state oracle over the semester books.
//!
//! The posting core never calls this itself; the gate consults it before any
//! write is allowed through.

use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{PartyKind, SemesterBook};

#[derive(Debug, Clone, Default)]
pub struct SemesterBookService;

impl SemesterBookService {
    pub fn new() -> Self {
        Self
    }

    /// Look up a period by code.
    #[instrument(skip(self, conn))]
    pub async fn find(
        &self,
        conn: &mut PgConnection,
        period_code: &str,
    ) -> Result<Option<SemesterBook>, AppError> {
        sqlx::query_as::<_, SemesterBook>(
            r#"
            SELECT period_code, is_active, is_closed, created_utc
            FROM semester_books
            WHERE period_code = $1
            "#,
        )
        .bind(period_code)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load period: {}", e)))
    }

    /// Whether the period is globally closed. Unknown periods report closed.
    pub async fn is_period_closed(
        &self,
        conn: &mut PgConnection,
        period_code: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .find(conn, period_code)
            .await?
            .map(|book| book.is_closed)
            .unwrap_or(true))
    }

    /// Whether the period exists in the set of open book periods.
    pub async fn is_period_active(
        &self,
        conn: &mut PgConnection,
        period_code: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .find(conn, period_code)
            .await?
            .map(|book| book.is_active)
            .unwrap_or(false))
    }

    /// Whether a specific customer or supplier is locked within the period.
    #[instrument(skip(self, conn), fields(party = %party_kind, party_id = %party_id))]
    pub async fn is_party_locked(
        &self,
        conn: &mut PgConnection,
        period_code: &str,
        party_kind: PartyKind,
        party_id: Uuid,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM semester_party_locks
                WHERE period_code = $1 AND party_kind = $2 AND party_id = $3
            )
            "#,
        )
        .bind(period_code)
        .bind(party_kind.as_str())
        .bind(party_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check party lock: {}", e)))
    }
}
