//! PostgreSQL access code repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::AccessCodeRow;
use crate::repo::{AccessCodeRepository, CreateAccessCode};

/// PostgreSQL access code repository
#[derive(Clone)]
pub struct PgAccessCodeRepository {
    pool: PgPool,
}

impl PgAccessCodeRepository {
    /// Create a new access code repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessCodeRepository for PgAccessCodeRepository {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<AccessCodeRow>> {
        let row = sqlx::query_as::<_, AccessCodeRow>(
            r#"
            SELECT id, code, group_id, created_by_id, uses_remaining, expires_at, created_at
            FROM access_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, code: CreateAccessCode) -> DbResult<AccessCodeRow> {
        let row = sqlx::query_as::<_, AccessCodeRow>(
            r#"
            INSERT INTO access_codes (id, code, group_id, created_by_id, uses_remaining, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, code, group_id, created_by_id, uses_remaining, expires_at, created_at
            "#,
        )
        .bind(code.id)
        .bind(&code.code)
        .bind(code.group_id)
        .bind(code.created_by_id)
        .bind(code.uses_remaining)
        .bind(code.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn consume_use(&self, id: Uuid, now: DateTime<Utc>) -> DbResult<bool> {
        // Single statement so concurrent redemptions cannot push the count below zero
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET uses_remaining = CASE
                    WHEN uses_remaining IS NULL THEN NULL
                    ELSE uses_remaining - 1
                END
            WHERE id = $1
              AND (uses_remaining IS NULL OR uses_remaining > 0)
              AND (expires_at IS NULL OR expires_at > $2)
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
