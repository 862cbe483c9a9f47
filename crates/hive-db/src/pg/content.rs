//! PostgreSQL cascade content repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cascade::CascadeStep;
use crate::error::DbResult;
use crate::repo::ContentRepository;

/// PostgreSQL content repository
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Create a new content repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn delete_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(&step.delete_sql())
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            table = step.table(),
            group_id = %group_id,
            rows = result.rows_affected(),
            "Cascade step applied"
        );

        Ok(result.rows_affected())
    }

    async fn count_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(&step.count_sql())
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
