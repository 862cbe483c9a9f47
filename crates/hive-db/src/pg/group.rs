//! PostgreSQL group repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::GroupRow;
use crate::repo::{CreateGroup, GroupRepository};

/// PostgreSQL group repository
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    /// Create a new group repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>> {
        let group = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, created_by_id, group_type, max_members, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_by_creator(&self, creator_id: Uuid) -> DbResult<Vec<GroupRow>> {
        let groups = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, created_by_id, group_type, max_members, created_at
            FROM groups
            WHERE created_by_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn create(&self, group: CreateGroup) -> DbResult<GroupRow> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO groups (id, name, created_by_id, group_type, max_members)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, created_by_id, group_type, max_members, created_at
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.created_by_id)
        .bind(&group.group_type)
        .bind(group.max_members)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
