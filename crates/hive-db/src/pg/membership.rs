//! PostgreSQL group membership repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::MembershipRow;
use crate::repo::{CreateMembership, MembershipRepository};

/// PostgreSQL group membership repository
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new membership repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn find_by_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        let members = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, group_id, creator_id, is_admin, joined_at
            FROM group_memberships
            WHERE group_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        let memberships = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, group_id, creator_id, is_admin, joined_at
            FROM group_memberships
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn find_group_creators_for_user(&self, user_id: Uuid) -> DbResult<Vec<Uuid>> {
        let creators = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT g.created_by_id
            FROM group_memberships m
            INNER JOIN groups g ON g.id = m.group_id
            WHERE m.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(creators)
    }

    async fn count_by_group(&self, group_id: Uuid) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn create(&self, membership: CreateMembership) -> DbResult<MembershipRow> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO group_memberships (id, user_id, group_id, creator_id, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, group_id, creator_id, is_admin, joined_at
            "#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.group_id)
        .bind(membership.creator_id)
        .bind(membership.is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM group_memberships WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_member(&self, group_id: Uuid, user_id: Uuid) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM group_memberships WHERE group_id = $1 AND user_id = $2")
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
