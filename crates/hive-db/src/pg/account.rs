//! PostgreSQL account repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::AccountRow;
use crate::repo::{AccountRepository, CreateAccount, PreferencesUpdate, SubscriptionUpdate};

const SELECT_ACCOUNT: &str = r#"
    SELECT id, email, name, subscription_tier, subscription_status, current_period_end,
           cancel_at_period_end, active_group_id, subscription_id, customer_id,
           timezone, morning_briefing_time, evening_wrapup_time,
           notify_morning_briefing, notify_evening_wrapup, notify_event_reminders,
           notify_shopping_reminders, notify_task_followups, notify_group_activity,
           notify_weekly_summary, notify_subscription_updates,
           created_at, updated_at
    FROM accounts
"#;

/// PostgreSQL account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> DbResult<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(&format!(
            "{SELECT_ACCOUNT} WHERE subscription_id = $1 LIMIT 1"
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list_all(&self) -> DbResult<Vec<AccountRow>> {
        let accounts =
            sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await?;

        Ok(accounts)
    }

    async fn find_due_for_downgrade(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<AccountRow>> {
        let accounts = sqlx::query_as::<_, AccountRow>(&format!(
            r#"{SELECT_ACCOUNT}
            WHERE cancel_at_period_end = TRUE
              AND current_period_end < $1
              AND subscription_tier <> 'free'
            ORDER BY current_period_end"#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<AccountRow>> {
        let accounts = sqlx::query_as::<_, AccountRow>(&format!(
            r#"{SELECT_ACCOUNT}
            WHERE cancel_at_period_end = TRUE
              AND subscription_status = 'active'
              AND current_period_end >= $1
              AND current_period_end < $2
            ORDER BY current_period_end"#
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, email, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, subscription_tier, subscription_status, current_period_end,
                      cancel_at_period_end, active_group_id, subscription_id, customer_id,
                      timezone, morning_briefing_time, evening_wrapup_time,
                      notify_morning_briefing, notify_evening_wrapup, notify_event_reminders,
                      notify_shopping_reminders, notify_task_followups, notify_group_activity,
                      notify_weekly_summary, notify_subscription_updates,
                      created_at, updated_at
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_subscription(&self, id: Uuid, update: SubscriptionUpdate) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                subscription_tier    = COALESCE($2, subscription_tier),
                subscription_status  = COALESCE($3, subscription_status),
                current_period_end   = COALESCE($4, current_period_end),
                cancel_at_period_end = COALESCE($5, cancel_at_period_end),
                subscription_id      = COALESCE($6, subscription_id),
                customer_id          = COALESCE($7, customer_id),
                updated_at           = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.tier)
        .bind(update.status)
        .bind(update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(update.subscription_id)
        .bind(update.customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn set_active_group(&self, id: Uuid, group_id: Option<Uuid>) -> DbResult<()> {
        sqlx::query("UPDATE accounts SET active_group_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(group_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_preferences(&self, id: Uuid, update: PreferencesUpdate) -> DbResult<()> {
        let n = update.notifications;
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                timezone                    = COALESCE($2, timezone),
                morning_briefing_time       = COALESCE($3, morning_briefing_time),
                evening_wrapup_time         = COALESCE($4, evening_wrapup_time),
                notify_morning_briefing     = $5,
                notify_evening_wrapup       = $6,
                notify_event_reminders      = $7,
                notify_shopping_reminders   = $8,
                notify_task_followups       = $9,
                notify_group_activity       = $10,
                notify_weekly_summary       = $11,
                notify_subscription_updates = $12,
                updated_at                  = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.timezone)
        .bind(update.morning_briefing_time)
        .bind(update.evening_wrapup_time)
        .bind(n.notify_morning_briefing)
        .bind(n.notify_evening_wrapup)
        .bind(n.notify_event_reminders)
        .bind(n.notify_shopping_reminders)
        .bind(n.notify_task_followups)
        .bind(n.notify_group_activity)
        .bind(n.notify_weekly_summary)
        .bind(n.notify_subscription_updates)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
