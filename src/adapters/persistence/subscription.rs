use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{SubscriptionRepo, SubscriptionWrite},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_tier: row.get("plan_tier"),
        status: row.get("status"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        stripe_customer_id: row.get("stripe_customer_id"),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        billing_period_text: row.get("billing_period_text"),
        billing_period_accurate: row.get("billing_period_accurate"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan_tier, status, stripe_subscription_id, stripe_customer_id,
    period_start, period_end, billing_period_text, billing_period_accurate,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn find_by_provider_subscription(&self, id: &str) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_subscription_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn find_by_provider_customer(&self, id: &str) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_customer_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn create(&self, write: &SubscriptionWrite) -> AppResult<Subscription> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions
                (id, user_id, plan_tier, status, stripe_subscription_id, stripe_customer_id,
                 period_start, period_end, billing_period_text, billing_period_accurate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(write.user_id)
        .bind(write.plan_tier)
        .bind(write.status)
        .bind(&write.stripe_subscription_id)
        .bind(&write.stripe_customer_id)
        .bind(write.period_start)
        .bind(write.period_end)
        .bind(&write.billing_period_text)
        .bind(write.billing_period_accurate)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update(&self, id: Uuid, write: &SubscriptionWrite) -> AppResult<Subscription> {
        // Provider ids survive a null (COALESCE); period bounds and derived
        // fields are overwritten unconditionally in the same statement.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                plan_tier = $2,
                status = $3,
                stripe_subscription_id = COALESCE($4, stripe_subscription_id),
                stripe_customer_id = COALESCE($5, stripe_customer_id),
                period_start = $6,
                period_end = $7,
                billing_period_text = $8,
                billing_period_accurate = $9,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(write.plan_tier)
        .bind(write.status)
        .bind(&write.stripe_subscription_id)
        .bind(&write.stripe_customer_id)
        .bind(write.period_start)
        .bind(write.period_end)
        .bind(&write.billing_period_text)
        .bind(write.billing_period_accurate)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
        require_unexpired: bool,
    ) -> AppResult<Option<Subscription>> {
        // Precondition and write in one statement, so two racing lifecycle
        // calls cannot both pass the check.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                status = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND status = $2
              AND ($4 = false OR period_end > CURRENT_TIMESTAMP)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(expected)
        .bind(new)
        .bind(require_unexpired)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }
}
