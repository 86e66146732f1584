use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::UserProfileRepo,
};

#[async_trait]
impl UserProfileRepo for PostgresPersistence {
    async fn upsert(
        &self,
        user_id: Uuid,
        email: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, email, metadata)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                email = EXCLUDED.email,
                metadata = EXCLUDED.metadata,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
