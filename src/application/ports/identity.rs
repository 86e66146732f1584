use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Identity-provider view of a user, denormalized into `user_profiles` by the
/// reconciler.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityInfo {
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Lookup port for the external identity provider.
#[async_trait]
pub trait IdentityProviderPort: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<IdentityInfo>>;
}
