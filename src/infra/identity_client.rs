use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::identity::{IdentityInfo, IdentityProviderPort},
};

/// Identity lookup over the provider's HTTP API, authenticated with a
/// service token.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
    service_token: SecretString,
}

impl HttpIdentityProvider {
    pub fn new(base_url: Url, service_token: SecretString, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            service_token,
        }
    }
}

#[async_trait]
impl IdentityProviderPort for HttpIdentityProvider {
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<IdentityInfo>> {
        let url = self
            .base_url
            .join(&format!("users/{user_id}"))
            .map_err(|e| AppError::Internal(format!("Bad identity URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(self.service_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Identity request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Identity provider error: {}",
                response.status()
            )));
        }

        let info: IdentityInfo = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Bad identity response: {e}")))?;

        Ok(Some(info))
    }
}
