//! Test app state builder for HTTP-level integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{jwt, use_cases::billing::BillingUseCases},
    infra::config::AppConfig,
    test_utils::{
        InMemorySubscriptionRepo, InMemoryUserProfileRepo, InMemoryWebhookEventRepo,
        MockPaymentProvider, StubIdentityProvider, test_catalog,
    },
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let subscriptions = Arc::new(InMemorySubscriptionRepo::default());
/// let app_state = TestAppStateBuilder::new()
///     .with_subscription_repo(subscriptions.clone())
///     .build();
/// ```
pub struct TestAppStateBuilder {
    subscription_repo: Option<Arc<InMemorySubscriptionRepo>>,
    provider: Option<Arc<MockPaymentProvider>>,
    webhook_secret: bool,
    user_email: String,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            subscription_repo: None,
            provider: None,
            webhook_secret: true,
            user_email: "user@example.com".to_string(),
        }
    }

    /// Share a subscription repo with the test for direct assertions.
    pub fn with_subscription_repo(mut self, repo: Arc<InMemorySubscriptionRepo>) -> Self {
        self.subscription_repo = Some(repo);
        self
    }

    /// Swap in a custom payment provider mock.
    pub fn with_provider(mut self, provider: Arc<MockPaymentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Simulate a deployment that never configured the webhook secret.
    pub fn without_webhook_secret(mut self) -> Self {
        self.webhook_secret = false;
        self
    }

    pub fn with_user_email(mut self, email: &str) -> Self {
        self.user_email = email.to_string();
        self
    }

    pub fn build(self) -> AppState {
        let subscription_repo = self
            .subscription_repo
            .unwrap_or_else(|| Arc::new(InMemorySubscriptionRepo::default()));
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(MockPaymentProvider::default()));

        let billing_use_cases = BillingUseCases::new(
            subscription_repo,
            Arc::new(InMemoryUserProfileRepo::default()),
            Arc::new(InMemoryWebhookEventRepo::default()),
            Arc::new(StubIdentityProvider::with_email(&self.user_email)),
            provider,
            test_catalog(),
        );

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new("test_jwt_secret".into()),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            stripe_secret_key: SecretString::new("sk_test_key".into()),
            stripe_webhook_secret: self
                .webhook_secret
                .then(|| SecretString::new(TEST_WEBHOOK_SECRET.into())),
            identity_base_url: Url::parse("http://identity.test/").unwrap(),
            identity_service_token: SecretString::new("svc_token".into()),
            provider_timeout_secs: 5,
            catalog: test_catalog(),
        });

        AppState {
            config,
            billing_use_cases: Arc::new(billing_use_cases),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Bearer header value for a freshly issued test token.
pub fn auth_header(user_id: Uuid, config: &AppConfig) -> String {
    let token = jwt::issue(user_id, &config.jwt_secret, time::Duration::hours(1))
        .expect("test token issuance should not fail");
    format!("Bearer {token}")
}
