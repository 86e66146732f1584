//! In-memory mock implementations for billing repository traits and ports.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        ports::{
            identity::{IdentityInfo, IdentityProviderPort},
            payment_provider::{
                CustomerId, PaymentConfirmation, PaymentHandle, PaymentProviderPort,
                ProviderSubscriptionId,
            },
        },
        use_cases::billing::{
            PlanCatalog, PlanPrice, SubscriptionRepo, SubscriptionWrite, UserProfileRepo,
            WebhookEventRepo,
        },
    },
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub rows: Mutex<Vec<Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, subscription: Subscription) {
        self.rows.lock().unwrap().push(subscription);
    }

    fn materialize(write: &SubscriptionWrite) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: write.user_id,
            plan_tier: write.plan_tier,
            status: write.status,
            stripe_subscription_id: write.stripe_subscription_id.clone(),
            stripe_customer_id: write.stripe_customer_id.clone(),
            period_start: write.period_start,
            period_end: write.period_end,
            billing_period_text: write.billing_period_text.clone(),
            billing_period_accurate: write.billing_period_accurate,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_by_provider_subscription(&self, id: &str) -> AppResult<Option<Subscription>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.stripe_subscription_id.as_deref() == Some(id))
            .cloned())
    }

    async fn find_by_provider_customer(&self, id: &str) -> AppResult<Option<Subscription>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.stripe_customer_id.as_deref() == Some(id))
            .cloned())
    }

    async fn create(&self, write: &SubscriptionWrite) -> AppResult<Subscription> {
        let sub = Self::materialize(write);
        self.rows.lock().unwrap().push(sub.clone());
        Ok(sub)
    }

    async fn update(&self, id: Uuid, write: &SubscriptionWrite) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|s| s.id == id)
            .expect("update of unknown subscription id");

        row.plan_tier = write.plan_tier;
        row.status = write.status;
        // Same preserve-if-absent semantics as the SQL COALESCE.
        if write.stripe_subscription_id.is_some() {
            row.stripe_subscription_id = write.stripe_subscription_id.clone();
        }
        if write.stripe_customer_id.is_some() {
            row.stripe_customer_id = write.stripe_customer_id.clone();
        }
        row.period_start = write.period_start;
        row.period_end = write.period_end;
        row.billing_period_text = write.billing_period_text.clone();
        row.billing_period_accurate = write.billing_period_accurate;
        row.updated_at = Some(Utc::now());

        Ok(row.clone())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
        require_unexpired: bool,
    ) -> AppResult<Option<Subscription>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        if row.status != expected {
            return Ok(None);
        }
        if require_unexpired && row.period_end <= Utc::now() {
            return Ok(None);
        }

        row.status = new;
        row.updated_at = Some(Utc::now());
        Ok(Some(row.clone()))
    }
}

// ============================================================================
// InMemoryUserProfileRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserProfileRepo {
    pub profiles: Mutex<HashMap<Uuid, (String, serde_json::Value)>>,
}

impl InMemoryUserProfileRepo {
    pub fn email_for(&self, user_id: Uuid) -> Option<String> {
        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|(email, _)| email.clone())
    }
}

#[async_trait]
impl UserProfileRepo for InMemoryUserProfileRepo {
    async fn upsert(
        &self,
        user_id: Uuid,
        email: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<()> {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id, (email.to_string(), metadata.clone()));
        Ok(())
    }
}

// ============================================================================
// InMemoryWebhookEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryWebhookEventRepo {
    pub processed: Mutex<HashSet<String>>,
}

#[async_trait]
impl WebhookEventRepo for InMemoryWebhookEventRepo {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        Ok(self.processed.lock().unwrap().contains(event_id))
    }

    async fn mark_processed(&self, event_id: &str, _event_type: &str) -> AppResult<()> {
        self.processed.lock().unwrap().insert(event_id.to_string());
        Ok(())
    }
}

// ============================================================================
// MockPaymentProvider
// ============================================================================

/// Mock payment provider recording every call. Defaults to handing back
/// pending payments; `confirming()` simulates a saved payment method that
/// settles inline.
pub struct MockPaymentProvider {
    confirmation: PaymentConfirmation,
    resumed: Mutex<Vec<ProviderSubscriptionId>>,
    default_payment_methods: Mutex<Vec<(CustomerId, String)>>,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self {
            confirmation: PaymentConfirmation::Pending,
            resumed: Mutex::new(vec![]),
            default_payment_methods: Mutex::new(vec![]),
        }
    }
}

impl MockPaymentProvider {
    pub fn confirming() -> Self {
        Self {
            confirmation: PaymentConfirmation::Confirmed,
            ..Self::default()
        }
    }

    pub fn resumed(&self) -> Vec<ProviderSubscriptionId> {
        self.resumed.lock().unwrap().clone()
    }

    pub fn default_payment_methods(&self) -> Vec<(CustomerId, String)> {
        self.default_payment_methods.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProviderPort for MockPaymentProvider {
    async fn ensure_customer(&self, _email: &str, _user_id: Uuid) -> AppResult<CustomerId> {
        Ok(CustomerId::new("cus_mock"))
    }

    async fn create_subscription(
        &self,
        customer: &CustomerId,
        _price_id: &str,
        _payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle> {
        Ok(PaymentHandle {
            customer_id: customer.clone(),
            subscription_id: Some(ProviderSubscriptionId::new("sub_mock")),
            client_secret: Some("pi_mock_secret".to_string()),
            confirmation: self.confirmation,
            period_start: None,
            period_end: None,
        })
    }

    async fn create_one_time_payment(
        &self,
        customer: &CustomerId,
        _amount_cents: i64,
        _currency: &str,
        _payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle> {
        Ok(PaymentHandle {
            customer_id: customer.clone(),
            subscription_id: None,
            client_secret: Some("pi_mock_secret".to_string()),
            confirmation: self.confirmation,
            period_start: None,
            period_end: None,
        })
    }

    async fn resume_subscription(
        &self,
        subscription_id: &ProviderSubscriptionId,
    ) -> AppResult<()> {
        self.resumed.lock().unwrap().push(subscription_id.clone());
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer: &CustomerId,
        payment_method: &str,
    ) -> AppResult<()> {
        self.default_payment_methods
            .lock()
            .unwrap()
            .push((customer.clone(), payment_method.to_string()));
        Ok(())
    }
}

// ============================================================================
// StubIdentityProvider
// ============================================================================

/// Identity stub resolving every user to a fixed email.
pub struct StubIdentityProvider {
    email: Option<String>,
}

impl StubIdentityProvider {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
        }
    }

    /// A provider that knows no users.
    pub fn empty() -> Self {
        Self { email: None }
    }
}

#[async_trait]
impl IdentityProviderPort for StubIdentityProvider {
    async fn get_user(&self, _user_id: Uuid) -> AppResult<Option<IdentityInfo>> {
        Ok(self.email.as_ref().map(|email| IdentityInfo {
            email: email.clone(),
            metadata: serde_json::json!({}),
        }))
    }
}

// ============================================================================
// Catalog helper
// ============================================================================

pub fn test_catalog() -> PlanCatalog {
    PlanCatalog {
        monthly: Some(PlanPrice {
            price_id: Some("price_monthly".to_string()),
            amount_cents: 999,
            currency: "usd".to_string(),
        }),
        semiannual: Some(PlanPrice {
            price_id: Some("price_semiannual".to_string()),
            amount_cents: 4999,
            currency: "usd".to_string(),
        }),
        annual: Some(PlanPrice {
            price_id: Some("price_annual".to_string()),
            amount_cents: 8999,
            currency: "usd".to_string(),
        }),
    }
}
