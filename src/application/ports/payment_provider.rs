use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::AppResult;

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSubscriptionId(pub String);

impl ProviderSubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderSubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How far a payment got at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentConfirmation {
    /// Paid immediately (saved payment method, no additional auth).
    Confirmed,
    /// Client must confirm with the returned secret (3DS etc).
    RequiresAction,
    /// Created but not yet resolved; the webhook will settle it.
    Pending,
}

impl PaymentConfirmation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentConfirmation::Confirmed => "confirmed",
            PaymentConfirmation::RequiresAction => "requires_action",
            PaymentConfirmation::Pending => "pending",
        }
    }
}

/// Client-confirmable handle returned by payment initiation.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentHandle {
    pub customer_id: CustomerId,
    /// Present for recurring plans; one-time charges have no subscription.
    pub subscription_id: Option<ProviderSubscriptionId>,
    /// Secret the client uses to finish confirmation, when required.
    pub client_secret: Option<String>,
    pub confirmation: PaymentConfirmation,
    /// Provider-reported billing window, when it already exists.
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

// ============================================================================
// Payment Provider Port
// ============================================================================

/// Abstracts the payment provider behind domain-level actions. The live
/// implementation maps these onto Stripe's REST API; tests use a mock.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    /// Ensure a customer exists for this user, creating one if needed.
    async fn ensure_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId>;

    /// Create a recurring subscription on the given price.
    async fn create_subscription(
        &self,
        customer: &CustomerId,
        price_id: &str,
        payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle>;

    /// Create a one-time charge (non-renewing plans).
    async fn create_one_time_payment(
        &self,
        customer: &CustomerId,
        amount_cents: i64,
        currency: &str,
        payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle>;

    /// Clear the provider-side pending cancellation so the subscription
    /// renews again.
    async fn resume_subscription(
        &self,
        subscription_id: &ProviderSubscriptionId,
    ) -> AppResult<()>;

    /// Update the customer's default payment method.
    async fn set_default_payment_method(
        &self,
        customer: &CustomerId,
        payment_method: &str,
    ) -> AppResult<()>;
}
