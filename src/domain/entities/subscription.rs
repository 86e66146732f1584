use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::plan_tier::PlanTier;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    PastDue,
}

impl SubscriptionStatus {
    /// Map a Stripe subscription status string to our status, factoring in the
    /// auto-renew flag: a provider-active subscription that will not renew is
    /// already cancelled from the user's point of view (access runs to period
    /// end either way).
    pub fn from_provider(status: &str, cancel_at_period_end: bool) -> Self {
        match status {
            "canceled" | "unpaid" | "incomplete_expired" => SubscriptionStatus::Cancelled,
            "past_due" | "incomplete" => SubscriptionStatus::PastDue,
            _ if cancel_at_period_end => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// One subscription row. The latest row per user (by `created_at`) is the
/// authoritative one; older rows are history.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Derived display string, recomputed on every write.
    pub billing_period_text: String,
    /// Whether (start, end) matches the tier's expected length within tolerance.
    pub billing_period_accurate: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
