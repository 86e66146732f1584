//! Test data factories.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    billing_period::format_billing_period,
    entities::{
        plan_tier::PlanTier,
        subscription::{Subscription, SubscriptionStatus},
    },
};

/// Build a valid active monthly subscription, then let the test override
/// whatever it cares about.
pub fn create_test_subscription(overrides: impl FnOnce(&mut Subscription)) -> Subscription {
    let now = Utc::now();
    let period_start = now - Duration::days(1);
    let period_end = period_start + Duration::days(31);
    let rendered = format_billing_period(period_start, period_end, Some(PlanTier::Monthly), now);

    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        plan_tier: PlanTier::Monthly,
        status: SubscriptionStatus::Active,
        stripe_subscription_id: Some("sub_test".to_string()),
        stripe_customer_id: Some("cus_test".to_string()),
        period_start,
        period_end,
        billing_period_text: rendered.text,
        billing_period_accurate: rendered.accurate,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut subscription);
    subscription
}
