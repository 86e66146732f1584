use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::billing_period::format_billing_period;
use crate::domain::entities::plan_tier::PlanTier;
use crate::domain::entities::subscription::{Subscription, SubscriptionStatus};

const TRIAL_DAYS: i64 = 30;

/// Read-only view answering "can this user use the product right now, and for
/// how much longer". Derived entirely from the latest subscription row.
#[derive(Debug, Clone, Serialize)]
pub struct AccessStatus {
    pub has_access: bool,
    pub plan_tier: PlanTier,
    pub is_expired: bool,
    pub is_cancelled: bool,
    pub days_remaining: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub billing_period_text: String,
}

impl AccessStatus {
    /// Users with no subscription row get a synthetic 30-day trial.
    pub fn trial_fallback(now: DateTime<Utc>) -> Self {
        let period_end = now + Duration::days(TRIAL_DAYS);
        let rendered = format_billing_period(now, period_end, Some(PlanTier::Trial), now);
        Self {
            has_access: true,
            plan_tier: PlanTier::Trial,
            is_expired: false,
            is_cancelled: false,
            days_remaining: TRIAL_DAYS,
            period_start: now,
            period_end,
            billing_period_text: rendered.text,
        }
    }

    /// Derive access from a subscription row.
    ///
    /// Cancelled is not expired: a cancelled subscription keeps access until
    /// `period_end` passes. Expired access is denied regardless of status,
    /// except that an `Active` row always grants access (the renewal webhook
    /// is the thing that moves `period_end` forward).
    pub fn from_subscription(sub: &Subscription, now: DateTime<Utc>) -> Self {
        let is_expired = sub.period_end <= now;
        let is_cancelled = sub.status == SubscriptionStatus::Cancelled;
        let has_access =
            sub.status == SubscriptionStatus::Active || (is_cancelled && !is_expired);
        let days_remaining = (sub.period_end - now).num_days().max(0);
        let rendered =
            format_billing_period(sub.period_start, sub.period_end, Some(sub.plan_tier), now);

        Self {
            has_access,
            plan_tier: sub.plan_tier,
            is_expired,
            is_cancelled,
            days_remaining,
            period_start: sub.period_start,
            period_end: sub.period_end,
            billing_period_text: rendered.text,
        }
    }
}
