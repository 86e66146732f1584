//! Billing period arithmetic and display formatting.
//!
//! These are the pure pieces of the reconciliation engine: given a plan tier
//! and a period start, compute where the period ends, and render the period
//! for display. Everything here is deterministic; callers pass `now` in.
//!
//! Calendar arithmetic follows chrono's `Months` convention: the day of month
//! is clamped to the last valid day of the target month, so Jan 31 + 1 month
//! is Feb 28 (or Feb 29 in a leap year). The two-day accuracy tolerance below
//! absorbs that clamping.

use chrono::{DateTime, Duration, Months, Utc};

use crate::domain::entities::plan_tier::PlanTier;

/// Fallback period for trials and unrecognized tiers.
const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Allowed drift, in days, between a stored period and the tier's expected
/// period before the row is flagged inaccurate. Calendar months vary by up to
/// two days around the 30-day mean.
const ACCURACY_TOLERANCE_DAYS: i64 = 2;

/// Compute the end of a billing period starting at `start`.
///
/// `None` means the tier string from the boundary did not parse; such periods
/// get the safe 30-day default rather than an error.
pub fn period_end(tier: Option<PlanTier>, start: DateTime<Utc>) -> DateTime<Utc> {
    match tier {
        Some(PlanTier::Monthly) => add_months(start, 1),
        Some(PlanTier::Semiannual) => add_months(start, 6),
        Some(PlanTier::Annual) => add_months(start, 12),
        Some(PlanTier::Trial) | None => start + Duration::days(DEFAULT_PERIOD_DAYS),
    }
}

fn add_months(start: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    // checked_add_months only fails out past year 262143; fall back to the
    // 30-day default rather than panic.
    start
        .checked_add_months(Months::new(months))
        .unwrap_or_else(|| start + Duration::days(DEFAULT_PERIOD_DAYS))
}

/// Rendered billing period plus the accuracy flag stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPeriodText {
    pub text: String,
    pub accurate: bool,
}

/// Render a billing period as `"Mon DD, YYYY – Mon DD, YYYY (phrase)"`,
/// prefixed with `"Expired: "` once the period has lapsed.
///
/// `accurate` is true when the actual period length is within
/// [`ACCURACY_TOLERANCE_DAYS`] of what [`period_end`] would produce for the
/// same tier and start.
pub fn format_billing_period(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tier: Option<PlanTier>,
    now: DateTime<Utc>,
) -> BillingPeriodText {
    let actual_days = (end - start).num_days();
    let expected_days = (period_end(tier, start) - start).num_days();

    let phrase = match tier {
        Some(PlanTier::Trial) => format!("{} day trial", actual_days),
        Some(PlanTier::Monthly) => "1 month".to_string(),
        Some(PlanTier::Semiannual) => "6 months".to_string(),
        Some(PlanTier::Annual) => "1 year".to_string(),
        None => format!("{} days", actual_days),
    };

    let prefix = if end <= now { "Expired: " } else { "" };

    BillingPeriodText {
        text: format!(
            "{}{} – {} ({})",
            prefix,
            start.format("%b %d, %Y"),
            end.format("%b %d, %Y"),
            phrase
        ),
        accurate: (actual_days - expected_days).abs() <= ACCURACY_TOLERANCE_DAYS,
    }
}
