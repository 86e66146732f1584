use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Subscription product level. Determines price and billing period length.
///
/// Tier strings arriving from the payment provider or clients are parsed with
/// [`PlanTier::parse`]; anything unrecognized stays `None` so the caller has
/// to handle the unknown-tier fallback explicitly instead of silently
/// coercing to a real tier.
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
#[sqlx(type_name = "plan_tier", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PlanTier {
    Trial,
    Monthly,
    Semiannual,
    Annual,
}

impl PlanTier {
    /// Parse a tier string from an external boundary. Unknown strings map to
    /// `None` rather than an error so webhook handlers can log-and-fallback.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
