use std::net::SocketAddr;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::application::use_cases::billing::{PlanCatalog, PlanPrice};
use crate::domain::entities::plan_tier::PlanTier;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    /// Stripe API key used for all outbound provider calls.
    pub stripe_secret_key: SecretString,
    /// Shared secret for webhook signature verification. When unset the
    /// webhook endpoint answers 500: that is an operator error, not Stripe's.
    pub stripe_webhook_secret: Option<SecretString>,
    /// Base URL of the identity provider the reconciler denormalizes from.
    pub identity_base_url: Url,
    pub identity_service_token: SecretString,
    /// Upper bound on any single provider/identity HTTP call.
    pub provider_timeout_secs: u64,
    pub catalog: PlanCatalog,
}

fn required(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = SecretString::new(required("JWT_SECRET").into());
        let bind_addr: SocketAddr = default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url = required("DATABASE_URL");
        let cors_origin: HeaderValue = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");

        let stripe_secret_key = SecretString::new(required("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            optional("STRIPE_WEBHOOK_SECRET").map(|s| SecretString::new(s.into()));

        let identity_base_url: Url = required("IDENTITY_BASE_URL")
            .parse()
            .expect("IDENTITY_BASE_URL must be a valid URL");
        let identity_service_token = SecretString::new(required("IDENTITY_SERVICE_TOKEN").into());

        let provider_timeout_secs: u64 = default("PROVIDER_TIMEOUT_SECS", 10);

        let currency = std::env::var("PLAN_CURRENCY").unwrap_or_else(|_| "usd".to_string());
        let catalog = PlanCatalog {
            monthly: plan_price_from_env(PlanTier::Monthly, &currency),
            semiannual: plan_price_from_env(PlanTier::Semiannual, &currency),
            annual: plan_price_from_env(PlanTier::Annual, &currency),
        };

        Self {
            jwt_secret,
            bind_addr,
            database_url,
            cors_origin,
            stripe_secret_key,
            stripe_webhook_secret,
            identity_base_url,
            identity_service_token,
            provider_timeout_secs,
            catalog,
        }
    }
}

/// Price config per tier: `PLAN_MONTHLY_PRICE_ID` (recurring) and
/// `PLAN_MONTHLY_AMOUNT_CENTS` (one-time). A tier with neither configured is
/// not purchasable.
fn plan_price_from_env(tier: PlanTier, currency: &str) -> Option<PlanPrice> {
    let upper = tier.as_ref().to_uppercase();
    let price_id = optional(&format!("PLAN_{upper}_PRICE_ID"));
    let amount_cents: Option<i64> =
        optional(&format!("PLAN_{upper}_AMOUNT_CENTS")).and_then(|v| v.parse().ok());

    match (price_id, amount_cents) {
        (None, None) => None,
        (price_id, amount_cents) => Some(PlanPrice {
            price_id,
            amount_cents: amount_cents.unwrap_or(0),
            currency: currency.to_string(),
        }),
    }
}
