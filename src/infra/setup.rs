use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::{
        ports::{identity::IdentityProviderPort, payment_provider::PaymentProviderPort},
        use_cases::billing::{BillingUseCases, SubscriptionRepo, UserProfileRepo, WebhookEventRepo},
    },
    infra::{
        config::AppConfig, db::init_db, identity_client::HttpIdentityProvider,
        stripe_client::StripeClient, stripe_payment_adapter::StripePaymentAdapter,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let stripe_client = StripeClient::new(
        config.stripe_secret_key.clone(),
        config.provider_timeout_secs,
    );
    let provider =
        Arc::new(StripePaymentAdapter::new(stripe_client)) as Arc<dyn PaymentProviderPort>;

    let identity = Arc::new(HttpIdentityProvider::new(
        config.identity_base_url.clone(),
        config.identity_service_token.clone(),
        config.provider_timeout_secs,
    )) as Arc<dyn IdentityProviderPort>;

    let billing_use_cases = BillingUseCases::new(
        postgres_arc.clone() as Arc<dyn SubscriptionRepo>,
        postgres_arc.clone() as Arc<dyn UserProfileRepo>,
        postgres_arc.clone() as Arc<dyn WebhookEventRepo>,
        identity,
        provider,
        config.catalog.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billsync_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
