use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, middleware::current_user},
    app_error::AppResult,
    domain::entities::{
        plan_tier::PlanTier,
        subscription::{Subscription, SubscriptionStatus},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/checkout", post(post_checkout))
        .route("/cancel", post(post_cancel))
        .route("/reactivate", post(post_reactivate))
}

// ============================================================================
// GET /billing/status
// ============================================================================

async fn get_status(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state.config)?;

    let status = app_state.billing_use_cases.access_status(user_id).await?;

    Ok(Json(status))
}

// ============================================================================
// POST /billing/checkout
// ============================================================================

#[derive(Deserialize)]
struct CheckoutRequest {
    plan_tier: PlanTier,
    #[serde(default = "default_auto_renew")]
    auto_renew: bool,
    payment_method: Option<String>,
}

fn default_auto_renew() -> bool {
    true
}

#[derive(Serialize)]
struct CheckoutResponse {
    confirmation: &'static str,
    client_secret: Option<String>,
    customer_id: String,
    subscription_id: Option<String>,
    /// Present when the provider confirmed payment inline and the local row
    /// was written immediately.
    subscription: Option<SubscriptionSummary>,
}

async fn post_checkout(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state.config)?;

    let outcome = app_state
        .billing_use_cases
        .checkout(
            user_id,
            body.plan_tier,
            body.auto_renew,
            body.payment_method.as_deref(),
        )
        .await?;

    Ok(Json(CheckoutResponse {
        confirmation: outcome.handle.confirmation.as_str(),
        client_secret: outcome.handle.client_secret.clone(),
        customer_id: outcome.handle.customer_id.to_string(),
        subscription_id: outcome.handle.subscription_id.as_ref().map(|s| s.to_string()),
        subscription: outcome.subscription.as_ref().map(SubscriptionSummary::from),
    }))
}

// ============================================================================
// POST /billing/cancel
// ============================================================================

#[derive(Deserialize, Default)]
struct CancelRequest {
    reason: Option<String>,
}

async fn post_cancel(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<CancelRequest>>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state.config)?;
    let Json(body) = body.unwrap_or_default();

    let subscription = app_state
        .billing_use_cases
        .cancel(user_id, body.reason.as_deref())
        .await?;

    Ok(Json(SubscriptionSummary::from(&subscription)))
}

// ============================================================================
// POST /billing/reactivate
// ============================================================================

#[derive(Deserialize)]
struct ReactivateRequest {
    payment_method: String,
}

async fn post_reactivate(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReactivateRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state.config)?;

    let subscription = app_state
        .billing_use_cases
        .reactivate(user_id, &body.payment_method)
        .await?;

    Ok(Json(SubscriptionSummary::from(&subscription)))
}

// ============================================================================
// Shared response shape
// ============================================================================

#[derive(Serialize)]
struct SubscriptionSummary {
    status: SubscriptionStatus,
    plan_tier: PlanTier,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    billing_period_text: String,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(sub: &Subscription) -> Self {
        Self {
            status: sub.status,
            plan_tier: sub.plan_tier,
            period_start: sub.period_start,
            period_end: sub.period_end,
            billing_period_text: sub.billing_period_text.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
