//! Payment provider webhook handler. Every event that changes subscription
//! state funnels into the reconciler, so redelivered events are harmless.

use axum::{
    Json, Router, extract::State, http::HeaderMap, response::IntoResponse, routing::post,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::use_cases::billing::ReconcileInput,
    domain::entities::{plan_tier::PlanTier, subscription::SubscriptionStatus},
    infra::stripe_client::StripeClient,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

#[derive(Serialize)]
struct WebhookResponse {
    received: bool,
    processed: bool,
    event_type: String,
    timestamp: DateTime<Utc>,
}

async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let webhook_secret = app_state
        .config
        .stripe_webhook_secret
        .as_ref()
        .ok_or(AppError::ProviderNotConfigured)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Validation("Missing Stripe signature".into()))?;

    StripeClient::verify_webhook_signature(&body, signature, webhook_secret.expose_secret())?;

    let event: Value = serde_json::from_str(&body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;

    let event_type = event["type"].as_str().unwrap_or("").to_string();
    let event_id = event["id"].as_str().unwrap_or("");

    // Redelivery of an already-handled event is acknowledged without work.
    if app_state
        .billing_use_cases
        .is_event_processed(event_id)
        .await?
    {
        tracing::debug!(event_id, event_type, "Duplicate webhook event, skipping");
        return Ok(Json(WebhookResponse {
            received: true,
            processed: false,
            event_type,
            timestamp: Utc::now(),
        }));
    }

    let object = &event["data"]["object"];
    let processed = handle_event(&app_state, &event_type, object).await?;

    if processed && !event_id.is_empty() {
        app_state
            .billing_use_cases
            .mark_event_processed(event_id, &event_type)
            .await?;
    }

    Ok(Json(WebhookResponse {
        received: true,
        processed,
        event_type,
        timestamp: Utc::now(),
    }))
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Returns whether the event mutated local state. Unknown types and events we
/// cannot attribute to a user are acknowledged but not marked processed.
async fn handle_event(app_state: &AppState, event_type: &str, object: &Value) -> AppResult<bool> {
    match event_type {
        "checkout.session.completed" | "payment_intent.succeeded" => {
            handle_payment_completed(app_state, object).await
        }
        "invoice.payment_succeeded" => handle_invoice_payment_succeeded(app_state, object).await,
        "invoice.payment_failed" => handle_invoice_payment_failed(app_state, object).await,
        "customer.subscription.updated" => handle_subscription_updated(app_state, object).await,
        "customer.subscription.deleted" => handle_subscription_deleted(app_state, object).await,
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            Ok(false)
        }
    }
}

/// Initial purchase confirmation: the object carries our metadata, so the
/// user and tier come straight from the event.
async fn handle_payment_completed(app_state: &AppState, object: &Value) -> AppResult<bool> {
    let Some((user_id, plan_tier)) = metadata_identity(object) else {
        tracing::warn!("Payment event without usable user_id/plan_tier metadata, skipping");
        return Ok(false);
    };

    app_state
        .billing_use_cases
        .reconcile(&ReconcileInput {
            user_id,
            plan_tier,
            status: SubscriptionStatus::Active,
            stripe_subscription_id: str_field(object, "subscription"),
            stripe_customer_id: str_field(object, "customer"),
            period_start: None,
            period_end: None,
        })
        .await?;

    Ok(true)
}

/// Renewal: the invoice references provider ids, not our metadata, so the
/// owning row is looked up first.
async fn handle_invoice_payment_succeeded(app_state: &AppState, object: &Value) -> AppResult<bool> {
    // The subscription ref arrives as a bare id or an expanded object.
    let sub_id = str_field(object, "subscription")
        .or_else(|| object["subscription"]["id"].as_str().map(String::from));
    let cus_id = str_field(object, "customer");

    let Some(existing) = app_state
        .billing_use_cases
        .find_by_provider_refs(sub_id.as_deref(), cus_id.as_deref())
        .await?
    else {
        tracing::warn!(
            subscription_id = ?sub_id,
            customer_id = ?cus_id,
            "Invoice for unknown subscription, skipping"
        );
        return Ok(false);
    };

    // A settled invoice only means active while the subscription itself is
    // in good standing; an expanded subscription reporting anything else
    // (another invoice still owed, collection paused) lands past due. A bare
    // id carries no contrary signal.
    let provider_status = object["subscription"]["status"].as_str().unwrap_or("active");
    let status = if provider_status == "active" {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::PastDue
    };

    app_state
        .billing_use_cases
        .reconcile(&ReconcileInput {
            user_id: existing.user_id,
            plan_tier: existing.plan_tier,
            status,
            stripe_subscription_id: sub_id,
            stripe_customer_id: cus_id,
            period_start: timestamp_field(object, "period_start"),
            period_end: timestamp_field(object, "period_end"),
        })
        .await?;

    Ok(true)
}

/// Failed renewal: mark past due but keep the current window, so remaining
/// paid-for access is not cut short.
async fn handle_invoice_payment_failed(app_state: &AppState, object: &Value) -> AppResult<bool> {
    let sub_id = str_field(object, "subscription");
    let cus_id = str_field(object, "customer");

    let Some(existing) = app_state
        .billing_use_cases
        .find_by_provider_refs(sub_id.as_deref(), cus_id.as_deref())
        .await?
    else {
        tracing::warn!(
            subscription_id = ?sub_id,
            customer_id = ?cus_id,
            "Failed invoice for unknown subscription, skipping"
        );
        return Ok(false);
    };

    app_state
        .billing_use_cases
        .reconcile(&ReconcileInput {
            user_id: existing.user_id,
            plan_tier: existing.plan_tier,
            status: SubscriptionStatus::PastDue,
            stripe_subscription_id: sub_id,
            stripe_customer_id: cus_id,
            period_start: Some(existing.period_start),
            period_end: Some(existing.period_end),
        })
        .await?;

    Ok(true)
}

async fn handle_subscription_updated(app_state: &AppState, object: &Value) -> AppResult<bool> {
    let sub_id = str_field(object, "id");
    let cus_id = str_field(object, "customer");

    let existing = app_state
        .billing_use_cases
        .find_by_provider_refs(sub_id.as_deref(), cus_id.as_deref())
        .await?;

    let (user_id, plan_tier) = match (&existing, metadata_identity(object)) {
        (Some(row), _) => (row.user_id, row.plan_tier),
        (None, Some(identity)) => identity,
        (None, None) => {
            tracing::warn!(
                subscription_id = ?sub_id,
                "Subscription update for unknown subscription, skipping"
            );
            return Ok(false);
        }
    };

    let provider_status = object["status"].as_str().unwrap_or("active");
    let cancel_at_period_end = object["cancel_at_period_end"].as_bool().unwrap_or(false);

    app_state
        .billing_use_cases
        .reconcile(&ReconcileInput {
            user_id,
            plan_tier,
            status: SubscriptionStatus::from_provider(provider_status, cancel_at_period_end),
            stripe_subscription_id: sub_id,
            stripe_customer_id: cus_id,
            period_start: timestamp_field(object, "current_period_start"),
            period_end: timestamp_field(object, "current_period_end"),
        })
        .await?;

    Ok(true)
}

/// Terminal cancellation. Access runs out at period end, the deletion does
/// not shorten it: the provider-reported window wins (it may reflect a
/// renewal this service never saw), with the stored row as fallback.
async fn handle_subscription_deleted(app_state: &AppState, object: &Value) -> AppResult<bool> {
    let sub_id = str_field(object, "id");
    let cus_id = str_field(object, "customer");

    let Some(existing) = app_state
        .billing_use_cases
        .find_by_provider_refs(sub_id.as_deref(), cus_id.as_deref())
        .await?
    else {
        tracing::warn!(
            subscription_id = ?sub_id,
            "Deletion of unknown subscription, skipping"
        );
        return Ok(false);
    };

    app_state
        .billing_use_cases
        .reconcile(&ReconcileInput {
            user_id: existing.user_id,
            plan_tier: existing.plan_tier,
            status: SubscriptionStatus::Cancelled,
            stripe_subscription_id: sub_id,
            stripe_customer_id: cus_id,
            period_start: timestamp_field(object, "current_period_start")
                .or(Some(existing.period_start)),
            period_end: timestamp_field(object, "current_period_end")
                .or(Some(existing.period_end)),
        })
        .await?;

    Ok(true)
}

// ============================================================================
// Field Helpers
// ============================================================================

fn str_field(object: &Value, key: &str) -> Option<String> {
    object[key].as_str().map(|s| s.to_string())
}

fn timestamp_field(object: &Value, key: &str) -> Option<DateTime<Utc>> {
    object[key]
        .as_i64()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn metadata_identity(object: &Value) -> Option<(Uuid, PlanTier)> {
    let metadata = &object["metadata"];
    let user_id = metadata["user_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let plan_tier = metadata["plan_tier"].as_str().and_then(PlanTier::parse)?;
    Some((user_id, plan_tier))
}

// ============================================================================
// Tests
// ============================================================================
