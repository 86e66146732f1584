use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        identity::IdentityProviderPort,
        payment_provider::{
            CustomerId, PaymentConfirmation, PaymentHandle, PaymentProviderPort,
            ProviderSubscriptionId,
        },
    },
    domain::billing_period::{format_billing_period, period_end},
    domain::entities::{
        access_status::AccessStatus,
        plan_tier::PlanTier,
        subscription::{Subscription, SubscriptionStatus},
    },
};

// ============================================================================
// Input Types
// ============================================================================

/// Arguments to the reconciler. Every writer (webhooks, payment initiation)
/// converges through this.
#[derive(Debug, Clone)]
pub struct ReconcileInput {
    pub user_id: Uuid,
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// A fully-resolved subscription write, derived display fields included.
///
/// The only way to build one is [`SubscriptionWrite::compute`], which derives
/// `billing_period_text` and `billing_period_accurate` from the final
/// (start, end, tier). Repos persist the whole struct in a single statement,
/// so the derived fields can never drift from the period they describe.
#[derive(Debug, Clone)]
pub struct SubscriptionWrite {
    pub user_id: Uuid,
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub billing_period_text: String,
    pub billing_period_accurate: bool,
}

impl SubscriptionWrite {
    pub fn compute(
        user_id: Uuid,
        plan_tier: PlanTier,
        status: SubscriptionStatus,
        stripe_subscription_id: Option<String>,
        stripe_customer_id: Option<String>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let rendered = format_billing_period(period_start, period_end, Some(plan_tier), now);
        Self {
            user_id,
            plan_tier,
            status,
            stripe_subscription_id,
            stripe_customer_id,
            period_start,
            period_end,
            billing_period_text: rendered.text,
            billing_period_accurate: rendered.accurate,
        }
    }
}

// ============================================================================
// Plan Catalog
// ============================================================================

/// Price configuration for one purchasable tier.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanPrice {
    /// Provider price id for recurring billing.
    pub price_id: Option<String>,
    /// One-time charge amount for non-renewing purchases.
    pub amount_cents: i64,
    pub currency: String,
}

/// Maps purchasable tiers to their provider price configuration. Built from
/// the environment at startup; tiers without an entry cannot be bought.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    pub monthly: Option<PlanPrice>,
    pub semiannual: Option<PlanPrice>,
    pub annual: Option<PlanPrice>,
}

impl PlanCatalog {
    pub fn get(&self, tier: PlanTier) -> Option<&PlanPrice> {
        match tier {
            PlanTier::Monthly => self.monthly.as_ref(),
            PlanTier::Semiannual => self.semiannual.as_ref(),
            PlanTier::Annual => self.annual.as_ref(),
            PlanTier::Trial => None,
        }
    }
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    /// The authoritative row for a user: most recently created.
    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;
    async fn find_by_provider_subscription(&self, id: &str) -> AppResult<Option<Subscription>>;
    async fn find_by_provider_customer(&self, id: &str) -> AppResult<Option<Subscription>>;
    async fn create(&self, write: &SubscriptionWrite) -> AppResult<Subscription>;
    /// Update in place. Provider ids must only be overwritten by non-null
    /// values (COALESCE); everything else is overwritten unconditionally.
    async fn update(&self, id: Uuid, write: &SubscriptionWrite) -> AppResult<Subscription>;
    /// Conditional status transition, atomic with the precondition check.
    /// Returns `None` when the row was not in `expected` (or, when
    /// `require_unexpired` is set, its period had already ended).
    async fn transition_status(
        &self,
        id: Uuid,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
        require_unexpired: bool,
    ) -> AppResult<Option<Subscription>>;
}

#[async_trait]
pub trait UserProfileRepo: Send + Sync {
    async fn upsert(
        &self,
        user_id: Uuid,
        email: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait WebhookEventRepo: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool>;
    async fn mark_processed(&self, event_id: &str, event_type: &str) -> AppResult<()>;
}

// ============================================================================
// Checkout Result
// ============================================================================

/// What payment initiation hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub handle: PaymentHandle,
    /// Set when the provider confirmed payment inline and we reconciled
    /// optimistically (the webhook will converge to the same state).
    pub subscription: Option<Subscription>,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    profile_repo: Arc<dyn UserProfileRepo>,
    event_repo: Arc<dyn WebhookEventRepo>,
    identity: Arc<dyn IdentityProviderPort>,
    provider: Arc<dyn PaymentProviderPort>,
    catalog: PlanCatalog,
}

impl BillingUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        profile_repo: Arc<dyn UserProfileRepo>,
        event_repo: Arc<dyn WebhookEventRepo>,
        identity: Arc<dyn IdentityProviderPort>,
        provider: Arc<dyn PaymentProviderPort>,
        catalog: PlanCatalog,
    ) -> Self {
        Self {
            subscription_repo,
            profile_repo,
            event_repo,
            identity,
            provider,
            catalog,
        }
    }

    // ========================================================================
    // Reconciler
    // ========================================================================

    /// Idempotent upsert of the user's subscription. Safe to call repeatedly
    /// with identical or evolving arguments; webhook redelivery and
    /// optimistic client confirmation both land here.
    pub async fn reconcile(&self, input: &ReconcileInput) -> AppResult<Subscription> {
        let now = Utc::now();
        let start = input.period_start.unwrap_or(now);
        let mut end = input
            .period_end
            .unwrap_or_else(|| period_end(Some(input.plan_tier), start));

        // periodEnd > periodStart must hold; a violating pair from the
        // provider is corrected by recomputation.
        if end <= start {
            tracing::warn!(
                user_id = %input.user_id,
                %start,
                %end,
                "Provider-reported period is inverted, recomputing end"
            );
            end = period_end(Some(input.plan_tier), start);
        }

        let write = SubscriptionWrite::compute(
            input.user_id,
            input.plan_tier,
            input.status,
            input.stripe_subscription_id.clone(),
            input.stripe_customer_id.clone(),
            start,
            end,
            now,
        );

        let subscription = match self.subscription_repo.latest_by_user(input.user_id).await? {
            Some(existing) => self.subscription_repo.update(existing.id, &write).await?,
            None => self.subscription_repo.create(&write).await?,
        };

        self.refresh_user_profile(input.user_id).await;

        Ok(subscription)
    }

    /// Keep the denormalized profile row in sync with the identity provider.
    /// Non-critical: a failed lookup must not fail the reconcile.
    async fn refresh_user_profile(&self, user_id: Uuid) {
        match self.identity.get_user(user_id).await {
            Ok(Some(info)) => {
                if let Err(e) = self
                    .profile_repo
                    .upsert(user_id, &info.email, &info.metadata)
                    .await
                {
                    tracing::warn!(error = %e, %user_id, "Failed to upsert user profile");
                }
            }
            Ok(None) => {
                tracing::debug!(%user_id, "User not found in identity provider");
            }
            Err(e) => {
                tracing::warn!(error = %e, %user_id, "Identity lookup failed (non-critical)");
            }
        }
    }

    // ========================================================================
    // Access Status Resolver
    // ========================================================================

    /// Read-only. Users without a row get the synthetic 30-day trial.
    pub async fn access_status(&self, user_id: Uuid) -> AppResult<AccessStatus> {
        let now = Utc::now();
        Ok(match self.subscription_repo.latest_by_user(user_id).await? {
            Some(sub) => AccessStatus::from_subscription(&sub, now),
            None => AccessStatus::trial_fallback(now),
        })
    }

    // ========================================================================
    // Lifecycle Operations
    // ========================================================================

    /// Active -> Cancelled. Access continues until period end, so the period
    /// bounds are left untouched. `reason` is logged, not persisted.
    pub async fn cancel(&self, user_id: Uuid, reason: Option<&str>) -> AppResult<Subscription> {
        let current = self
            .subscription_repo
            .latest_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::InvalidState("not active".into()))?;

        if current.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState("not active".into()));
        }

        tracing::info!(%user_id, subscription_id = %current.id, reason = ?reason, "Cancelling subscription");

        self.subscription_repo
            .transition_status(
                current.id,
                SubscriptionStatus::Active,
                SubscriptionStatus::Cancelled,
                false,
            )
            .await?
            // A concurrent writer changed the status between our read and the
            // conditional update.
            .ok_or_else(|| AppError::InvalidState("not active".into()))
    }

    /// Cancelled-but-unexpired -> Active. Clears the provider's pending
    /// cancellation and updates the default payment method; one-time plans
    /// have no provider subscription, so only the payment method changes.
    pub async fn reactivate(&self, user_id: Uuid, payment_method: &str) -> AppResult<Subscription> {
        let current = self
            .subscription_repo
            .latest_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::InvalidState("not cancelled".into()))?;

        if current.status != SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidState("not cancelled".into()));
        }
        if current.period_end <= Utc::now() {
            return Err(AppError::Expired);
        }

        match (&current.stripe_customer_id, &current.stripe_subscription_id) {
            (Some(customer), Some(sub_id)) => {
                self.provider
                    .resume_subscription(&ProviderSubscriptionId::new(sub_id.clone()))
                    .await?;
                self.provider
                    .set_default_payment_method(&CustomerId::new(customer.clone()), payment_method)
                    .await?;
            }
            (Some(customer), None) => {
                self.provider
                    .set_default_payment_method(&CustomerId::new(customer.clone()), payment_method)
                    .await?;
            }
            (None, _) => {
                tracing::warn!(%user_id, "Reactivating subscription with no provider customer on record");
            }
        }

        self.subscription_repo
            .transition_status(
                current.id,
                SubscriptionStatus::Cancelled,
                SubscriptionStatus::Active,
                true,
            )
            .await?
            .ok_or_else(|| AppError::InvalidState("not cancelled".into()))
    }

    // ========================================================================
    // Payment Initiation
    // ========================================================================

    /// Create a provider customer plus either a recurring subscription or a
    /// one-time charge, and reconcile immediately when the provider confirms
    /// payment inline.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        tier: PlanTier,
        auto_renew: bool,
        payment_method: Option<&str>,
    ) -> AppResult<CheckoutOutcome> {
        let price = self
            .catalog
            .get(tier)
            .ok_or_else(|| AppError::Validation(format!("no price configured for {tier}")))?;

        let email = self
            .identity
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Validation("unknown user".into()))?
            .email;

        let customer = self.provider.ensure_customer(&email, user_id).await?;

        let handle = if auto_renew {
            let price_id = price.price_id.as_deref().ok_or_else(|| {
                AppError::Validation(format!("no recurring price configured for {tier}"))
            })?;
            self.provider
                .create_subscription(&customer, price_id, payment_method)
                .await?
        } else {
            self.provider
                .create_one_time_payment(
                    &customer,
                    price.amount_cents,
                    &price.currency,
                    payment_method,
                )
                .await?
        };

        let subscription = if handle.confirmation == PaymentConfirmation::Confirmed {
            let input = ReconcileInput {
                user_id,
                plan_tier: tier,
                status: SubscriptionStatus::Active,
                stripe_subscription_id: handle.subscription_id.as_ref().map(|s| s.0.clone()),
                stripe_customer_id: Some(handle.customer_id.0.clone()),
                period_start: handle.period_start,
                period_end: handle.period_end,
            };
            Some(self.reconcile(&input).await?)
        } else {
            None
        };

        Ok(CheckoutOutcome {
            handle,
            subscription,
        })
    }

    // ========================================================================
    // Webhook idempotency
    // ========================================================================

    pub async fn is_event_processed(&self, event_id: &str) -> AppResult<bool> {
        self.event_repo.is_processed(event_id).await
    }

    pub async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> AppResult<()> {
        self.event_repo.mark_processed(event_id, event_type).await
    }

    /// Find which user a provider object belongs to, for events that carry a
    /// customer/subscription reference instead of our metadata.
    pub async fn find_by_provider_refs(
        &self,
        subscription_id: Option<&str>,
        customer_id: Option<&str>,
    ) -> AppResult<Option<Subscription>> {
        if let Some(sub_id) = subscription_id
            && let Some(found) = self
                .subscription_repo
                .find_by_provider_subscription(sub_id)
                .await?
        {
            return Ok(Some(found));
        }
        if let Some(cus_id) = customer_id {
            return self
                .subscription_repo
                .find_by_provider_customer(cus_id)
                .await;
        }
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
