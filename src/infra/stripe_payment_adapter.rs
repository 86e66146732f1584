use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::ports::payment_provider::{
        CustomerId, PaymentConfirmation, PaymentHandle, PaymentProviderPort,
        ProviderSubscriptionId,
    },
    infra::stripe_client::{StripeClient, StripePaymentIntent, StripeSubscription},
};

/// Live payment provider backed by the Stripe REST API.
pub struct StripePaymentAdapter {
    client: StripeClient,
}

impl StripePaymentAdapter {
    pub fn new(client: StripeClient) -> Self {
        Self { client }
    }
}

fn confirmation_from_intent(intent: Option<&StripePaymentIntent>) -> PaymentConfirmation {
    match intent.map(|i| i.status.as_str()) {
        Some("succeeded") => PaymentConfirmation::Confirmed,
        Some("requires_action") | Some("requires_confirmation") => {
            PaymentConfirmation::RequiresAction
        }
        _ => PaymentConfirmation::Pending,
    }
}

fn handle_from_subscription(sub: StripeSubscription) -> PaymentHandle {
    let intent = sub
        .latest_invoice
        .as_ref()
        .and_then(|inv| inv.payment_intent.as_ref());
    let confirmation = confirmation_from_intent(intent);
    let client_secret = intent.and_then(|i| i.client_secret.clone());

    PaymentHandle {
        customer_id: CustomerId::new(sub.customer),
        subscription_id: Some(ProviderSubscriptionId::new(sub.id)),
        client_secret,
        confirmation,
        period_start: sub
            .current_period_start
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        period_end: sub
            .current_period_end
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
    }
}

#[async_trait]
impl PaymentProviderPort for StripePaymentAdapter {
    async fn ensure_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId> {
        // user_id metadata is what webhook handlers use to route events back
        // to a local account.
        let metadata = HashMap::from([("user_id".to_string(), user_id.to_string())]);
        let customer = self
            .client
            .get_or_create_customer(email, Some(metadata))
            .await?;
        Ok(CustomerId::new(customer.id))
    }

    async fn create_subscription(
        &self,
        customer: &CustomerId,
        price_id: &str,
        payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle> {
        let sub = self
            .client
            .create_subscription(customer.as_str(), price_id, payment_method)
            .await?;
        Ok(handle_from_subscription(sub))
    }

    async fn create_one_time_payment(
        &self,
        customer: &CustomerId,
        amount_cents: i64,
        currency: &str,
        payment_method: Option<&str>,
    ) -> AppResult<PaymentHandle> {
        let intent = self
            .client
            .create_payment_intent(customer.as_str(), amount_cents, currency, payment_method)
            .await?;
        let confirmation = confirmation_from_intent(Some(&intent));

        Ok(PaymentHandle {
            customer_id: customer.clone(),
            subscription_id: None,
            client_secret: intent.client_secret,
            confirmation,
            period_start: None,
            period_end: None,
        })
    }

    async fn resume_subscription(
        &self,
        subscription_id: &ProviderSubscriptionId,
    ) -> AppResult<()> {
        self.client
            .resume_subscription(subscription_id.as_str())
            .await?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer: &CustomerId,
        payment_method: &str,
    ) -> AppResult<()> {
        self.client
            .update_default_payment_method(customer.as_str(), payment_method)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::stripe_client::StripeInvoiceExpanded;

    fn intent(status: &str) -> StripePaymentIntent {
        StripePaymentIntent {
            id: "pi_1".to_string(),
            status: status.to_string(),
            client_secret: Some("pi_1_secret".to_string()),
        }
    }

    #[test]
    fn intent_status_maps_to_confirmation() {
        assert_eq!(
            confirmation_from_intent(Some(&intent("succeeded"))),
            PaymentConfirmation::Confirmed
        );
        assert_eq!(
            confirmation_from_intent(Some(&intent("requires_action"))),
            PaymentConfirmation::RequiresAction
        );
        assert_eq!(
            confirmation_from_intent(Some(&intent("requires_confirmation"))),
            PaymentConfirmation::RequiresAction
        );
        assert_eq!(
            confirmation_from_intent(Some(&intent("processing"))),
            PaymentConfirmation::Pending
        );
        assert_eq!(confirmation_from_intent(None), PaymentConfirmation::Pending);
    }

    #[test]
    fn subscription_handle_carries_period_and_secret() {
        let sub = StripeSubscription {
            id: "sub_1".to_string(),
            customer: "cus_1".to_string(),
            status: "incomplete".to_string(),
            current_period_start: Some(1_700_000_000),
            current_period_end: Some(1_702_592_000),
            cancel_at_period_end: Some(false),
            latest_invoice: Some(StripeInvoiceExpanded {
                id: "in_1".to_string(),
                payment_intent: Some(intent("requires_action")),
            }),
        };

        let handle = handle_from_subscription(sub);
        assert_eq!(handle.customer_id.as_str(), "cus_1");
        assert_eq!(
            handle.subscription_id.as_ref().map(|s| s.as_str()),
            Some("sub_1")
        );
        assert_eq!(handle.confirmation, PaymentConfirmation::RequiresAction);
        assert_eq!(handle.client_secret.as_deref(), Some("pi_1_secret"));
        assert!(handle.period_start.is_some());
        assert!(handle.period_end.is_some());
    }
}
