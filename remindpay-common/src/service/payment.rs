use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::service::subscription::{SubscriptionError, SubscriptionManager};
use crate::store::{NewPaymentRecord, PaymentStatus, Store, StoreError};

pub const AWAITING_CONFIRMATION_MSG: &str =
    "Payment is awaiting confirmation by an administrator";

#[derive(Debug)]
pub enum PaymentError {
    InvalidAmount(Decimal),
    InvalidPeriod(i32),
    NotFound(Uuid),
    StoreFailure(StoreError),
}

impl std::error::Error for PaymentError {}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentError::InvalidAmount(amount) => {
                write!(f, "PaymentError: Payment amount must be positive, got {amount}")
            }
            PaymentError::InvalidPeriod(days) => {
                write!(f, "PaymentError: Premium period must be positive, got {days}")
            }
            PaymentError::NotFound(payment_id) => {
                write!(f, "PaymentError: No payment with id {payment_id}")
            }
            PaymentError::StoreFailure(e) => {
                write!(f, "PaymentError: {e}")
            }
        }
    }
}

impl From<StoreError> for PaymentError {
    fn from(error: StoreError) -> Self {
        PaymentError::StoreFailure(error)
    }
}

impl From<SubscriptionError> for PaymentError {
    fn from(error: SubscriptionError) -> Self {
        match error {
            SubscriptionError::InvalidDays(days) => PaymentError::InvalidPeriod(days as i32),
            SubscriptionError::StoreFailure(e) => PaymentError::StoreFailure(e),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
    pub activated_premium: bool,
}

#[derive(Clone, Debug)]
pub struct VerifyOutcome {
    pub status: PaymentStatus,
    pub message: String,
}

/// Lifecycle of a manual payment from checkout initiation through
/// operator-triggered confirmation. A confirmed payment is the sole premium
/// activation trigger.
#[derive(Clone)]
pub struct PaymentWorkflow {
    store: Arc<dyn Store>,
    subscriptions: SubscriptionManager,
}

impl PaymentWorkflow {
    pub fn new(store: Arc<dyn Store>, subscriptions: SubscriptionManager) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Persists a pending payment. No subscription side effect fires here.
    pub async fn create(
        &self,
        user_id: Uuid,
        amount: Decimal,
        period_days: i32,
    ) -> Result<Uuid, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(amount));
        }

        if period_days <= 0 {
            return Err(PaymentError::InvalidPeriod(period_days));
        }

        let payment_id = self
            .store
            .create_payment(NewPaymentRecord {
                user_id,
                // Half-up, matching reminder amounts
                amount: amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                period_days,
            })
            .await?;

        log::info!(
            "Created pending payment {payment_id} for user {user_id} ({period_days} premium days)"
        );

        Ok(payment_id)
    }

    /// Persists the new status and gateway reference unconditionally.
    /// Premium activation fires only on a pending-to-succeeded transition;
    /// repeated confirmations of the same payment are therefore harmless.
    /// The premium period is measured from this call, not from checkout.
    pub async fn update_status(
        &self,
        payment_id: Uuid,
        new_status: PaymentStatus,
        gateway_ref: Option<&str>,
    ) -> Result<StatusUpdate, PaymentError> {
        let transition = self
            .store
            .update_payment_status(payment_id, new_status, gateway_ref)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        log::info!(
            "Payment {payment_id} status: {} -> {new_status}",
            transition.previous
        );

        let mut activated_premium = false;

        if new_status == PaymentStatus::Succeeded {
            if transition.previous == PaymentStatus::Pending {
                self.subscriptions
                    .activate(
                        transition.payment.user_id,
                        i64::from(transition.payment.period_days),
                    )
                    .await?;
                activated_premium = true;
            } else {
                log::warn!(
                    "Payment {payment_id} was already {}; skipping premium activation",
                    transition.previous
                );
            }
        }

        Ok(StatusUpdate {
            status: new_status,
            activated_premium,
        })
    }

    /// Manual-payment placeholder: there is no gateway to poll, so this only
    /// reports the stored status. Confirmation arrives exclusively through
    /// [`PaymentWorkflow::update_status`].
    pub async fn verify(&self, payment_id: Uuid) -> Result<VerifyOutcome, PaymentError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        let message = match payment.status {
            PaymentStatus::Pending => String::from(AWAITING_CONFIRMATION_MSG),
            status => format!("Payment is {status}"),
        };

        Ok(VerifyOutcome {
            status: payment.status,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    use crate::store::{MemoryStore, UserProfile};

    fn workflow(store: &MemoryStore) -> PaymentWorkflow {
        let store: Arc<dyn Store> = Arc::new(store.clone());
        PaymentWorkflow::new(Arc::clone(&store), SubscriptionManager::new(store))
    }

    async fn user(store: &MemoryStore, chat_id: i64) -> Uuid {
        store
            .get_or_create_user(chat_id, &UserProfile::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_validates_amount_and_period() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 1).await;

        assert!(matches!(
            workflow.create(user_id, dec!(0), 30).await,
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            workflow.create(user_id, dec!(-5.00), 30).await,
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            workflow.create(user_id, dec!(199.00), 0).await,
            Err(PaymentError::InvalidPeriod(0))
        ));
    }

    #[tokio::test]
    async fn verify_reports_pending_until_confirmed() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 2).await;

        let payment_id = workflow.create(user_id, dec!(199.00), 30).await.unwrap();

        let outcome = workflow.verify(payment_id).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Pending);
        assert_eq!(outcome.message, AWAITING_CONFIRMATION_MSG);

        workflow
            .update_status(payment_id, PaymentStatus::Succeeded, Some("ref-1"))
            .await
            .unwrap();

        let outcome = workflow.verify(payment_id).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn succeeded_transition_activates_premium_from_confirmation_time() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 3).await;

        let payment_id = workflow.create(user_id, dec!(199.00), 30).await.unwrap();

        // However long the payment sat pending, the period is measured from
        // the confirmation call.
        let update = workflow
            .update_status(payment_id, PaymentStatus::Succeeded, Some("gw-123"))
            .await
            .unwrap();
        assert!(update.activated_premium);

        let raw = store.get_user(user_id).unwrap();
        assert!(raw.is_premium);
        assert_eq!(
            raw.premium_until.unwrap().date_naive(),
            (Utc::now() + Duration::days(30)).date_naive()
        );

        let payment = store.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.gateway_ref.as_deref(), Some("gw-123"));
    }

    #[tokio::test]
    async fn repeated_confirmation_does_not_extend_premium() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 4).await;

        let payment_id = workflow.create(user_id, dec!(199.00), 30).await.unwrap();

        workflow
            .update_status(payment_id, PaymentStatus::Succeeded, None)
            .await
            .unwrap();
        let first_until = store.get_user(user_id).unwrap().premium_until;

        let update = workflow
            .update_status(payment_id, PaymentStatus::Succeeded, None)
            .await
            .unwrap();
        assert!(!update.activated_premium);
        assert_eq!(store.get_user(user_id).unwrap().premium_until, first_until);
    }

    #[tokio::test]
    async fn failed_and_cancelled_transitions_have_no_side_effect() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 5).await;

        let payment_id = workflow.create(user_id, dec!(199.00), 30).await.unwrap();

        let update = workflow
            .update_status(payment_id, PaymentStatus::Failed, None)
            .await
            .unwrap();
        assert!(!update.activated_premium);
        assert!(!store.get_user(user_id).unwrap().is_premium);

        let payment_id = workflow.create(user_id, dec!(199.00), 30).await.unwrap();
        workflow
            .update_status(payment_id, PaymentStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(!store.get_user(user_id).unwrap().is_premium);
    }

    #[tokio::test]
    async fn update_status_reports_missing_payment() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);

        assert!(matches!(
            workflow
                .update_status(Uuid::new_v4(), PaymentStatus::Succeeded, None)
                .await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn amount_is_rounded_to_two_decimal_places() {
        let store = MemoryStore::new();
        let workflow = workflow(&store);
        let user_id = user(&store, 6).await;

        let payment_id = workflow.create(user_id, dec!(199.999), 30).await.unwrap();
        let payment = store.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.amount, dec!(200.00));

        // Midpoints round half-up, not to nearest even
        let payment_id = workflow.create(user_id, dec!(199.985), 30).await.unwrap();
        let payment = store.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.amount, dec!(199.99));
    }
}
