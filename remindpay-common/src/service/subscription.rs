use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{Store, StoreError};

#[derive(Debug)]
pub enum SubscriptionError {
    InvalidDays(i64),
    StoreFailure(StoreError),
}

impl std::error::Error for SubscriptionError {}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::InvalidDays(days) => {
                write!(f, "SubscriptionError: Premium period must be positive, got {days}")
            }
            SubscriptionError::StoreFailure(e) => {
                write!(f, "SubscriptionError: {e}")
            }
        }
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(error: StoreError) -> Self {
        SubscriptionError::StoreFailure(error)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SubscriptionStatus {
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub has_active_premium: bool,
}

/// Whether a premium flag is currently in effect. A null `premium_until`
/// means unbounded (legacy) premium.
pub fn premium_is_active(
    is_premium: bool,
    premium_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    is_premium && premium_until.map_or(true, |until| now < until)
}

/// Owns premium activation, deactivation, and expiry enforcement for users.
#[derive(Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn Store>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Grants premium for `days` days measured from now. Re-activation
    /// resets the window to `now + days`; durations never stack.
    pub async fn activate(
        &self,
        user_id: Uuid,
        days: i64,
    ) -> Result<DateTime<Utc>, SubscriptionError> {
        if days <= 0 {
            return Err(SubscriptionError::InvalidDays(days));
        }

        let premium_until = Utc::now() + Duration::days(days);
        self.store
            .set_user_premium(user_id, true, Some(premium_until))
            .await?;

        log::info!("Activated premium for user {user_id} until {premium_until}");

        Ok(premium_until)
    }

    /// Clears the premium flag. A no-op (and a success) when the user is
    /// already deactivated.
    pub async fn deactivate(&self, user_id: Uuid) -> Result<(), SubscriptionError> {
        self.store.set_user_premium(user_id, false, None).await?;

        log::info!("Deactivated premium for user {user_id}");

        Ok(())
    }

    /// Subscription status with lazy expiry enforcement: when the stored
    /// state says premium but `premium_until` has passed, the cleared state
    /// is written back before reporting. Store failures degrade to
    /// "status unknown" with no active premium (fail-closed).
    pub async fn get_status(&self, user_id: Uuid) -> SubscriptionStatus {
        let state = match self.store.get_user_premium(user_id).await {
            Ok(state) => state,
            Err(e) => {
                log::error!("Failed to read premium state for user {user_id}: {e}");
                return SubscriptionStatus::default();
            }
        };

        let now = Utc::now();
        let has_active_premium = premium_is_active(state.is_premium, state.premium_until, now);

        if state.is_premium && !has_active_premium {
            // Write-back is best effort; a later read retries it.
            if let Err(e) = self.store.set_user_premium(user_id, false, None).await {
                log::error!("Failed to clear expired premium for user {user_id}: {e}");
            }

            return SubscriptionStatus {
                is_premium: false,
                premium_until: None,
                has_active_premium: false,
            };
        }

        SubscriptionStatus {
            is_premium: state.is_premium,
            premium_until: state.premium_until,
            has_active_premium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::store::{
        DueReminder, MemoryStore, NewPaymentRecord, NewReminderRecord, PaymentRecord,
        PaymentStatus, PremiumState, ReminderRecord, StatusTransition, UserProfile,
    };

    async fn user(store: &MemoryStore, chat_id: i64) -> Uuid {
        store
            .get_or_create_user(chat_id, &UserProfile::default())
            .await
            .unwrap()
    }

    #[test]
    fn premium_is_active_handles_unbounded_and_expired() {
        let now = Utc::now();

        assert!(premium_is_active(true, None, now));
        assert!(premium_is_active(true, Some(now + Duration::days(1)), now));
        assert!(!premium_is_active(true, Some(now - Duration::seconds(1)), now));
        assert!(!premium_is_active(false, Some(now + Duration::days(1)), now));
        assert!(!premium_is_active(false, None, now));
    }

    #[tokio::test]
    async fn activate_then_get_status_reports_active_premium() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 100).await;

        let until = manager.activate(user_id, 30).await.unwrap();
        let status = manager.get_status(user_id).await;

        assert!(status.has_active_premium);
        assert!(status.is_premium);
        assert_eq!(status.premium_until, Some(until));
        assert_eq!(until.date_naive(), (Utc::now() + Duration::days(30)).date_naive());
    }

    #[tokio::test]
    async fn activate_rejects_non_positive_days() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 101).await;

        assert!(matches!(
            manager.activate(user_id, 0).await,
            Err(SubscriptionError::InvalidDays(0))
        ));
        assert!(matches!(
            manager.activate(user_id, -7).await,
            Err(SubscriptionError::InvalidDays(-7))
        ));
        assert!(!manager.get_status(user_id).await.has_active_premium);
    }

    #[tokio::test]
    async fn reactivation_resets_window_instead_of_stacking() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 102).await;

        manager.activate(user_id, 90).await.unwrap();
        let second_until = manager.activate(user_id, 30).await.unwrap();

        let status = manager.get_status(user_id).await;
        assert_eq!(status.premium_until, Some(second_until));
        assert_eq!(
            second_until.date_naive(),
            (Utc::now() + Duration::days(30)).date_naive()
        );
    }

    #[tokio::test]
    async fn get_status_clears_expired_premium_in_store() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 103).await;

        store
            .set_user_premium(user_id, true, Some(Utc::now() - Duration::days(1)))
            .await
            .unwrap();

        let status = manager.get_status(user_id).await;
        assert!(!status.has_active_premium);
        assert!(!status.is_premium);
        assert_eq!(status.premium_until, None);

        // The lazy expiry must have been persisted, not just reported.
        let raw = store.get_user(user_id).unwrap();
        assert!(!raw.is_premium);
        assert_eq!(raw.premium_until, None);
    }

    #[tokio::test]
    async fn null_premium_until_means_unbounded_premium() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 104).await;

        store.set_user_premium(user_id, true, None).await.unwrap();

        let status = manager.get_status(user_id).await;
        assert!(status.has_active_premium);
        assert_eq!(status.premium_until, None);
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let store = MemoryStore::new();
        let manager = SubscriptionManager::new(Arc::new(store.clone()));
        let user_id = user(&store, 105).await;

        manager.activate(user_id, 7).await.unwrap();

        manager.deactivate(user_id).await.unwrap();
        let first = store.get_user(user_id).unwrap();

        manager.deactivate(user_id).await.unwrap();
        let second = store.get_user(user_id).unwrap();

        assert!(!first.is_premium && !second.is_premium);
        assert_eq!(first.premium_until, second.premium_until);
    }

    struct DownStore;

    #[async_trait]
    impl Store for DownStore {
        async fn get_or_create_user(
            &self,
            _chat_id: i64,
            _profile: &UserProfile,
        ) -> Result<Uuid, StoreError> {
            Err(down())
        }

        async fn get_user_premium(&self, _user_id: Uuid) -> Result<PremiumState, StoreError> {
            Err(down())
        }

        async fn set_user_premium(
            &self,
            _user_id: Uuid,
            _is_premium: bool,
            _premium_until: Option<DateTime<Utc>>,
        ) -> Result<(), StoreError> {
            Err(down())
        }

        async fn clear_expired_premium(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
            Err(down())
        }

        async fn create_reminder(
            &self,
            _reminder: NewReminderRecord,
        ) -> Result<Uuid, StoreError> {
            Err(down())
        }

        async fn list_reminders(
            &self,
            _user_id: Uuid,
            _limit: i64,
        ) -> Result<Vec<ReminderRecord>, StoreError> {
            Err(down())
        }

        async fn delete_reminder(
            &self,
            _user_id: Uuid,
            _reminder_id: Uuid,
        ) -> Result<bool, StoreError> {
            Err(down())
        }

        async fn count_active_reminders(&self, _user_id: Uuid) -> Result<i64, StoreError> {
            Err(down())
        }

        async fn create_payment(&self, _payment: NewPaymentRecord) -> Result<Uuid, StoreError> {
            Err(down())
        }

        async fn get_payment(
            &self,
            _payment_id: Uuid,
        ) -> Result<Option<PaymentRecord>, StoreError> {
            Err(down())
        }

        async fn update_payment_status(
            &self,
            _payment_id: Uuid,
            _status: PaymentStatus,
            _gateway_ref: Option<&str>,
        ) -> Result<Option<StatusTransition>, StoreError> {
            Err(down())
        }

        async fn list_payments_by_status(
            &self,
            _status: PaymentStatus,
        ) -> Result<Vec<PaymentRecord>, StoreError> {
            Err(down())
        }

        async fn find_reminders_due(
            &self,
            _date: NaiveDate,
        ) -> Result<Vec<DueReminder>, StoreError> {
            Err(down())
        }

        async fn get_job_last_run(
            &self,
            _job_name: &str,
        ) -> Result<Option<DateTime<Utc>>, StoreError> {
            Err(down())
        }

        async fn set_job_last_run(
            &self,
            _job_name: &str,
            _time: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(down())
        }
    }

    fn down() -> StoreError {
        StoreError::ConcurrencyFailure(String::from("store unavailable"))
    }

    #[tokio::test]
    async fn get_status_fails_closed_when_store_is_down() {
        let manager = SubscriptionManager::new(Arc::new(DownStore));

        let status = manager.get_status(Uuid::new_v4()).await;

        assert!(!status.has_active_premium);
        assert!(!status.is_premium);
        assert_eq!(status.premium_until, None);
    }
}
