use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::store::{
    DueReminder, NewPaymentRecord, NewReminderRecord, PaymentRecord, PaymentStatus, PremiumState,
    ReminderRecord, StatusTransition, Store, StoreError, UserProfile, UserRecord,
};

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    reminders: Vec<ReminderRecord>,
    payments: Vec<PaymentRecord>,
    job_registry: HashMap<String, DateTime<Utc>>,
}

/// In-memory [`Store`] for tests and local development. All operations are
/// atomic under a single mutex; ordering and ownership semantics match the
/// Postgres implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw user row, bypassing any lazy reconciliation. Test helper.
    pub fn get_user(&self, user_id: Uuid) -> Option<UserRecord> {
        self.lock().users.iter().find(|u| u.id == user_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_or_create_user(
        &self,
        chat_id: i64,
        profile: &UserProfile,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.lock();

        if let Some(user) = inner.users.iter_mut().find(|u| u.chat_id == chat_id) {
            user.first_name = profile.first_name.clone();
            user.last_name = profile.last_name.clone();
            user.username = profile.username.clone();
            return Ok(user.id);
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            chat_id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            username: profile.username.clone(),
            is_premium: false,
            premium_until: None,
        };

        let user_id = user.id;
        inner.users.push(user);

        Ok(user_id)
    }

    async fn get_user_premium(&self, user_id: Uuid) -> Result<PremiumState, StoreError> {
        let inner = self.lock();
        let user = inner
            .users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::QueryFailure(diesel::result::Error::NotFound))?;

        Ok(PremiumState {
            is_premium: user.is_premium,
            premium_until: user.premium_until,
        })
    }

    async fn set_user_premium(
        &self,
        user_id: Uuid,
        is_premium: bool,
        premium_until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.is_premium = is_premium;
            user.premium_until = premium_until;
        }

        Ok(())
    }

    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let mut cleared = 0;

        for user in inner.users.iter_mut() {
            if user.is_premium && user.premium_until.is_some_and(|until| until < now) {
                user.is_premium = false;
                user.premium_until = None;
                cleared += 1;
            }
        }

        Ok(cleared)
    }

    async fn create_reminder(&self, reminder: NewReminderRecord) -> Result<Uuid, StoreError> {
        let record = ReminderRecord {
            id: Uuid::new_v4(),
            user_id: reminder.user_id,
            title: reminder.title,
            amount: reminder.amount,
            pay_date: reminder.pay_date,
            recurrence: reminder.recurrence,
            is_active: true,
        };

        let reminder_id = record.id;
        self.lock().reminders.push(record);

        Ok(reminder_id)
    }

    async fn list_reminders(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        let inner = self.lock();
        let mut records: Vec<ReminderRecord> = inner
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active)
            .cloned()
            .collect();

        records.sort_by_key(|r| r.pay_date);
        records.truncate(limit.max(0) as usize);

        Ok(records)
    }

    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let before = inner.reminders.len();
        inner
            .reminders
            .retain(|r| !(r.id == reminder_id && r.user_id == user_id));

        Ok(inner.reminders.len() < before)
    }

    async fn count_active_reminders(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let inner = self.lock();
        let count = inner
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active)
            .count();

        Ok(count as i64)
    }

    async fn create_payment(&self, payment: NewPaymentRecord) -> Result<Uuid, StoreError> {
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            amount: payment.amount,
            period_days: payment.period_days,
            status: PaymentStatus::Pending,
            gateway_ref: None,
            created_timestamp: Utc::now(),
        };

        let payment_id = record.id;
        self.lock().payments.push(record);

        Ok(payment_id)
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner.payments.iter().find(|p| p.id == payment_id).cloned())
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        gateway_ref: Option<&str>,
    ) -> Result<Option<StatusTransition>, StoreError> {
        let mut inner = self.lock();

        let Some(payment) = inner.payments.iter_mut().find(|p| p.id == payment_id) else {
            return Ok(None);
        };

        let previous = payment.status;
        payment.status = status;
        payment.gateway_ref = gateway_ref.map(String::from);

        Ok(Some(StatusTransition {
            previous,
            payment: payment.clone(),
        }))
    }

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let inner = self.lock();
        let mut records: Vec<PaymentRecord> = inner
            .payments
            .iter()
            .filter(|p| p.status == status)
            .cloned()
            .collect();

        records.sort_by_key(|p| p.created_timestamp);

        Ok(records)
    }

    async fn find_reminders_due(&self, date: NaiveDate) -> Result<Vec<DueReminder>, StoreError> {
        let inner = self.lock();
        let due = inner
            .reminders
            .iter()
            .filter(|r| r.is_active && r.pay_date == date)
            .filter_map(|r| {
                inner
                    .users
                    .iter()
                    .find(|u| u.id == r.user_id)
                    .map(|u| DueReminder {
                        reminder: r.clone(),
                        user: u.clone(),
                    })
            })
            .collect();

        Ok(due)
    }

    async fn get_job_last_run(
        &self,
        job_name: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock().job_registry.get(job_name).copied())
    }

    async fn set_job_last_run(
        &self,
        job_name: &str,
        time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock().job_registry.insert(String::from(job_name), time);
        Ok(())
    }
}
