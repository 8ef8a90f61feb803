use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{NewReminderRecord, ReminderRecord, Store, StoreError};

pub const DEFAULT_TITLE: &str = "Payment";
pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug)]
pub enum ReminderError {
    InvalidAmount(Decimal),
    StoreFailure(StoreError),
}

impl std::error::Error for ReminderError {}

impl fmt::Display for ReminderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderError::InvalidAmount(amount) => {
                write!(f, "ReminderError: Reminder amount must not be negative, got {amount}")
            }
            ReminderError::StoreFailure(e) => {
                write!(f, "ReminderError: {e}")
            }
        }
    }
}

impl From<StoreError> for ReminderError {
    fn from(error: StoreError) -> Self {
        ReminderError::StoreFailure(error)
    }
}

/// Canonicalizes user-entered pay dates. Accepts ISO (`2025-03-15`) and
/// dotted European (`15.03.2025`) forms. Anything else falls back to `today`
/// with a warning rather than rejecting the input.
pub fn normalize_pay_date(input: &str, today: NaiveDate) -> NaiveDate {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d.%m.%Y") {
        return date;
    }

    log::warn!("Unparseable pay date '{trimmed}'; falling back to {today}");
    today
}

#[derive(Clone)]
pub struct ReminderRegistry {
    store: Arc<dyn Store>,
}

impl ReminderRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        amount: Decimal,
        date_input: &str,
        recurrence: &str,
        today: NaiveDate,
    ) -> Result<Uuid, ReminderError> {
        if amount < Decimal::ZERO {
            return Err(ReminderError::InvalidAmount(amount));
        }

        let title = if title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            title.trim()
        };

        let reminder_id = self
            .store
            .create_reminder(NewReminderRecord {
                user_id,
                title: String::from(title),
                // Half-up, so a midpoint like 500.005 rounds to 500.01
                amount: amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                pay_date: normalize_pay_date(date_input, today),
                recurrence: String::from(recurrence),
            })
            .await?;

        log::info!("Created reminder {reminder_id} for user {user_id}");

        Ok(reminder_id)
    }

    /// Active reminders ordered by ascending pay date. Degrades to an empty
    /// list on store failure so listing never breaks the caller's flow.
    pub async fn list(&self, user_id: Uuid, limit: Option<i64>) -> Vec<ReminderRecord> {
        match self
            .store
            .list_reminders(user_id, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await
        {
            Ok(reminders) => reminders,
            Err(e) => {
                log::error!("Failed to list reminders for user {user_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Deletes a reminder if it belongs to `user_id`. Returns false when the
    /// reminder is missing, owned by someone else, or the store fails.
    pub async fn delete(&self, user_id: Uuid, reminder_id: Uuid) -> bool {
        match self.store.delete_reminder(user_id, reminder_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                log::error!("Failed to delete reminder {reminder_id} for user {user_id}: {e}");
                false
            }
        }
    }

    pub async fn count_active(&self, user_id: Uuid) -> i64 {
        match self.store.count_active_reminders(user_id).await {
            Ok(count) => count,
            Err(e) => {
                log::error!("Failed to count reminders for user {user_id}: {e}");
                0
            }
        }
    }
}
