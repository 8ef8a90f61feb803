use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(
    database_uri: &str,
    max_db_connections: Option<u32>,
) -> Result<DbThreadPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_uri);
    let mut builder = diesel::r2d2::Pool::builder();

    if let Some(max_connections) = max_db_connections {
        builder = builder.max_size(max_connections);
    }

    builder.build(manager)
}

#[derive(Debug)]
pub enum StoreError {
    PoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    ConcurrencyFailure(String),
    BadRecord(String),
}

impl std::error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::PoolFailure(e) => {
                write!(f, "StoreError: Failed to obtain DB connection: {e}")
            }
            StoreError::QueryFailure(e) => {
                write!(f, "StoreError: Query failed: {e}")
            }
            StoreError::ConcurrencyFailure(e) => {
                write!(f, "StoreError: Failed to join blocking task: {e}")
            }
            StoreError::BadRecord(e) => {
                write!(f, "StoreError: Persisted record was malformed: {e}")
            }
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        StoreError::PoolFailure(error)
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        StoreError::QueryFailure(error)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(error: tokio::task::JoinError) -> Self {
        StoreError::ConcurrencyFailure(error.to_string())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, StoreError> {
        match value {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(StoreError::BadRecord(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }
}

/// Chat-provided name fields, refreshed on every contact.
#[derive(Clone, Debug, Default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PremiumState {
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReminderRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub pay_date: NaiveDate,
    pub recurrence: String,
    pub is_active: bool,
}

#[derive(Clone, Debug)]
pub struct NewReminderRecord {
    pub user_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub pay_date: NaiveDate,
    pub recurrence: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub period_days: i32,
    pub status: PaymentStatus,
    pub gateway_ref: Option<String>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewPaymentRecord {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub period_days: i32,
}

/// Result of persisting a payment-status update. Carries the status the
/// payment held before the write so callers can gate side effects on the
/// pending-to-terminal transition.
#[derive(Clone, Debug)]
pub struct StatusTransition {
    pub previous: PaymentStatus,
    pub payment: PaymentRecord,
}

#[derive(Clone, Debug)]
pub struct DueReminder {
    pub reminder: ReminderRecord,
    pub user: UserRecord,
}

/// Durable persistence boundary for users, reminders, and payments.
///
/// Components hold only ids and re-fetch through this trait on every
/// operation; the trait owns connection acquisition and reconnect policy.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upserts a user keyed by external chat id, refreshing name fields on
    /// every contact. Returns the internal user id.
    async fn get_or_create_user(
        &self,
        chat_id: i64,
        profile: &UserProfile,
    ) -> Result<Uuid, StoreError>;

    async fn get_user_premium(&self, user_id: Uuid) -> Result<PremiumState, StoreError>;

    async fn set_user_premium(
        &self,
        user_id: Uuid,
        is_premium: bool,
        premium_until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Clears the premium flag for every user whose `premium_until` has
    /// passed. Returns the number of users reconciled.
    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn create_reminder(&self, reminder: NewReminderRecord) -> Result<Uuid, StoreError>;

    /// Active reminders for a user, ordered by ascending payment date.
    async fn list_reminders(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReminderRecord>, StoreError>;

    /// Deletes a reminder only if it belongs to `user_id`. Returns whether a
    /// row was actually removed; the ownership check lives in the query.
    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> Result<bool, StoreError>;

    async fn count_active_reminders(&self, user_id: Uuid) -> Result<i64, StoreError>;

    async fn create_payment(&self, payment: NewPaymentRecord) -> Result<Uuid, StoreError>;

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, StoreError>;

    /// Persists `status` and `gateway_ref` in a single transaction and
    /// reports the status the payment held before the write. `None` when no
    /// payment with the given id exists.
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        gateway_ref: Option<&str>,
    ) -> Result<Option<StatusTransition>, StoreError>;

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Active reminders due on `date`, joined with their owning users.
    async fn find_reminders_due(&self, date: NaiveDate) -> Result<Vec<DueReminder>, StoreError>;

    async fn get_job_last_run(&self, job_name: &str)
        -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn set_job_last_run(
        &self,
        job_name: &str,
        time: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
