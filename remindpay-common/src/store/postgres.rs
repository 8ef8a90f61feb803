use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::upsert::excluded;
use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::models::payment::{NewPayment, Payment};
use crate::models::reminder::{NewReminder, Reminder};
use crate::models::user::{NewUser, User};
use crate::models::job_registry_item::NewJobRegistryItem;
use crate::store::{
    DbThreadPool, DueReminder, NewPaymentRecord, NewReminderRecord, PaymentRecord, PaymentStatus,
    PremiumState, ReminderRecord, StatusTransition, Store, StoreError, UserProfile, UserRecord,
};

use crate::schema::job_registry as job_registry_fields;
use crate::schema::job_registry::dsl::job_registry;
use crate::schema::payments as payment_fields;
use crate::schema::payments::dsl::payments;
use crate::schema::reminders as reminder_fields;
use crate::schema::reminders::dsl::reminders;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

/// Diesel-backed [`Store`]. Queries are synchronous and run on the blocking
/// thread pool; the r2d2 pool re-validates connections on checkout, so no
/// connection affinity is assumed across calls.
#[derive(Clone)]
pub struct PostgresStore {
    db_thread_pool: DbThreadPool,
}

impl PostgresStore {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }
}

fn user_record(row: User) -> UserRecord {
    UserRecord {
        id: row.id,
        chat_id: row.chat_id,
        first_name: row.first_name,
        last_name: row.last_name,
        username: row.username,
        is_premium: row.is_premium,
        premium_until: row.premium_until,
    }
}

fn reminder_record(row: Reminder) -> ReminderRecord {
    ReminderRecord {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        amount: row.amount,
        pay_date: row.pay_date,
        recurrence: row.recurrence,
        is_active: row.is_active,
    }
}

fn payment_record(row: Payment) -> Result<PaymentRecord, StoreError> {
    let status = PaymentStatus::try_from(row.status.as_str())?;

    Ok(PaymentRecord {
        id: row.id,
        user_id: row.user_id,
        amount: row.amount,
        period_days: row.period_days,
        status,
        gateway_ref: row.gateway_ref,
        created_timestamp: row.created_timestamp,
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_or_create_user(
        &self,
        chat_id: i64,
        profile: &UserProfile,
    ) -> Result<Uuid, StoreError> {
        let pool = self.db_thread_pool.clone();
        let profile = profile.clone();

        let user_id = tokio::task::spawn_blocking(move || -> Result<Uuid, StoreError> {
            let new_user = NewUser {
                id: Uuid::new_v4(),
                chat_id,
                first_name: &profile.first_name,
                last_name: profile.last_name.as_deref(),
                username: profile.username.as_deref(),
                is_premium: false,
                premium_until: None,
                created_timestamp: Utc::now(),
            };

            let mut conn = pool.get()?;
            let user_id = dsl::insert_into(users)
                .values(&new_user)
                .on_conflict(user_fields::chat_id)
                .do_update()
                .set((
                    user_fields::first_name.eq(excluded(user_fields::first_name)),
                    user_fields::last_name.eq(excluded(user_fields::last_name)),
                    user_fields::username.eq(excluded(user_fields::username)),
                ))
                .returning(user_fields::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(user_id)
        })
        .await??;

        Ok(user_id)
    }

    async fn get_user_premium(&self, user_id: Uuid) -> Result<PremiumState, StoreError> {
        let pool = self.db_thread_pool.clone();

        let state = tokio::task::spawn_blocking(move || -> Result<PremiumState, StoreError> {
            let mut conn = pool.get()?;
            let (is_premium, premium_until) = users
                .find(user_id)
                .select((user_fields::is_premium, user_fields::premium_until))
                .first::<(bool, Option<DateTime<Utc>>)>(&mut conn)?;

            Ok(PremiumState {
                is_premium,
                premium_until,
            })
        })
        .await??;

        Ok(state)
    }

    async fn set_user_premium(
        &self,
        user_id: Uuid,
        is_premium: bool,
        premium_until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let pool = self.db_thread_pool.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = pool.get()?;
            dsl::update(users.find(user_id))
                .set((
                    user_fields::is_premium.eq(is_premium),
                    user_fields::premium_until.eq(premium_until),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??;

        Ok(())
    }

    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let pool = self.db_thread_pool.clone();

        let cleared = tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let mut conn = pool.get()?;
            let affected_row_count = dsl::update(
                users
                    .filter(user_fields::is_premium.eq(true))
                    .filter(user_fields::premium_until.is_not_null())
                    .filter(user_fields::premium_until.lt(now)),
            )
            .set((
                user_fields::is_premium.eq(false),
                user_fields::premium_until.eq(None::<DateTime<Utc>>),
            ))
            .execute(&mut conn)?;

            Ok(affected_row_count)
        })
        .await??;

        Ok(cleared)
    }

    async fn create_reminder(&self, reminder: NewReminderRecord) -> Result<Uuid, StoreError> {
        let pool = self.db_thread_pool.clone();

        let reminder_id = tokio::task::spawn_blocking(move || -> Result<Uuid, StoreError> {
            let new_reminder = NewReminder {
                id: Uuid::new_v4(),
                user_id: reminder.user_id,
                title: &reminder.title,
                amount: reminder.amount,
                pay_date: reminder.pay_date,
                recurrence: &reminder.recurrence,
                is_active: true,
                created_timestamp: Utc::now(),
            };

            let mut conn = pool.get()?;
            let reminder_id = dsl::insert_into(reminders)
                .values(&new_reminder)
                .returning(reminder_fields::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(reminder_id)
        })
        .await??;

        Ok(reminder_id)
    }

    async fn list_reminders(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        let pool = self.db_thread_pool.clone();

        let records = tokio::task::spawn_blocking(move || -> Result<Vec<ReminderRecord>, StoreError> {
            let mut conn = pool.get()?;
            let rows = reminders
                .filter(reminder_fields::user_id.eq(user_id))
                .filter(reminder_fields::is_active.eq(true))
                .order(reminder_fields::pay_date.asc())
                .limit(limit)
                .load::<Reminder>(&mut conn)?;

            Ok(rows.into_iter().map(reminder_record).collect())
        })
        .await??;

        Ok(records)
    }

    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> Result<bool, StoreError> {
        let pool = self.db_thread_pool.clone();

        let deleted = tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let mut conn = pool.get()?;
            let affected_row_count = diesel::delete(
                reminders
                    .find(reminder_id)
                    .filter(reminder_fields::user_id.eq(user_id)),
            )
            .execute(&mut conn)?;

            Ok(affected_row_count > 0)
        })
        .await??;

        Ok(deleted)
    }

    async fn count_active_reminders(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let pool = self.db_thread_pool.clone();

        let count = tokio::task::spawn_blocking(move || -> Result<i64, StoreError> {
            let mut conn = pool.get()?;
            let count = reminders
                .filter(reminder_fields::user_id.eq(user_id))
                .filter(reminder_fields::is_active.eq(true))
                .count()
                .get_result::<i64>(&mut conn)?;

            Ok(count)
        })
        .await??;

        Ok(count)
    }

    async fn create_payment(&self, payment: NewPaymentRecord) -> Result<Uuid, StoreError> {
        let pool = self.db_thread_pool.clone();

        let payment_id = tokio::task::spawn_blocking(move || -> Result<Uuid, StoreError> {
            let current_time = Utc::now();
            let new_payment = NewPayment {
                id: Uuid::new_v4(),
                user_id: payment.user_id,
                amount: payment.amount,
                period_days: payment.period_days,
                status: PaymentStatus::Pending.as_str(),
                gateway_ref: None,
                created_timestamp: current_time,
                modified_timestamp: current_time,
            };

            let mut conn = pool.get()?;
            let payment_id = dsl::insert_into(payments)
                .values(&new_payment)
                .returning(payment_fields::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(payment_id)
        })
        .await??;

        Ok(payment_id)
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, StoreError> {
        let pool = self.db_thread_pool.clone();

        let record = tokio::task::spawn_blocking(move || -> Result<Option<PaymentRecord>, StoreError> {
            let mut conn = pool.get()?;
            let row = payments
                .find(payment_id)
                .first::<Payment>(&mut conn)
                .optional()?;

            row.map(payment_record).transpose()
        })
        .await??;

        Ok(record)
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        gateway_ref: Option<&str>,
    ) -> Result<Option<StatusTransition>, StoreError> {
        let pool = self.db_thread_pool.clone();
        let gateway_ref = gateway_ref.map(String::from);

        let transition = tokio::task::spawn_blocking(move || -> Result<Option<StatusTransition>, StoreError> {
            let mut conn = pool.get()?;

            conn.build_transaction().run::<_, StoreError, _>(|conn| {
                let row = payments
                    .find(payment_id)
                    .first::<Payment>(conn)
                    .optional()?;

                let Some(row) = row else {
                    return Ok(None);
                };

                let previous = PaymentStatus::try_from(row.status.as_str())?;

                dsl::update(payments.find(payment_id))
                    .set((
                        payment_fields::status.eq(status.as_str()),
                        payment_fields::gateway_ref.eq(gateway_ref.as_deref()),
                        payment_fields::modified_timestamp.eq(Utc::now()),
                    ))
                    .execute(conn)?;

                let mut payment = payment_record(row)?;
                payment.status = status;
                payment.gateway_ref = gateway_ref.clone();

                Ok(Some(StatusTransition { previous, payment }))
            })
        })
        .await??;

        Ok(transition)
    }

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let pool = self.db_thread_pool.clone();

        let records = tokio::task::spawn_blocking(move || -> Result<Vec<PaymentRecord>, StoreError> {
            let mut conn = pool.get()?;
            let rows = payments
                .filter(payment_fields::status.eq(status.as_str()))
                .order(payment_fields::created_timestamp.asc())
                .load::<Payment>(&mut conn)?;

            rows.into_iter().map(payment_record).collect()
        })
        .await??;

        Ok(records)
    }

    async fn find_reminders_due(&self, date: NaiveDate) -> Result<Vec<DueReminder>, StoreError> {
        let pool = self.db_thread_pool.clone();

        let due = tokio::task::spawn_blocking(move || -> Result<Vec<DueReminder>, StoreError> {
            let mut conn = pool.get()?;
            let rows = reminders
                .inner_join(users)
                .filter(reminder_fields::pay_date.eq(date))
                .filter(reminder_fields::is_active.eq(true))
                .load::<(Reminder, User)>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|(reminder, user)| DueReminder {
                    reminder: reminder_record(reminder),
                    user: user_record(user),
                })
                .collect())
        })
        .await??;

        Ok(due)
    }

    async fn get_job_last_run(
        &self,
        job_name: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let pool = self.db_thread_pool.clone();
        let job_name = String::from(job_name);

        let last_run = tokio::task::spawn_blocking(move || -> Result<Option<DateTime<Utc>>, StoreError> {
            let mut conn = pool.get()?;
            let last_run = job_registry
                .find(job_name)
                .select(job_registry_fields::last_run_timestamp)
                .first::<DateTime<Utc>>(&mut conn)
                .optional()?;

            Ok(last_run)
        })
        .await??;

        Ok(last_run)
    }

    async fn set_job_last_run(
        &self,
        job_name: &str,
        time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let pool = self.db_thread_pool.clone();
        let job_name = String::from(job_name);

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let new_item = NewJobRegistryItem {
                job_name: &job_name,
                last_run_timestamp: time,
            };

            let mut conn = pool.get()?;
            dsl::insert_into(job_registry)
                .values(&new_item)
                .on_conflict(job_registry_fields::job_name)
                .do_update()
                .set(job_registry_fields::last_run_timestamp.eq(time))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??;

        Ok(())
    }
}
