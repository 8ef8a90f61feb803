use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Identifiable, Insertable, Queryable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::reminders;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = reminders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub pay_date: NaiveDate,
    pub recurrence: String,
    pub is_active: bool,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reminders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReminder<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: &'a str,
    pub amount: Decimal,
    pub pay_date: NaiveDate,
    pub recurrence: &'a str,
    pub is_active: bool,
    pub created_timestamp: DateTime<Utc>,
}
