use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};

use crate::schema::job_registry;

#[derive(Clone, Debug, Queryable)]
#[diesel(table_name = job_registry)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRegistryItem {
    pub job_name: String,
    pub last_run_timestamp: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_registry)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewJobRegistryItem<'a> {
    pub job_name: &'a str,
    pub last_run_timestamp: DateTime<Utc>,
}
