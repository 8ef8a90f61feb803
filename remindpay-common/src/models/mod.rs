pub mod job_registry_item;
pub mod payment;
pub mod reminder;
pub mod user;
