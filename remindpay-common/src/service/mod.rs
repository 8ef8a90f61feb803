pub mod notifier;
pub mod payment;
pub mod reminder;
pub mod subscription;
