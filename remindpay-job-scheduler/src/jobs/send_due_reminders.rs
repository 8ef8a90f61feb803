use remindpay_common::service::notifier::NotificationSelector;

use async_trait::async_trait;
use chrono::Utc;

use crate::jobs::{Job, JobError};

pub struct SendDueRemindersJob {
    selector: NotificationSelector,
    is_running: bool,
}

impl SendDueRemindersJob {
    pub fn new(selector: NotificationSelector) -> Self {
        Self {
            selector,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for SendDueRemindersJob {
    fn name(&self) -> &'static str {
        "Send Due Reminders"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let today = Utc::now().date_naive();
        let summary = self.selector.run(today).await;

        log::info!(
            "Reminder sweep for {today}: {} selected, {} sent, {} failed",
            summary.selected,
            summary.sent,
            summary.failed
        );

        self.is_running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use remindpay_common::messenger::senders::MockSender;
    use remindpay_common::messenger::SendMessage;
    use remindpay_common::service::subscription::SubscriptionManager;
    use remindpay_common::store::{MemoryStore, NewReminderRecord, Store, UserProfile};

    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn execute_dispatches_due_reminders() {
        let store = MemoryStore::new();
        let sender = Arc::new(MockSender::new());

        let user_id = store
            .get_or_create_user(42, &UserProfile::default())
            .await
            .unwrap();
        store
            .create_reminder(NewReminderRecord {
                user_id,
                title: String::from("Rent"),
                amount: dec!(500.00),
                pay_date: (Utc::now() + Duration::days(1)).date_naive(),
                recurrence: String::from("once"),
            })
            .await
            .unwrap();

        let shared: Arc<dyn Store> = Arc::new(store);
        let selector = NotificationSelector::new(
            Arc::clone(&shared),
            SubscriptionManager::new(shared),
            Arc::clone(&sender) as Arc<dyn SendMessage>,
        );

        let mut job = SendDueRemindersJob::new(selector);
        job.execute().await.unwrap();

        assert_eq!(sender.sent_to(42).len(), 1);
    }
}
