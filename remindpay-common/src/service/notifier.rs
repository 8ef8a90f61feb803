use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use crate::messenger::SendMessage;
use crate::service::subscription::SubscriptionManager;
use crate::store::{DueReminder, Store};

pub const STANDARD_LOOKAHEAD_DAYS: i64 = 1;
pub const PREMIUM_LOOKAHEAD_DAYS: [i64; 2] = [3, 7];

const UPSELL_HINT: &str = "Premium members also get heads-up 3 and 7 days ahead.";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SweepSummary {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Daily sweep that decides which reminders fire for which users and
/// dispatches the messages. The one-day tier goes to everyone; the three and
/// seven day tiers only to users whose premium is active at selection time.
#[derive(Clone)]
pub struct NotificationSelector {
    store: Arc<dyn Store>,
    subscriptions: SubscriptionManager,
    messenger: Arc<dyn SendMessage>,
}

impl NotificationSelector {
    pub fn new(
        store: Arc<dyn Store>,
        subscriptions: SubscriptionManager,
        messenger: Arc<dyn SendMessage>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            messenger,
        }
    }

    /// Runs one sweep for `today`. Individual send failures are logged and
    /// skipped; one bad chat id never aborts the batch.
    pub async fn run(&self, today: NaiveDate) -> SweepSummary {
        let mut summary = SweepSummary::default();

        self.run_tier(today, STANDARD_LOOKAHEAD_DAYS, false, &mut summary)
            .await;

        for days_ahead in PREMIUM_LOOKAHEAD_DAYS {
            self.run_tier(today, days_ahead, true, &mut summary).await;
        }

        summary
    }

    async fn run_tier(
        &self,
        today: NaiveDate,
        days_ahead: i64,
        premium_only: bool,
        summary: &mut SweepSummary,
    ) {
        let target_date = today + Duration::days(days_ahead);

        let due = match self.store.find_reminders_due(target_date).await {
            Ok(due) => due,
            Err(e) => {
                log::error!("Failed to fetch reminders due {target_date}: {e}");
                return;
            }
        };

        for item in due {
            // Premium is checked per reminder at selection time so the lazy
            // expiry write-back applies before the message variant is chosen.
            let has_premium = self
                .subscriptions
                .get_status(item.user.id)
                .await
                .has_active_premium;

            if premium_only && !has_premium {
                continue;
            }

            summary.selected += 1;

            let text = notification_text(&item, days_ahead, has_premium);

            match self.messenger.send(item.user.chat_id, &text).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    log::error!(
                        "Failed to notify chat {} about reminder {}: {e}",
                        item.user.chat_id,
                        item.reminder.id
                    );
                    summary.failed += 1;
                }
            }
        }
    }
}

fn notification_text(item: &DueReminder, days_ahead: i64, has_premium: bool) -> String {
    let when = if days_ahead == 1 {
        String::from("tomorrow")
    } else {
        format!("in {days_ahead} days")
    };

    let mut text = format!(
        "Upcoming payment: {} ({}) is due {when}, on {}.",
        item.reminder.title, item.reminder.amount, item.reminder.pay_date
    );

    if !has_premium {
        text.push(' ');
        text.push_str(UPSELL_HINT);
    }

    text
}
