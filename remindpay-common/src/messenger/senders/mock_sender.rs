use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::messenger::{MessengerError, SendMessage};

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
}

/// Records every message instead of delivering it. Chat ids registered via
/// [`MockSender::fail_for`] report a transport failure instead.
#[derive(Clone, Default)]
pub struct MockSender {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_for: Arc<Mutex<Vec<i64>>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.lock(&self.fail_for).push(chat_id);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock(&self.sent).clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.lock(&self.sent)
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SendMessage for MockSender {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError> {
        if self.lock(&self.fail_for).contains(&chat_id) {
            return Err(MessengerError::Transport(format!(
                "Mock failure for chat {chat_id}"
            )));
        }

        self.lock(&self.sent).push(SentMessage {
            chat_id,
            text: String::from(text),
        });

        Ok(())
    }
}
