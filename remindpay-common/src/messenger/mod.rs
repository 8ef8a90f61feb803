use async_trait::async_trait;
use std::fmt;

pub mod senders;

#[derive(Debug)]
pub enum MessengerError {
    Transport(String),
    Api(String),
}

impl std::error::Error for MessengerError {}

impl fmt::Display for MessengerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessengerError::Transport(e) => {
                write!(f, "MessengerError: Failed to reach messenger: {e}")
            }
            MessengerError::Api(e) => {
                write!(f, "MessengerError: Messenger rejected message: {e}")
            }
        }
    }
}

/// Fire-and-forget delivery to a chat. Failures are non-fatal to callers;
/// the notification sweep logs them and moves on.
#[async_trait]
pub trait SendMessage: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError>;
}
