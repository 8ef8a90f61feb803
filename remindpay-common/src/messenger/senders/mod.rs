mod mock_sender;
mod telegram;

pub use mock_sender::MockSender;
pub use telegram::TelegramSender;
