mod clear_expired_premium;
mod send_due_reminders;

pub use clear_expired_premium::ClearExpiredPremiumJob;
pub use send_due_reminders::SendDueRemindersJob;

use remindpay_common::store::StoreError;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug)]
pub enum JobError {
    StoreFailure(StoreError),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::StoreFailure(e) => {
                write!(f, "JobError: {e}")
            }
        }
    }
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        JobError::StoreFailure(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new() -> Self {
            Self {
                runs: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn is_ready(&self) -> bool {
            true
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            *self.runs.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn mock_job_counts_executions() {
        let mut job = MockJob::new();
        let run_count = Arc::clone(&job.runs);
        assert_eq!(*run_count.lock().unwrap(), 0);

        job.execute().await.unwrap();
        job.execute().await.unwrap();

        assert_eq!(*run_count.lock().unwrap(), 2);
    }
}
