use remindpay_common::store::Store;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::jobs::{Job, JobError};

/// Batch counterpart to the lazy per-user expiry check. Reconciles users who
/// lapsed without ever being read.
pub struct ClearExpiredPremiumJob {
    store: Arc<dyn Store>,
    is_running: bool,
}

impl ClearExpiredPremiumJob {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredPremiumJob {
    fn name(&self) -> &'static str {
        "Clear Expired Premium"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let cleared = self.store.clear_expired_premium(Utc::now()).await?;

        if cleared > 0 {
            log::info!("Cleared expired premium for {cleared} users");
        }

        self.is_running = false;
        Ok(())
    }
}
