use remindpay_common::store::Store;

use chrono::{DateTime, Utc};
use futures::future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: DateTime<Utc>,
}

/// Ticks every `update_frequency` and executes whichever registered jobs are
/// due. Last-run timestamps are persisted through the store so schedules
/// survive restarts.
pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    store: Arc<dyn Store>,
}

impl JobRunner {
    pub fn new(update_frequency: Duration, store: Arc<dyn Store>) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            store,
        }
    }

    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name,
            run_frequency.as_secs()
        );

        let last_run_time = self
            .store
            .get_job_last_run(job_name)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to get last run timestamp for job '{job_name}': {e}");
                None
            });

        self.jobs.push(JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or_else(Utc::now),
        });
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();
            let run_time = Utc::now();

            let mut ran_indices = Vec::with_capacity(self.jobs.len());
            let mut job_names = Vec::with_capacity(self.jobs.len());
            let mut job_futures = Vec::with_capacity(self.jobs.len());

            for (i, job_container) in self.jobs.iter_mut().enumerate() {
                let time_elapsed_since_last_run = (run_time - job_container.last_run_time)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                let is_time_to_run = time_elapsed_since_last_run >= job_container.run_frequency;

                if is_time_to_run && job_container.job.is_ready() {
                    let name = job_container.job.name();
                    log::info!("Executing job \"{name}\"");
                    ran_indices.push(i);
                    job_names.push(name);
                    job_futures.push(job_container.job.execute());
                }
            }

            let job_results = future::join_all(job_futures).await;

            for (i, result) in job_results.into_iter().enumerate() {
                if let Err(e) = result {
                    log::error!("{e}");
                } else {
                    log::info!("Job \"{}\" finished successfully", job_names[i]);
                }
            }

            for (idx, name) in ran_indices.into_iter().zip(job_names) {
                self.jobs[idx].last_run_time = run_time;

                if let Err(e) = self.store.set_job_last_run(name, run_time).await {
                    log::error!("Error recording run of job '{name}': {e}");
                }
            }

            let after = Instant::now();
            let delta = after - before;

            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }
}
