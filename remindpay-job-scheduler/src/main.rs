#[macro_use]
extern crate lazy_static;

use remindpay_common::messenger::senders::TelegramSender;
use remindpay_common::messenger::SendMessage;
use remindpay_common::service::notifier::NotificationSelector;
use remindpay_common::service::subscription::SubscriptionManager;
use remindpay_common::store::{create_db_thread_pool, PostgresStore, Store};

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;
use std::time::Duration;

mod env;
mod jobs;
mod runner;

use jobs::{ClearExpiredPremiumJob, SendDueRemindersJob};
use runner::JobRunner;

fn main() {
    env::initialize("conf/jobs-conf.toml");

    let db_thread_pool = create_db_thread_pool(
        &env::CONF.connections.database_uri,
        env::CONF.connections.max_db_connections,
    )
    .unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to create database connection pool: {e}");
        std::process::exit(1);
    });

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.runner.worker_threads.unwrap_or_else(num_cpus::get))
        .max_blocking_threads(
            env::CONF
                .runner
                .max_blocking_threads
                .unwrap_or_else(|| num_cpus::get() * 2),
        )
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.runner.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            let store: Arc<dyn Store> = Arc::new(PostgresStore::new(&db_thread_pool));
            let messenger: Arc<dyn SendMessage> =
                Arc::new(TelegramSender::new(&env::CONF.telegram.bot_token));

            let selector = NotificationSelector::new(
                Arc::clone(&store),
                SubscriptionManager::new(Arc::clone(&store)),
                messenger,
            );

            let mut job_runner = JobRunner::new(
                Duration::from_secs(env::CONF.runner.update_frequency_secs),
                Arc::clone(&store),
            );

            job_runner
                .register(
                    Box::new(SendDueRemindersJob::new(selector)),
                    Duration::from_secs(env::CONF.send_due_reminders_job.job_frequency_secs),
                )
                .await;

            job_runner
                .register(
                    Box::new(ClearExpiredPremiumJob::new(Arc::clone(&store))),
                    Duration::from_secs(env::CONF.clear_expired_premium_job.job_frequency_secs),
                )
                .await;

            job_runner.start().await;
        });
}
