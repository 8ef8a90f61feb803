use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::sync::RwLock;

#[derive(Debug, Deserialize, Serialize)]
pub struct Conf {
    pub connections: Connections,
    pub telegram: TelegramConf,
    pub runner: RunnerConf,
    pub send_due_reminders_job: SendDueRemindersJobConf,
    pub clear_expired_premium_job: ClearExpiredPremiumJobConf,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Connections {
    pub database_uri: String,
    pub max_db_connections: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TelegramConf {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RunnerConf {
    pub update_frequency_secs: u64,
    pub worker_threads: Option<usize>,
    pub max_blocking_threads: Option<usize>,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SendDueRemindersJobConf {
    pub job_frequency_secs: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClearExpiredPremiumJobConf {
    pub job_frequency_secs: u64,
}

lazy_static! {
    static ref CONF_FILE_PATH: RwLock<String> = RwLock::new(String::from("conf/jobs-conf.toml"));
    pub static ref CONF: Conf = build_conf();
}

fn build_conf() -> Conf {
    let conf_file_path = CONF_FILE_PATH.read().expect("Lock was poisoned");

    let mut conf_file = File::open::<&str>(conf_file_path.as_ref()).unwrap_or_else(|_| {
        eprintln!("ERROR: Expected configuration file at '{conf_file_path}'");
        std::process::exit(1);
    });

    let mut contents = String::new();
    conf_file.read_to_string(&mut contents).unwrap_or_else(|_| {
        eprintln!(
            "ERROR: Configuration file at '{conf_file_path}' should be a text file in the TOML format."
        );
        std::process::exit(1);
    });

    match toml::from_str::<Conf>(&contents) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ERROR: Parsing '{conf_file_path}' failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn initialize(conf_file_path: &str) {
    *CONF_FILE_PATH.write().expect("Lock was poisoned") = String::from(conf_file_path);

    // Forego lazy initialization in order to validate conf file
    lazy_static::initialize(&crate::env::CONF);
}
