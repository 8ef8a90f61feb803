use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::sync::RwLock;

#[derive(Debug, Deserialize, Serialize)]
pub struct Conf {
    pub db: DbConf,
    pub workers: WorkersConf,
    pub keys: KeysConf,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DbConf {
    pub database_uri: String,
    pub max_db_connections: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WorkersConf {
    pub actix_workers: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct KeysConf {
    pub admin_api_key: String,
    pub health_endpoint_key: String,
}

lazy_static! {
    static ref CONF_FILE_PATH: RwLock<String> = RwLock::new(String::from("conf/server-conf.toml"));
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
