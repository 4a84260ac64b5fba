//!
//! Documentation of the config module.
//! Sets up the 'config' and 'logger'.
//!

extern crate confy;

use serde::{Serialize, Deserialize};
use std::default::Default;
use std::str::FromStr;
use std::time::Duration;

/// Configuration file, written with defaults on first run
pub const CONFIG_PATH: &str = "rideshare.toml";

/// The persistence backend selected at startup
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfyConfig {
    pub print_log: bool,
    pub log_file: String,
    pub log_level: String,
    pub database: String,
    pub database_ip: String,
    /// Seconds before a store call gives up
    pub timeout: u64,
    pub store_backend: StoreBackend,
}

///Config check
impl Default for ConfyConfig {
    fn default() -> Self {
        ConfyConfig {
            print_log: false,
            log_file: "output.log".to_string(),
            log_level: "debug".to_string(),
            database: "rideshare".to_string(),
            database_ip: "mongodb://localhost:27017/".to_string(),
            timeout: 2,
            store_backend: StoreBackend::Mongodb,
        }
    }
}

impl ConfyConfig {
    /// The store deadline as a `Duration`
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The configured level, falling back to `Debug` on an unknown name
    pub fn level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.log_level).unwrap_or(log::LevelFilter::Debug)
    }
}

/// Initialize config and load
pub async fn init() -> Result<ConfyConfig, confy::ConfyError> {
    confy::load_path(CONFIG_PATH)
}

/// Sets up logger
pub async fn setup_logger(file: &ConfyConfig) -> Result<(), fern::InitError> {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(file.level_filter())
        .chain(fern::log_file(&file.log_file)?);

    if file.print_log {
        dispatch.chain(std::io::stdout()).apply()?;
    }
    else {
        dispatch.apply()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_mongodb() {
        let config = ConfyConfig::default();
        assert_eq!(config.store_backend, StoreBackend::Mongodb);
        assert_eq!(config.store_timeout(), Duration::from_secs(2));
        assert_eq!(config.database, "rideshare");
    }

    #[test]
    fn unknown_log_level_falls_back_to_debug() {
        let config = ConfyConfig { log_level: "chatty".to_string(), ..ConfyConfig::default() };
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);

        let config = ConfyConfig { log_level: "warn".to_string(), ..ConfyConfig::default() };
        assert_eq!(config.level_filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn backend_names_are_lowercase() {
        let toml = serde_json::to_string(&StoreBackend::Memory).unwrap();
        assert_eq!(toml, "\"memory\"");
    }
}
