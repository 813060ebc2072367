mod config;
pub mod database;
pub mod gateway;
pub mod kv;

pub use config::{Config, CountdownConfig, DisplayConfig, LoggingConfig, StorageConfig};
pub use database::Database;
pub use gateway::{PersistenceGateway, HISTORY_KEY, TIMERS_KEY};
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `TIMERDECK_HOME` overrides the location outright. Otherwise it is
/// `~/.config/timerdeck[-dev]/`, with `-dev` chosen by `TIMERDECK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("TIMERDECK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TIMERDECK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("timerdeck-dev")
            } else {
                base_dir.join("timerdeck")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
