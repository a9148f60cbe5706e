mod config;
pub mod database;

pub use config::{Config, ScheduleConfig, SoundConfig, WeatherConfig};
pub use database::{ArmedDelivery, Database, PrefetchJob};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory.
///
/// `WAKECAST_HOME` overrides the location entirely. Otherwise this is
/// `~/.config/wakecast[-dev]/`, with the `-dev` suffix when
/// `WAKECAST_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WAKECAST_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WAKECAST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wakecast-dev")
            } else {
                base_dir.join("wakecast")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
