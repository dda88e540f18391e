use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Default on-disk location when nothing else is configured.
pub const DEFAULT_DATABASE_PATH: &str = "data/fatura_ledger.sqlite";

/// TOML config file looked up in the working directory.
pub const CONFIG_FILE: &str = "fatura-ledger.toml";

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref)
        .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path_ref, e)))?;
    let app_config: AppConfig = toml::from_str(&contents).map_err(|e| {
        Error::Config(format!(
            "Failed to parse TOML from config file {:?}: {}",
            path_ref, e
        ))
    })?;
    Ok(app_config)
}

/// Resolves the application configuration: the `DATABASE_PATH` environment
/// variable wins, then the TOML file, then the built-in default.
pub fn load_app_configuration() -> Result<AppConfig> {
    if let Ok(path) = env::var("DATABASE_PATH") {
        tracing::debug!("Using DATABASE_PATH from environment");
        return Ok(AppConfig {
            database_path: path,
        });
    }
    if Path::new(CONFIG_FILE).exists() {
        return load_config(CONFIG_FILE);
    }
    Ok(AppConfig {
        database_path: default_database_path(),
    })
}
