//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use gatepass_inventory::ReconciliationMode;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when STORAGE_BACKEND=postgres")]
    Missing(&'static str),
}

/// Where inventory data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "postgres" => Ok(Self::Postgres),
            _ => Err("expected one of: memory, file, postgres".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub reconciliation_mode: ReconciliationMode,
    pub seed_default_products: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?;
        let storage = parse_var("STORAGE_BACKEND", get("STORAGE_BACKEND"), "file")?;
        let reconciliation_mode =
            parse_var("RECONCILIATION_MODE", get("RECONCILIATION_MODE"), "lenient")?;
        let seed_default_products =
            parse_var("SEED_DEFAULT_PRODUCTS", get("SEED_DEFAULT_PRODUCTS"), "true")?;
        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let database_url = get("DATABASE_URL");

        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            bind_addr,
            storage,
            data_dir,
            database_url,
            reconciliation_mode,
            seed_default_products,
        })
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = raw.unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
