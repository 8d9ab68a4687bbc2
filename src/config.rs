//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use uuid::Uuid;

use crate::aggregate::BurnPolicy;
use crate::domain::Balance;

/// Account ID used when `LEDGER_ACCOUNT_ID` is not set
pub const DEFAULT_ACCOUNT_ID: &str = "00000000-0000-0000-0000-00000000a001";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Event stream ID of the ledger account
    pub account_id: Uuid,

    /// Owner bound when the account has to be created
    pub owner_id: Option<Uuid>,

    /// Balance the account starts with when created
    pub initial_balance: Balance,

    /// Who may burn
    pub burn_policy: BurnPolicy,

    /// Buffer size of the in-process event broadcast
    pub event_channel_capacity: usize,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let account_id = lookup("LEDGER_ACCOUNT_ID")
            .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_ACCOUNT_ID"))?;

        let owner_id = lookup("LEDGER_OWNER_ID")
            .map(|v| v.parse::<Uuid>())
            .transpose()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_OWNER_ID"))?;

        let initial_balance = lookup("LEDGER_INITIAL_BALANCE")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_INITIAL_BALANCE"))?;

        let burn_policy = lookup("BURN_POLICY")
            .unwrap_or_else(|| "unrestricted".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BURN_POLICY"))?;

        let event_channel_capacity = lookup("EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|| "256".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENT_CHANNEL_CAPACITY"))?;

        let log_json = lookup("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            account_id,
            owner_id,
            initial_balance,
            burn_policy,
            event_channel_capacity,
            log_json,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Owner to bind at creation; required only when the account does not exist yet
    pub fn require_owner(&self) -> Result<Uuid, ConfigError> {
        self.owner_id.ok_or(ConfigError::MissingEnv("LEDGER_OWNER_ID"))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
