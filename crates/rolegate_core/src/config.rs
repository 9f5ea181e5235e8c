//! Configuration for Rolegate.
//!
//! Loaded from an optional TOML file, then overridden by environment variables
//! so secrets can stay out of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RolegateConfig {
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    pub auth: AuthConfig,
    pub oracle: OracleConfig,
    pub schedule: ScheduleConfig,
}

/// Database configuration for SQLite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rolegate")
                .join("rolegate.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through `DISCORD_TOKEN`.
    pub token: Option<String>,
}

/// Login flow and HTTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public base URL the wallet calls back (`AUTH_URL`).
    pub public_url: String,
    /// Socket address the HTTP endpoints listen on.
    pub bind: String,
    /// Wallet sign-in page the login link points at.
    pub signin_url: String,
    /// Pending logins older than this are swept.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:8080".to_string(),
            bind: "0.0.0.0:8080".to_string(),
            signin_url: "https://app.idena.io/dna/signin".to_string(),
            session_ttl_secs: 60 * 60,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Identity status oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Node JSON-RPC endpoint tried first. Skipped when unset.
    pub rpc_url: Option<String>,
    /// Shared key sent with RPC calls.
    pub rpc_key: Option<String>,
    /// Public indexer used when the node lookup fails.
    pub fallback_url: String,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            rpc_key: None,
            fallback_url: "https://api.idena.io".to_string(),
            cache_ttl_secs: 5 * 60,
            timeout_secs: 10,
        }
    }
}

impl OracleConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local hour of the daily full reconciliation.
    pub daily_hour: u32,
    pub daily_minute: u32,
    /// Period of the stale-session sweep and presence update.
    pub maintenance_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_hour: 15,
            daily_minute: 45,
            maintenance_interval_secs: 60 * 60,
        }
    }
}

impl ScheduleConfig {
    pub fn daily_time(&self) -> ConfigResult<NaiveTime> {
        NaiveTime::from_hms_opt(self.daily_hour, self.daily_minute, 0).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "schedule.daily_hour/daily_minute".to_string(),
                reason: format!("{}:{} is not a time of day", self.daily_hour, self.daily_minute),
            }
        })
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs.max(1))
    }
}

impl RolegateConfig {
    /// Load configuration from `path` (if given and present), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                Self::from_toml_str(&content)?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DISCORD_TOKEN` -> discord.token
    /// - `AUTH_URL` -> auth.public_url
    /// - `ROLEGATE_BIND` -> auth.bind
    /// - `ROLEGATE_DB_PATH` -> database.path
    /// - `IDENA_RPC_URL` -> oracle.rpc_url
    /// - `IDENA_RPC_KEY` -> oracle.rpc_key
    /// - `IDENA_API_URL` -> oracle.fallback_url
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.token = Some(token);
        }
        if let Some(url) = lookup("AUTH_URL") {
            self.auth.public_url = url;
        }
        if let Some(bind) = lookup("ROLEGATE_BIND") {
            self.auth.bind = bind;
        }
        if let Some(path) = lookup("ROLEGATE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(url) = lookup("IDENA_RPC_URL") {
            self.oracle.rpc_url = Some(url);
        }
        if let Some(key) = lookup("IDENA_RPC_KEY") {
            self.oracle.rpc_key = Some(key);
        }
        if let Some(url) = lookup("IDENA_API_URL") {
            self.oracle.fallback_url = url;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.schedule.daily_time()?;

        url::Url::parse(&self.auth.public_url).map_err(|e| ConfigError::InvalidValue {
            field: "auth.public_url".to_string(),
            reason: e.to_string(),
        })?;

        self.auth
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "auth.bind".to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    /// The bot token, or an error naming how to provide it.
    pub fn discord_token(&self) -> ConfigResult<&str> {
        self.discord
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("discord.token (or DISCORD_TOKEN)".to_string()))
    }
}
