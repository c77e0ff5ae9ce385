//! Configuration for ses-rs
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (explicit path, or `config.toml` when present)
//! 3. environment variables prefixed `SES_`, sections split by `__`,
//!    e.g. `SES_QUOTA__MAX_SENDS=10`, `SES_IDENTITY__VERIFIED_SENDERS=a@x.com,b@x.com`

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Failure percentage used when none is configured
pub const DEFAULT_FAILURE_PERCENTAGE: u32 = 30;

const LIST_KEYS: [&str; 2] = ["sandbox.allowed_destinations", "identity.verified_senders"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub quota: QuotaConfig,
    pub limits: LimitsConfig,
    pub sandbox: SandboxConfig,
    pub identity: IdentityConfig,
    pub failure: FailureConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Deadline for a whole send, store calls included
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Only used by the sqlite backend
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "sqlite://ses.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Length of the trailing window sends are counted over
    pub tracking_hours: u64,
    /// Sends allowed within the window
    pub max_sends: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            tracking_hours: 24,
            max_sends: 200,
        }
    }
}

impl QuotaConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.tracking_hours.saturating_mul(3600))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_body_bytes: usize,
    pub max_destinations: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            max_destinations: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub enabled: bool,
    pub allowed_destinations: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_destinations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub verified_senders: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FailureConfig {
    pub enabled: bool,
    /// Chance of a synthetic failure, in percent
    pub percentage: Option<i64>,
    /// Seed for reproducible failure sequences
    pub seed: Option<u64>,
}

impl FailureConfig {
    /// Configured percentage clamped to `0..=100`, or the default when unset
    pub fn effective_percentage(&self) -> u32 {
        match self.percentage {
            Some(p) => p.clamp(0, 100) as u32,
            None => DEFAULT_FAILURE_PERCENTAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

fn env_source() -> Environment {
    let mut env = Environment::with_prefix("SES")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        env = env.with_list_parse_key(key);
    }
    env
}

impl Config {
    /// Load configuration from an optional file plus `SES_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file)
            .add_source(env_source())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.trim().is_empty() {
            return Err(ServiceError::Config("server.listen_addr is empty".to_string()));
        }
        if self.quota.tracking_hours == 0 {
            return Err(ServiceError::Config(
                "quota.tracking_hours must be at least 1".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_url.trim().is_empty()
        {
            return Err(ServiceError::Config(
                "storage.database_url is required for the sqlite backend".to_string(),
            ));
        }
        Ok(())
    }
}
