//! # API Configuration
//!
//! Configuration management for the API server.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SALEDESK_PORT=9000                                                 │
//! │     SALEDESK_EVENT_PUBLISHER=webhook                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $SALEDESK_CONFIG, or                                               │
//! │     ~/.config/saledesk/saledesk.toml (Linux)                           │
//! │     ~/Library/Application Support/com.saledesk.saledesk/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # saledesk.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/saledesk/saledesk.db"
//! max_connections = 5
//!
//! [events]
//! publisher = "webhook"   # log | webhook | none
//! webhook_url = "https://hooks.example.com/sales"
//! poll_interval_ms = 5000
//! batch_size = 100
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use saledesk_events::{EventPublisher, LogPublisher, RelaySettings, WebhookPublisher};

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine a data directory; set SALEDESK_DB_PATH")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Publisher Kind
// =============================================================================

/// Where the relay delivers lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    /// One log line per event.
    #[default]
    Log,

    /// HTTP POST to `events.webhook_url`.
    Webhook,

    /// Relay disabled. Events pile up in the outbox.
    None,
}

impl std::fmt::Display for PublisherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublisherKind::Log => write!(f, "log"),
            PublisherKind::Webhook => write!(f, "webhook"),
            PublisherKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for PublisherKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(PublisherKind::Log),
            "webhook" | "http" => Ok(PublisherKind::Webhook),
            "none" | "off" | "disabled" => Ok(PublisherKind::None),
            other => Err(ConfigError::InvalidValue {
                key: "events.publisher".into(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `saledesk.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Event relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    #[serde(default)]
    pub publisher: PublisherKind,

    /// Required when `publisher = "webhook"`.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Days to keep published entries. Unset keeps them forever.
    #[serde(default = "default_retention_days")]
    pub retention_days: Option<i64>,
}

fn default_webhook_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    5000
}
fn default_batch_size() -> i64 {
    100
}
fn default_max_attempts() -> i64 {
    10
}
fn default_retention_days() -> Option<i64> {
    Some(7)
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            publisher: PublisherKind::default(),
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout(),
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retention_days: default_retention_days(),
        }
    }
}

impl EventSettings {
    /// Relay tuning derived from these settings.
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            batch_size: self.batch_size,
            max_attempts: self.max_attempts,
            retention_days: self.retention_days,
            ..RelaySettings::default()
        }
    }

    /// Builds the configured publisher, or `None` when the relay is disabled.
    pub fn build_publisher(&self) -> ConfigResult<Option<Arc<dyn EventPublisher>>> {
        match self.publisher {
            PublisherKind::None => Ok(None),
            PublisherKind::Log => Ok(Some(Arc::new(LogPublisher))),
            PublisherKind::Webhook => {
                let url = self
                    .webhook_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("webhook publisher needs events.webhook_url".into()))?;
                let publisher =
                    WebhookPublisher::new(url, Duration::from_secs(self.webhook_timeout_secs))
                        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                Ok(Some(Arc::new(publisher)))
            }
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub events: EventSettings,
}

impl ApiConfig {
    /// Builds the effective configuration.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (saledesk.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "No config file, using built-in defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Rejects values the server cannot start with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.events.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "events.poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.events.batch_size <= 0 {
            return Err(ConfigError::Invalid(
                "events.batch_size must be greater than 0".into(),
            ));
        }

        if self.events.max_attempts <= 0 {
            return Err(ConfigError::Invalid(
                "events.max_attempts must be greater than 0".into(),
            ));
        }

        if self.events.publisher == PublisherKind::Webhook {
            match self.events.webhook_url.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(ConfigError::Invalid(format!(
                        "Webhook URL must start with http:// or https://, got: {}",
                        url
                    )))
                }
                None => {
                    return Err(ConfigError::Invalid(
                        "events.webhook_url is required for the webhook publisher".into(),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Applies `SALEDESK_*` overrides read through `lookup`.
    ///
    /// Takes the lookup as a function so tests don't touch the process
    /// environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SALEDESK_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("SALEDESK_PORT") {
            debug!(port = %port, "Overriding port from environment");
            self.server.port = parse_var("SALEDESK_PORT", &port)?;
        }

        if let Some(path) = lookup("SALEDESK_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("SALEDESK_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("SALEDESK_DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(kind) = lookup("SALEDESK_EVENT_PUBLISHER") {
            debug!(publisher = %kind, "Overriding event publisher from environment");
            self.events.publisher = kind.parse()?;
        }

        if let Some(url) = lookup("SALEDESK_WEBHOOK_URL") {
            self.events.webhook_url = Some(url);
        }

        if let Some(ms) = lookup("SALEDESK_RELAY_POLL_MS") {
            self.events.poll_interval_ms = parse_var("SALEDESK_RELAY_POLL_MS", &ms)?;
        }

        if let Some(size) = lookup("SALEDESK_RELAY_BATCH_SIZE") {
            self.events.batch_size = parse_var("SALEDESK_RELAY_BATCH_SIZE", &size)?;
        }

        if let Some(max) = lookup("SALEDESK_RELAY_MAX_ATTEMPTS") {
            self.events.max_attempts = parse_var("SALEDESK_RELAY_MAX_ATTEMPTS", &max)?;
        }

        Ok(())
    }

    /// Resolves the database file, creating its directory if needed.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => directories::ProjectDirs::from("com", "saledesk", "saledesk")
                .ok_or(ConfigError::NoDataDir)?
                .data_dir()
                .join("saledesk.db"),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(path)
    }

    /// `saledesk.toml` in the platform config directory.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "saledesk", "saledesk")
            .map(|dirs| dirs.config_dir().join("saledesk.toml"))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
