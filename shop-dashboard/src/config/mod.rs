//! Configuration management for shop-dashboard
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `SHOP_` prefix, `__` for nesting)
//! 2. `./config.toml` (development)
//! 3. `~/.config/shop-dashboard/config.toml` (user config, XDG)
//! 4. `/etc/shop-dashboard/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! Environment variable format: `SHOP_SECTION__FIELD_NAME`
//! - Example: `SHOP_SERVER__PORT=8080`
//! - Example: `SHOP_STORE__BACKEND=sqlite`
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [server]
//! host = "0.0.0.0"
//! port = 3001
//! request_timeout_ms = 5000
//! cors_permissive = true
//!
//! [store]
//! backend = "sqlite"
//! url = "sqlite://shop.db"
//! max_connections = 5
//!
//! [accrual]
//! enabled = true
//!
//! [jobs]
//! completion_delay_ms = 1000
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "shop-dashboard";
const ENV_PREFIX: &str = "SHOP_";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            request_timeout_ms: 5000,
            cors_permissive: true,
        }
    }
}

impl ServerSettings {
    /// `host:port` bind address
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Which store backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory, lost on restart
    #[default]
    Memory,
    /// SQLite database file
    Sqlite,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Backend selection
    pub backend: StoreBackend,

    /// Database URL (SQLite backend only)
    pub url: String,

    /// Pool size (SQLite backend only)
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "sqlite://shop.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Accrual engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualSettings {
    /// Run the per-second accrual loop
    pub enabled: bool,
}

impl Default for AccrualSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Job lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Delay between a completion request and the job's deletion
    pub completion_delay_ms: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            completion_delay_ms: 1000,
        }
    }
}

impl JobSettings {
    /// Completion delay as Duration
    #[must_use]
    pub const fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

/// Complete shop-dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Accrual engine settings
    #[serde(default)]
    pub accrual: AccrualSettings,

    /// Job lifecycle settings
    #[serde(default)]
    pub jobs: JobSettings,
}

impl ShopConfig {
    /// Load configuration from the standard search path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file exists but cannot be parsed
    /// - A value has the wrong type
    pub fn load() -> anyhow::Result<Self> {
        let mut figment = Self::defaults()?;

        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        let user_config = Self::recommended_path();
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        let config = figment.merge(Self::env()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or a value has the
    /// wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = Self::defaults()?
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;
        Ok(config)
    }

    /// Recommended user config path: `~/.config/shop-dashboard/config.toml`
    #[must_use]
    pub fn recommended_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| config_dir.join(APP_DIR).join("config.toml"),
        )
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn defaults() -> anyhow::Result<Figment> {
        Ok(Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?)))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__").lowercase(true)
    }
}
