//! TOML Configuration File Support
//!
//! Client configuration loaded from `$XDG_CONFIG_HOME/chat-term/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! url = "http://127.0.0.1:8000"
//! connect_timeout_ms = 10000
//!
//! [client]
//! state_dir = "/home/me/.local/state/chat-term"
//! tick_interval_ms = 1000
//!
//! [render]
//! format = "terminal"
//! max_markdown_bytes = 1048576
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `CHAT_SERVER_URL` | `server.url` |
//! | `CHAT_CONNECT_TIMEOUT_MS` | `server.connect_timeout_ms` |
//! | `CHAT_STATE_DIR` | `client.state_dir` |
//! | `CHAT_RENDER_FORMAT` | `render.format` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::DEFAULT_SERVER_URL;
use crate::render::{RenderFormat, DEFAULT_MAX_MARKDOWN_BYTES};
use crate::ticker::DEFAULT_TICK_INTERVAL;

/// Default connect timeout in milliseconds (0 disables it)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Environment variable for the server URL
pub const ENV_SERVER_URL: &str = "CHAT_SERVER_URL";
/// Environment variable for the connect timeout
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CHAT_CONNECT_TIMEOUT_MS";
/// Environment variable for the state directory
pub const ENV_STATE_DIR: &str = "CHAT_STATE_DIR";
/// Environment variable for the render format
pub const ENV_RENDER_FORMAT: &str = "CHAT_RENDER_FORMAT";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[server]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Base URL of the chat server
    pub url: Option<String>,

    /// Connection timeout in milliseconds (0 = none)
    pub connect_timeout_ms: Option<u64>,
}

/// `[client]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Directory holding the client state file
    pub state_dir: Option<PathBuf>,

    /// Thinking ticker period in milliseconds
    pub tick_interval_ms: Option<u64>,
}

/// `[render]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderToml {
    /// Output format for assistant replies
    pub format: Option<RenderFormat>,

    /// Size ceiling for markdown interpretation
    pub max_markdown_bytes: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Server section
    pub server: ServerToml,

    /// Client section
    pub client: ClientToml,

    /// Render section
    pub render: RenderToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the chat server
    pub server_url: String,

    /// Connection timeout in milliseconds (0 = none)
    pub connect_timeout_ms: u64,

    /// Directory holding the client state file
    pub state_dir: PathBuf,

    /// Thinking ticker period in milliseconds
    pub tick_interval_ms: u64,

    /// Output format for assistant replies
    pub render_format: RenderFormat,

    /// Size ceiling for markdown interpretation
    pub max_markdown_bytes: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority source that contributed a value
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            state_dir: default_state_dir(),
            tick_interval_ms: u64::try_from(DEFAULT_TICK_INTERVAL.as_millis()).unwrap_or(u64::MAX),
            render_format: RenderFormat::Terminal,
            max_markdown_bytes: DEFAULT_MAX_MARKDOWN_BYTES,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Connect timeout, if enabled
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    /// Thinking ticker period
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "server url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_markdown_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_markdown_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chat-term/config.toml` or
/// `~/.config/chat-term/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chat-term").join("config.toml"))
}

/// Default directory for the client state file
#[must_use]
pub fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map_or_else(|| PathBuf::from(".chat-term"), |p| p.join("chat-term"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(config_path) = path {
        match read_config_file(&config_path)? {
            Some(toml_content) => {
                let toml_config: ChatToml = toml::from_str(&toml_content)?;
                apply_toml_config(&mut config, &toml_config);
                tracing::info!(
                    path = %config_path.display(),
                    "Loaded configuration from file"
                );
                config.config_file_path = Some(config_path);
                config.source = ConfigSource::File;
            }
            None => {
                tracing::debug!(
                    path = %config_path.display(),
                    "Config file not found, using defaults"
                );
            }
        }
    }

    apply_env_config(&mut config, env);
    Ok(config)
}

/// Read the file, `None` if it does not exist (runs before the runtime starts)
fn read_config_file(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ChatToml) {
    if let Some(ref url) = toml.server.url {
        config.server_url.clone_from(url);
    }
    if let Some(timeout) = toml.server.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }

    if let Some(ref dir) = toml.client.state_dir {
        config.state_dir.clone_from(dir);
    }
    if let Some(interval) = toml.client.tick_interval_ms {
        config.tick_interval_ms = interval;
    }

    if let Some(format) = toml.render.format {
        config.render_format = format;
    }
    if let Some(max) = toml.render.max_markdown_bytes {
        config.max_markdown_bytes = max;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_SERVER_URL) {
        config.server_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env(ENV_CONNECT_TIMEOUT_MS) {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.connect_timeout_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid {}", ENV_CONNECT_TIMEOUT_MS),
        }
    }
    if let Some(dir) = env(ENV_STATE_DIR) {
        config.state_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Some(format) = env(ENV_RENDER_FORMAT) {
        match format.parse::<RenderFormat>() {
            Ok(format) => {
                config.render_format = format;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid {}", ENV_RENDER_FORMAT),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Server URL override
    pub server_url: Option<String>,

    /// State directory override
    pub state_dir: Option<PathBuf>,

    /// Render format override
    pub render_format: Option<RenderFormat>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL override
    #[must_use]
    pub fn with_server_url(mut self, url: String) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set state directory override
    #[must_use]
    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.state_dir = Some(dir);
        self
    }

    /// Set render format override
    #[must_use]
    pub fn with_render_format(mut self, format: RenderFormat) -> Self {
        self.render_format = Some(format);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.server_url.is_some() || self.state_dir.is_some() || self.render_format.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.server_url {
            config.server_url.clone_from(url);
        }
        if let Some(ref dir) = self.state_dir {
            config.state_dir.clone_from(dir);
        }
        if let Some(format) = self.render_format {
            config.render_format = format;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
