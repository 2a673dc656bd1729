//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig as ServerConfig;
use crate::chart::{ChartLayout, ChartOptions, JoinBy, Margin};
use crate::live::{DEFAULT_COLLECTION, DEFAULT_WINDOW_SIZE};
use crate::store::{LogSyncMode, StoreConfig as LocalStoreConfig};
use crate::websocket::HubConfig as WsHubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Keep the document log on disk
    #[serde(default = "default_persist")]
    pub persist: bool,

    #[serde(default)]
    pub sync_mode: LogSyncMode,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("weatherboard").to_string_lossy().to_string())
        .unwrap_or_else(|| "./weatherboard_data".to_string())
}

fn default_persist() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: default_persist(),
            sync_mode: LogSyncMode::default(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chart and live query configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_width")]
    pub width: f64,

    #[serde(default = "default_height")]
    pub height: f64,

    #[serde(default = "default_margin_top")]
    pub margin_top: f64,

    #[serde(default = "default_margin_right")]
    pub margin_right: f64,

    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f64,

    #[serde(default = "default_margin_left")]
    pub margin_left: f64,

    #[serde(default = "default_padding")]
    pub padding: f64,

    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    #[serde(default = "default_fill")]
    pub fill: String,

    #[serde(default = "default_y_ticks")]
    pub y_ticks: usize,

    #[serde(default)]
    pub join_by: JoinBy,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_margin_top() -> f64 {
    20.0
}

fn default_margin_right() -> f64 {
    20.0
}

fn default_margin_bottom() -> f64 {
    100.0
}

fn default_margin_left() -> f64 {
    100.0
}

fn default_padding() -> f64 {
    0.2
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_fill() -> String {
    "orange".to_string()
}

fn default_y_ticks() -> usize {
    10
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            window_size: default_window_size(),
            width: default_width(),
            height: default_height(),
            margin_top: default_margin_top(),
            margin_right: default_margin_right(),
            margin_bottom: default_margin_bottom(),
            margin_left: default_margin_left(),
            padding: default_padding(),
            transition_ms: default_transition_ms(),
            fill: default_fill(),
            y_ticks: default_y_ticks(),
            join_by: JoinBy::default(),
        }
    }
}

/// WebSocket hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    1000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("weatherboard").join("config.toml")),
            Some(PathBuf::from("/etc/weatherboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("WEATHERBOARD_DATA_DIR") {
            self.store.data_dir = data_dir;
        }

        if let Some(host) = var("WEATHERBOARD_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("WEATHERBOARD_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid WEATHERBOARD_PORT"),
            }
        }

        if let Some(level) = var("WEATHERBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("WEATHERBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings the chart or the store cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chart = &self.chart;
        if chart.collection.is_empty() {
            return Err(ConfigError::Invalid("chart.collection cannot be empty".into()));
        }
        if chart.window_size == 0 {
            return Err(ConfigError::Invalid(
                "chart.window_size must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&chart.padding) {
            return Err(ConfigError::Invalid("chart.padding must be within [0, 1]".into()));
        }
        let layout = self.chart_layout();
        if layout.chart_width() <= 0.0 || layout.chart_height() <= 0.0 {
            return Err(ConfigError::Invalid(
                "chart margins leave no room for the plot area".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Store settings for `LocalStore::open`
    pub fn store_config(&self) -> LocalStoreConfig {
        LocalStoreConfig {
            data_dir: PathBuf::from(&self.store.data_dir),
            persist: self.store.persist,
            sync_mode: self.store.sync_mode,
        }
    }

    /// Bind address for the HTTP server
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.api.host.clone(), self.api.port)
    }

    pub fn hub_config(&self) -> WsHubConfig {
        WsHubConfig {
            max_connections: self.hub.max_connections,
        }
    }

    pub fn chart_layout(&self) -> ChartLayout {
        let chart = &self.chart;
        ChartLayout {
            width: chart.width,
            height: chart.height,
            margin: Margin {
                top: chart.margin_top,
                right: chart.margin_right,
                bottom: chart.margin_bottom,
                left: chart.margin_left,
            },
        }
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            layout: self.chart_layout(),
            padding: self.chart.padding,
            transition_ms: self.chart.transition_ms,
            fill: self.chart.fill.clone(),
            y_ticks: self.chart.y_ticks,
            join_by: self.chart.join_by,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Weatherboard Configuration
#
# Environment variables override these settings:
# - WEATHERBOARD_DATA_DIR
# - WEATHERBOARD_HOST
# - WEATHERBOARD_PORT
# - WEATHERBOARD_LOG_LEVEL
# - WEATHERBOARD_LOG_FORMAT

[store]
# Directory holding the document log
data_dir = "~/.local/share/weatherboard"

# Keep documents on disk; false keeps everything in memory
persist = true

# When to fsync the document log: every_write, batched, none
sync_mode = "batched"

[api]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 8080

[chart]
# Collection readings are written to
collection = "weather"

# Number of most recent readings shown
window_size = 10

# SVG size in pixels
width = 800
height = 600

# Space around the plot area
margin_top = 20
margin_right = 20
margin_bottom = 100
margin_left = 100

# Inner and outer padding of the bars, as a fraction of the band step
padding = 0.2

# Duration of the bar enter animation (ms)
transition_ms = 1000

# Bar and label colour
fill = "orange"

# Requested number of y axis ticks
y_ticks = 10

# Match existing bars to new readings by position (index) or timestamp (key)
join_by = "index"

[hub]
# Maximum concurrent WebSocket connections
max_connections = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
