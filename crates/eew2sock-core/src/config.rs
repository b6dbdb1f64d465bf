//! Configuration loading and typed config structures for the bridge.
//!
//! The configuration lives in a YAML file (by default `eew2sock.yaml` in the
//! working directory). This module defines strongly-typed structs that mirror
//! the YAML structure and a loader that reads the file and applies
//! environment overrides for deployment-specific values.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable configuration.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {reason}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level bridge configuration.
///
/// Mirrors the structure of `eew2sock.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeConfig {
    /// Log level, format, and process identity.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Message bus connection parameters.
    #[serde(default)]
    pub bus: BusConfig,

    /// WebSocket listener address.
    #[serde(default)]
    pub server: ListenerConfig,

    /// Event aging parameters.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Map extents for the two client projections.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

impl BridgeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `NATS_URL` overrides `bus.url`
    /// - `NATS_USER` overrides `bus.user`
    /// - `NATS_PASSWORD` overrides `bus.password`
    /// - `EEW2SOCK_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from a variable lookup (normally the process
    /// environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `EEW2SOCK_PORT` is not a valid port.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("NATS_URL") {
            self.bus.url = val;
        }
        if let Some(val) = lookup("NATS_USER") {
            self.bus.user = Some(val);
        }
        if let Some(val) = lookup("NATS_PASSWORD") {
            self.bus.password = Some(val);
        }
        if let Some(val) = lookup("EEW2SOCK_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Env {
                name: "EEW2SOCK_PORT",
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Process name attached to startup logs.
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Directory collected by the external log shipper, if any.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            process_name: default_process_name(),
            directory: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Message bus connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusConfig {
    /// Server URL, or a comma-separated list of URLs for failover.
    #[serde(default = "default_bus_url")]
    pub url: String,

    /// Optional user name.
    #[serde(default)]
    pub user: Option<String>,

    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,

    /// Subject carrying EEW events. Empty disables ingestion.
    #[serde(default = "default_bus_subject")]
    pub subject: String,

    /// Client name reported to the server.
    #[serde(default = "default_process_name")]
    pub client_name: String,
}

impl BusConfig {
    /// Whether an upstream subscription should be started.
    pub fn ingestion_enabled(&self) -> bool {
        !self.subject.trim().is_empty()
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            user: None,
            password: None,
            subject: default_bus_subject(),
            client_name: default_process_name(),
        }
    }
}

/// WebSocket listener address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Event aging parameters.
///
/// A record is evicted once `now - alignment_offset_secs` is later than
/// `origin_time + retention_window_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetentionConfig {
    /// Seconds subtracted from wall-clock time to compensate for upstream
    /// reporting delay.
    #[serde(default)]
    pub alignment_offset_secs: i64,

    /// Seconds an event stays visible after its origin time.
    #[serde(default = "default_retention_window_secs")]
    pub retention_window_secs: i64,

    /// Period of the maintenance loop in milliseconds.
    #[serde(default = "default_maintenance_interval_ms")]
    pub maintenance_interval_ms: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            alignment_offset_secs: 0,
            retention_window_secs: default_retention_window_secs(),
            maintenance_interval_ms: default_maintenance_interval_ms(),
        }
    }
}

/// Extents of the two client maps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectionConfig {
    /// Small-scale (wide area) map.
    #[serde(default = "default_small_map")]
    pub small_map: MapExtent,

    /// Large-scale (detail) map.
    #[serde(default = "default_large_map")]
    pub large_map: MapExtent,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            small_map: default_small_map(),
            large_map: default_large_map(),
        }
    }
}

/// Geographic bounds of a rendered map and its pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MapExtent {
    /// Western edge in degrees.
    pub min_lon: f64,
    /// Eastern edge in degrees.
    pub max_lon: f64,
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Map width in pixels.
    pub width: u32,
    /// Map height in pixels.
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_process_name() -> String {
    "eew2sock".to_owned()
}

fn default_bus_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_bus_subject() -> String {
    "eew.events".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    30900
}

const fn default_retention_window_secs() -> i64 {
    600
}

const fn default_maintenance_interval_ms() -> u64 {
    1000
}

const fn default_small_map() -> MapExtent {
    MapExtent {
        min_lon: 120.0,
        max_lon: 136.0,
        min_lat: 30.0,
        max_lat: 44.0,
        width: 1200,
        height: 1050,
    }
}

const fn default_large_map() -> MapExtent {
    MapExtent {
        min_lon: 124.5,
        max_lon: 130.5,
        min_lat: 33.0,
        max_lat: 39.0,
        width: 1000,
        height: 1000,
    }
}
