//! TOML-based configuration for the master application.
//!
//! Reads and writes `AppConfig` to an explicit path or to the
//! platform-appropriate config file:
//! - Windows:  `%APPDATA%\fieldauth\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/fieldauth/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/fieldauth/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  A complete file for this application looks
//! like:
//!
//! ```toml
//! [master]
//! log_level = "info"
//!
//! [slave]
//! host = "127.0.0.1"
//! port = 1502
//! unit_id = 1
//! response_timeout_ms = 500
//!
//! [protocol]
//! max_write_registers = 123
//! timestamp_word_order = "low_word_first"
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so an empty file (or no file
//! at all) yields a configuration that talks to a slave on the local host.
//! Values given on the command line are applied on top by the binary.

use std::num::NonZeroU16;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldauth_core::{WordOrder, MAX_WRITE_REGISTERS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::handshake::HandshakeSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed correctly but is outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub master: MasterConfig,
    pub slave: SlaveConfig,
    pub protocol: ProtocolConfig,
}

/// Settings for the master process itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the slave lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlaveConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Modbus unit identifier sent with every request.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Upper bound for each individual request/response exchange.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

/// Register-level protocol knobs shared with the slave firmware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Registers per challenge burst, `1..=123`.
    #[serde(default = "default_max_write_registers")]
    pub max_write_registers: u16,
    /// Register layout of the timestamp.  Must match the slave.
    #[serde(default)]
    pub timestamp_word_order: WordOrder,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    1502
}
fn default_unit_id() -> u8 {
    1
}
fn default_response_timeout_ms() -> u64 {
    500
}
fn default_max_write_registers() -> u16 {
    MAX_WRITE_REGISTERS.get()
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            unit_id: default_unit_id(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_write_registers: default_max_write_registers(),
            timestamp_word_order: WordOrder::default(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl SlaveConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl AppConfig {
    /// Checks ranges that the TOML types alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slave.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "slave.host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.slave.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "slave.response_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let max = self.protocol.max_write_registers;
        if max == 0 || max > MAX_WRITE_REGISTERS.get() {
            return Err(ConfigError::Invalid {
                field: "protocol.max_write_registers",
                reason: format!("{max} is outside 1..={}", MAX_WRITE_REGISTERS),
            });
        }
        Ok(())
    }

    /// Builds the sequencer settings from the `[protocol]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the section fails validation.
    pub fn handshake_settings(&self) -> Result<HandshakeSettings, ConfigError> {
        self.validate()?;
        let max_write = NonZeroU16::new(self.protocol.max_write_registers).ok_or(
            ConfigError::Invalid {
                field: "protocol.max_write_registers",
                reason: "must be greater than zero".to_string(),
            },
        )?;
        Ok(HandshakeSettings {
            max_write,
            word_order: self.protocol.timestamp_word_order,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `explicit`, or from the platform path when `None`.
///
/// A missing file at the platform path yields `AppConfig::default()`; a
/// missing file that was named explicitly is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors, [`ConfigError::Parse`]
/// if the TOML is malformed, and [`ConfigError::Invalid`] if a value is out of
/// range.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let cfg = match explicit {
        Some(path) => read_config(path)?,
        None => {
            let path = config_file_path()?;
            match std::fs::read_to_string(&path) {
                Ok(content) => toml::from_str(&content)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "no config file, using defaults");
                    AppConfig::default()
                }
                Err(e) => return Err(ConfigError::Io { path, source: e }),
            }
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(toml::from_str(&content)?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory including the `fieldauth` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("fieldauth"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("fieldauth"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("fieldauth")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
