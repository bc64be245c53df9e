//! # Configuration Management
//!
//! Centralized configuration for the relay server.
//!
//! This module provides structured configuration for the listener and the
//! logging sink, the two things the relay core takes from its environment.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variable overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Max allowed frame payload size (header + body), 2 MB
pub const MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:12345";

/// Main relay configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RelayConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(addr) = std::env::var("SESSION_RELAY_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(max) = std::env::var("SESSION_RELAY_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        if let Ok(size) = std::env::var("SESSION_RELAY_MAX_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.server.max_frame_size = val;
            }
        }

        if let Ok(level) = std::env::var("SESSION_RELAY_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:12345")
    pub address: String,

    /// Maximum number of concurrent client sessions
    pub max_connections: usize,

    /// Maximum accepted frame payload size in bytes
    pub max_frame_size: usize,

    /// Seconds to wait for sessions to drain on shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from(DEFAULT_ADDRESS),
            max_connections: 1024,
            max_frame_size: MAX_FRAME_SIZE,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Validate address format
        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:12345')",
                self.address
            ));
        }

        // Validate max connections
        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "Max connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }

        // Validate frame size: must at least hold a header, and stay within
        // the i32 length prefix the wire format uses
        if self.max_frame_size < crate::core::message::HEADER_LEN {
            errors.push(format!(
                "Max frame size too small: {} (minimum: {} byte header)",
                self.max_frame_size,
                crate::core::message::HEADER_LEN
            ));
        } else if self.max_frame_size > i32::MAX as usize {
            errors.push(format!(
                "Max frame size exceeds wire format limit: {} (maximum: {})",
                self.max_frame_size,
                i32::MAX
            ));
        }

        if self.shutdown_timeout_secs == 0 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout_secs > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.level.parse::<tracing::Level>().is_err() {
            errors.push(format!(
                "Invalid log level: '{}' (expected one of: trace, debug, info, warn, error)",
                self.level
            ));
        }

        errors
    }
}
