// ============================================
// File: crates/ipstego/src/config.rs
// ============================================
//! # Channel Configuration
//!
//! ## Creation Reason
//! Queue numbers, protocol limits and logging for the `ipstego` binary
//! and for library callers that prefer a file over code.
//!
//! ## Main Functionality
//! - `StegoConfig`: main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Defaults matching the protocol constants
//!
//! ## Configuration Sections
//! - `channel`: channel kind and the two NFQUEUE numbers
//! - `limits`: payload size, queue depth, handshake timeout, deadlines
//! - `logging`: log level
//!
//! ## Example Configuration
//! ```toml
//! [channel]
//! kind = "IP.TOS"
//! inbound_queue = 10
//! outbound_queue = 20
//!
//! [limits]
//! max_payload = 1024
//! queue_depth = 100
//! handshake_timeout_secs = 100
//! enforce_data_deadlines = false
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both peers must agree on `max_payload`; a larger write is rejected
//!   before any packet is touched, a larger read fails mid-transfer
//! - `enforce_data_deadlines = false` keeps read/write running until the
//!   transfer completes, whatever deadline is set
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use ipstego_common::types::ChannelKind;

use crate::error::{Result, StegoError};

// ============================================
// StegoConfig
// ============================================

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StegoConfig {
    /// Channel selection.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Protocol limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StegoConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StegoError::config_load(&path_str, e.to_string()))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| StegoError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StegoError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.channel.validate()?;
        self.limits.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ============================================
// ChannelConfig
// ============================================

/// Channel section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel kind string, e.g. `"IP.TOS"`.
    #[serde(default = "default_kind")]
    pub kind: String,

    /// NFQUEUE number receiving inbound packets.
    #[serde(default = "default_inbound_queue")]
    pub inbound_queue: u16,

    /// NFQUEUE number receiving outbound packets.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: u16,
}

fn default_kind() -> String {
    ChannelKind::IpTos.as_str().to_string()
}

fn default_inbound_queue() -> u16 {
    10
}

fn default_outbound_queue() -> u16 {
    20
}

impl ChannelConfig {
    fn validate(&self) -> Result<()> {
        self.kind
            .parse::<ChannelKind>()
            .map_err(|e| StegoError::config_invalid("channel.kind", e.to_string()))?;
        if self.inbound_queue == self.outbound_queue {
            return Err(StegoError::config_invalid(
                "channel.outbound_queue",
                "must differ from channel.inbound_queue",
            ));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            inbound_queue: default_inbound_queue(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

// ============================================
// LimitsConfig
// ============================================

/// Protocol limits section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum payload per read or write call, in bytes.
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,

    /// Maximum packets held per queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: u32,

    /// Handshake timeout in seconds.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Whether read/write honour the connection deadlines.
    #[serde(default)]
    pub enforce_data_deadlines: bool,
}

fn default_max_payload() -> usize {
    ipstego_core::DEFAULT_MAX_PAYLOAD
}

fn default_queue_depth() -> u32 {
    100
}

fn default_handshake_timeout() -> u64 {
    100
}

/// Largest payload the codec accepts per call.
const MAX_PAYLOAD_LIMIT: usize = 64 * 1024;
const MAX_HANDSHAKE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_payload == 0 {
            return Err(StegoError::config_invalid(
                "limits.max_payload",
                "must be greater than 0",
            ));
        }
        if self.max_payload > MAX_PAYLOAD_LIMIT {
            return Err(StegoError::config_invalid(
                "limits.max_payload",
                format!("cannot exceed {MAX_PAYLOAD_LIMIT}"),
            ));
        }
        if self.queue_depth == 0 {
            return Err(StegoError::config_invalid(
                "limits.queue_depth",
                "must be greater than 0",
            ));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(StegoError::config_invalid(
                "limits.handshake_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.handshake_timeout_secs > MAX_HANDSHAKE_TIMEOUT_SECS {
            return Err(StegoError::config_invalid(
                "limits.handshake_timeout_secs",
                format!("cannot exceed {MAX_HANDSHAKE_TIMEOUT_SECS}"),
            ));
        }
        Ok(())
    }

    /// Returns the handshake timeout.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload: default_max_payload(),
            queue_depth: default_queue_depth(),
            handshake_timeout_secs: default_handshake_timeout(),
            enforce_data_deadlines: false,
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(StegoError::config_invalid(
                "logging.level",
                format!("unknown level '{other}'"),
            )),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StegoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel.kind, "IP.TOS");
        assert_eq!(config.channel.inbound_queue, 10);
        assert_eq!(config.channel.outbound_queue, 20);
        assert_eq!(config.limits.max_payload, 1024);
        assert_eq!(config.limits.queue_depth, 100);
        assert_eq!(config.limits.handshake_timeout(), Duration::from_secs(100));
        assert!(!config.limits.enforce_data_deadlines);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = StegoConfig::from_str(
            r#"
            [channel]
            inbound_queue = 1
            outbound_queue = 2

            [limits]
            handshake_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.channel.inbound_queue, 1);
        assert_eq!(config.channel.kind, "IP.TOS");
        assert_eq!(config.limits.handshake_timeout_secs, 5);
        assert_eq!(config.limits.max_payload, 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unsupported_kind_rejected() {
        let err = StegoConfig::from_str("[channel]\nkind = \"UDP.PORT\"\n").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("UDP.PORT stego type is not supported"));
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = StegoConfig::default();
        config.limits.max_payload = 0;
        assert!(config.validate().is_err());

        let mut config = StegoConfig::default();
        config.channel.outbound_queue = config.channel.inbound_queue;
        assert!(config.validate().is_err());

        let mut config = StegoConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_handshake_timeout_bounded() {
        let err = StegoConfig::from_str("[limits]\nhandshake_timeout_secs = 9223372036854775807\n")
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("limits.handshake_timeout_secs"));

        let config = StegoConfig::from_str("[limits]\nhandshake_timeout_secs = 86400\n").unwrap();
        assert_eq!(config.limits.handshake_timeout(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = StegoConfig::default();
        config.limits.enforce_data_deadlines = true;
        let parsed = StegoConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = StegoConfig::load("/nonexistent/ipstego.toml").await.unwrap_err();
        assert!(matches!(err, StegoError::ConfigLoad { .. }));
    }
}
