// ============================================
// File: crates/ipstego/src/error.rs
// ============================================
//! # Connection Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::time::Duration;

use thiserror::Error;

use ipstego_common::error::CommonError;
use ipstego_core::error::CoreError;
use ipstego_transport::error::TransportError;

/// Result type for connection operations.
pub type Result<T> = std::result::Result<T, StegoError>;

/// Errors surfaced by connections, listeners and configuration.
#[derive(Error, Debug)]
pub enum StegoError {
    /// No peer answered the discover within the handshake timeout.
    #[error("Discover timed out after {timeout:?}")]
    DiscoverTimeout {
        /// Configured handshake timeout.
        timeout: Duration,
    },

    /// No initiator completed the handshake within the timeout.
    #[error("Accept timed out after {timeout:?}")]
    AcceptTimeout {
        /// Configured handshake timeout.
        timeout: Duration,
    },

    /// The caller's read buffer cannot hold the decoded payload.
    #[error("Read buffer too short: payload is {needed} bytes, buffer holds {available}")]
    ShortCallerBuffer {
        /// Decoded payload length.
        needed: usize,
        /// Caller buffer length.
        available: usize,
    },

    /// A read or write deadline passed before the transfer completed.
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded {
        /// `"read"` or `"write"`.
        operation: &'static str,
    },

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// File path, or `<string>` for inline content.
        path: String,
        /// Underlying I/O or parse error.
        reason: String,
    },

    /// Configuration parsed but failed validation.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Dotted field name, e.g. `limits.max_payload`.
        field: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// Shared input error.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Codec or exchange error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Queue error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl StegoError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for handshake and deadline timeouts.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::DiscoverTimeout { .. } | Self::AcceptTimeout { .. } | Self::DeadlineExceeded { .. }
        )
    }

    /// Returns `true` for configuration load and validation errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the payload did not fit on one side or the other.
    #[must_use]
    pub const fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            Self::ShortCallerBuffer { .. }
                | Self::Core(CoreError::BufferFull { .. } | CoreError::BufferTooSmall { .. })
        )
    }

    /// Returns `true` if a queue could not be bound for lack of privileges.
    #[must_use]
    pub const fn requires_privileges(&self) -> bool {
        matches!(self, Self::Transport(e) if e.requires_privileges())
    }

    /// Returns `true` if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::DiscoverTimeout { .. } | Self::AcceptTimeout { .. } => true,
            _ => false,
        }
    }
}
