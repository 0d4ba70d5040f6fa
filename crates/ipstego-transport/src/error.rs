// ============================================
// File: crates/ipstego-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Errors raised while binding, reading from, or issuing verdicts on a
//! packet interception queue.
//!
//! ## Error Categories
//! 1. **Queue Errors**: bind/unbind, receive and verdict failures
//! 2. **Protocol Errors**: malformed or unexpected netlink replies
//! 3. **System Errors**: permission denied, unsupported platform
//!
//! ## ⚠️ Important Note for Next Developer
//! - Binding an NFQUEUE needs `CAP_NET_ADMIN`
//! - Nothing here is retried internally; the caller decides
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

use ipstego_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Queue Errors
    // ========================================

    /// Failed to bind to a packet queue.
    #[error("Failed to bind queue {queue}: {reason}")]
    BindFailed {
        /// Queue number
        queue: u16,
        /// Why binding failed
        reason: String,
    },

    /// Receiving from the queue failed.
    #[error("Failed to receive from queue {queue}: {reason}")]
    ReceiveFailed {
        /// Queue number
        queue: u16,
        /// Why receive failed
        reason: String,
    },

    /// Issuing a verdict failed.
    #[error("Failed to set verdict for packet {packet_id} on queue {queue}: {reason}")]
    VerdictFailed {
        /// Queue number
        queue: u16,
        /// Packet id the verdict was for
        packet_id: u32,
        /// Why the verdict failed
        reason: String,
    },

    /// The kernel sent something we could not parse.
    #[error("Malformed netlink message: {reason}")]
    Malformed {
        /// What was wrong with it
        reason: String,
    },

    /// The queue has been closed.
    #[error("Queue {queue} is closed")]
    Closed {
        /// Queue number
        queue: u16,
    },

    // ========================================
    // System Errors
    // ========================================

    /// Permission denied for operation.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// What operation was denied
        operation: String,
    },

    /// No queue implementation for this platform.
    #[error("Packet queues are not supported on this platform")]
    Unsupported,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(queue: u16, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            queue,
            reason: reason.into(),
        }
    }

    /// Creates a `ReceiveFailed` error.
    pub fn receive_failed(queue: u16, reason: impl Into<String>) -> Self {
        Self::ReceiveFailed {
            queue,
            reason: reason.into(),
        }
    }

    /// Creates a `VerdictFailed` error.
    pub fn verdict_failed(queue: u16, packet_id: u32, reason: impl Into<String>) -> Self {
        Self::VerdictFailed {
            queue,
            packet_id,
            reason: reason.into(),
        }
    }

    /// Creates a `Malformed` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            Self::ReceiveFailed { .. } | Self::VerdictFailed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this error requires elevated privileges.
    #[must_use]
    pub const fn requires_privileges(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. } | Self::BindFailed { .. })
    }

    /// Returns `true` if the queue can no longer be used.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================
