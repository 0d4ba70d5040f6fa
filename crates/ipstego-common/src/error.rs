// ============================================
// File: crates/ipstego-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error enum shared by every ipstego crate. Crate-specific error
//! enums wrap it with `#[from]`.
//!
//! ## Main Functionality
//! - `CommonError`: caller input rejected before any layer does work
//! - `Result<T>`: alias using `CommonError`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across ipstego crates.
///
/// # Example
/// ```
/// use ipstego_common::error::{CommonError, Result};
///
/// fn check_queues(inbound: u16, outbound: u16) -> Result<()> {
///     if inbound == outbound {
///         return Err(CommonError::invalid_input("outbound_queue", "must differ from inbound_queue"));
///     }
///     Ok(())
/// }
///
/// assert!(check_queues(10, 10).is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// The requested channel kind has no implementation.
    #[error("{kind} stego type is not supported")]
    UnsupportedChannelType {
        /// Channel kind string as requested by the caller
        kind: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnsupportedChannelType` error.
    pub fn unsupported_channel(kind: impl Into<String>) -> Self {
        Self::UnsupportedChannelType { kind: kind.into() }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("max_payload", "must be greater than 0");
        assert!(err.to_string().contains("max_payload"));
        assert!(err.to_string().contains("greater than 0"));

        let err = CommonError::unsupported_channel("TCP.SEQ");
        assert_eq!(err.to_string(), "TCP.SEQ stego type is not supported");
    }
}
