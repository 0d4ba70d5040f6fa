// ============================================
// File: crates/ipstego-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Errors raised by the symbol codec while framing or unframing a payload.
//! The state machines themselves never fail except by propagating these.
//!
//! ## Error Categories
//! 1. **Capacity Errors**: payload too large to encode, or too many symbols
//!    received before the terminator
//! 2. **Wrapped Errors**: `CommonError` from shared validation
//!
//! ## ⚠️ Important Note for Next Developer
//! - `BufferTooSmall` is raised before any packet is touched
//! - `BufferFull` happens mid-transfer and ends the read call
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use ipstego_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for the codec and exchanges.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Encoded payload would not fit in the configured bit buffer.
    #[error("Buffer too small: payload needs {requested} stuffed bits, max is {max}")]
    BufferTooSmall {
        /// Stuffed bit length the payload would need
        requested: usize,
        /// Configured maximum stuffed bit length
        max: usize,
    },

    /// Decoded bits exceeded the buffer before the terminator arrived.
    #[error("Buffer full: more than {capacity} data bits received before terminator")]
    BufferFull {
        /// Capacity of the decode buffer in bits
        capacity: usize,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `BufferTooSmall` error.
    #[must_use]
    pub const fn buffer_too_small(requested: usize, max: usize) -> Self {
        Self::BufferTooSmall { requested, max }
    }

    /// Creates a `BufferFull` error.
    #[must_use]
    pub const fn buffer_full(capacity: usize) -> Self {
        Self::BufferFull { capacity }
    }

    /// Returns `true` if this is a capacity error.
    #[must_use]
    pub const fn is_capacity_error(&self) -> bool {
        matches!(self, Self::BufferTooSmall { .. } | Self::BufferFull { .. })
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
        let err = CoreError::buffer_too_small(9376, 9368);
        assert!(err.to_string().contains("9376"));
        assert!(err.to_string().contains("9368"));

        let err = CoreError::buffer_full(8197);
        assert!(err.to_string().contains("8197"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::buffer_full(7).is_capacity_error());
        assert!(CoreError::buffer_too_small(16, 8).is_capacity_error());

        let common: CoreError = CommonError::unsupported_channel("UDP.PORT").into();
        assert!(!common.is_capacity_error());
        assert!(matches!(common, CoreError::Common(_)));
    }
}
