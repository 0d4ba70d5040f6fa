// ============================================
// File: crates/ipstego-core/src/symbol.rs
// ============================================
//! # Control Symbols
//!
//! One symbol is one byte written into one intercepted packet. Two values
//! are reserved for control; which meaning applies depends on the phase.
//!
//! ```text
//!  0xFE  DISCOVER (handshake) / START, END (data transfer)
//!  0xFF  ACCEPT (handshake)   / OK (every acknowledgement)
//!  xxxxxxx1  data symbol: 7 payload bits + framing bit
//! ```

/// Sent by the initiator while looking for a peer.
pub const DISCOVER: u8 = 0xFE;

/// Sent by the responder to answer a discover.
pub const ACCEPT: u8 = 0xFF;

/// Generic acknowledgement.
pub const OK: u8 = 0xFF;

/// Marks the beginning of a transmission.
pub const START: u8 = 0xFE;

/// Marks the end of a transmission.
pub const END: u8 = 0xFE;

/// Bit that is always set on data symbols.
pub const FRAMING_MASK: u8 = 0b0000_0001;

/// Number of payload bits carried by one data symbol.
pub const DATA_BITS_PER_SYMBOL: usize = 7;

/// Returns `true` if `symbol` passes the framing check.
#[must_use]
pub const fn is_data_symbol(symbol: u8) -> bool {
    symbol & FRAMING_MASK == FRAMING_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_end_fail_framing_check() {
        assert!(!is_data_symbol(START));
        assert!(!is_data_symbol(END));
        assert!(!is_data_symbol(DISCOVER));
    }

    #[test]
    fn test_framing_check() {
        assert!(is_data_symbol(0x01));
        assert!(is_data_symbol(0x45));
        assert!(!is_data_symbol(0x00));
        assert!(!is_data_symbol(0x44));
    }
}
