// ============================================
// File: crates/ipstego-core/src/codec/stuffing.rs
// ============================================
//! # Bit Stuffing
//!
//! Splits a payload into 7-bit groups and appends the framing bit to each,
//! so a data symbol can never equal `START`/`END` (`0xFE`, bit 0 clear).
//! A data symbol may equal `0xFF`; the reader never looks for `OK` while
//! data is flowing.

use crate::symbol::{DATA_BITS_PER_SYMBOL, FRAMING_MASK};

/// Number of symbols needed to carry `payload_len` bytes.
#[must_use]
pub const fn symbol_count(payload_len: usize) -> usize {
    (payload_len * 8).div_ceil(DATA_BITS_PER_SYMBOL)
}

/// Number of bits on the wire needed to carry `payload_len` bytes.
#[must_use]
pub const fn stuffed_bits(payload_len: usize) -> usize {
    symbol_count(payload_len) * 8
}

/// Number of payload bits the decoder must hold for `payload_len` bytes,
/// including the right padding of the last group.
#[must_use]
pub const fn data_bits(payload_len: usize) -> usize {
    symbol_count(payload_len) * DATA_BITS_PER_SYMBOL
}

/// Converts a payload into data symbols.
///
/// Bits are taken MSB-first. The final group is zero-padded on the right.
#[must_use]
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let mut symbols = Vec::with_capacity(symbol_count(payload.len()));
    let mut group: u8 = 0;
    let mut filled = 0;

    for byte in payload {
        for shift in (0..8).rev() {
            group = (group << 1) | ((byte >> shift) & 1);
            filled += 1;
            if filled == DATA_BITS_PER_SYMBOL {
                symbols.push((group << 1) | FRAMING_MASK);
                group = 0;
                filled = 0;
            }
        }
    }

    if filled > 0 {
        group <<= DATA_BITS_PER_SYMBOL - filled;
        symbols.push((group << 1) | FRAMING_MASK);
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(symbol_count(0), 0);
        assert_eq!(symbol_count(1), 2);
        assert_eq!(symbol_count(7), 8);
        assert_eq!(stuffed_bits(4), 40);
        assert_eq!(stuffed_bits(1024), 9368);
        assert_eq!(data_bits(1024), 8197);
    }

    #[test]
    fn test_single_byte() {
        // 1010_1010 -> 1010101 | 0 padded to 0000000
        assert_eq!(stuff(&[0xAA]), vec![0b1010_1011, 0b0000_0001]);
    }

    #[test]
    fn test_seven_bytes_fill_exactly_eight_symbols() {
        let symbols = stuff(&[0xFF; 7]);
        assert_eq!(symbols, vec![0xFF; 8]);
    }

    #[test]
    fn test_framing_bit_always_set() {
        let payload: Vec<u8> = (0..=255).collect();
        assert!(stuff(&payload).iter().all(|s| s & FRAMING_MASK == 1));
    }
}
