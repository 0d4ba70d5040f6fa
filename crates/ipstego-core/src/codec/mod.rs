// ============================================
// File: crates/ipstego-core/src/codec/mod.rs
// ============================================
//! # Symbol Codec
//!
//! ## Creation Reason
//! Turns an application payload into a sequence of one-byte symbols that
//! can ride in a single header field, and back.
//!
//! ## Main Functionality
//! - `SymbolCodec`: sizing rules and `encode`
//! - `SymbolDecoder`: incremental decoder fed one symbol per packet
//!
//! ## Encoding
//! ```text
//! payload bits (MSB-first):  b0 b1 b2 b3 b4 b5 b6 | b7 b8 ...
//! symbol:                    b0 b1 b2 b3 b4 b5 b6 1
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The size check uses stuffed bits, not payload bytes. Changing the
//!   formula changes the largest payload a peer accepts.
//! - Padding in the last symbol is always fewer than 8 bits, so `finish`
//!   recovers the exact payload by dropping the trailing partial byte.
//!
//! ## Last Modified
//! v0.1.0 - Initial codec

mod bits;
mod stuffing;

pub use bits::BitBuffer;
pub use stuffing::{data_bits, stuffed_bits, symbol_count};

use tracing::trace;

use crate::error::{CoreError, Result};
use crate::symbol::{is_data_symbol, DATA_BITS_PER_SYMBOL};

// ============================================
// Constants
// ============================================

/// Default maximum payload per read or write call, in bytes.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

// ============================================
// SymbolCodec
// ============================================

/// Sizing rules and encoder for one direction of a connection.
///
/// # Example
/// ```
/// use ipstego_core::SymbolCodec;
///
/// let codec = SymbolCodec::new(1024);
/// let symbols = codec.encode(&[0x22, 0x50, 0x02, 0x32]).unwrap();
/// assert_eq!(symbols.len(), 5);
///
/// let mut decoder = codec.decoder();
/// for symbol in symbols {
///     decoder.push(symbol).unwrap();
/// }
/// assert_eq!(decoder.finish(), vec![0x22, 0x50, 0x02, 0x32]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCodec {
    max_payload: usize,
}

impl SymbolCodec {
    /// Creates a codec limited to `max_payload` bytes per transfer.
    #[must_use]
    pub const fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Maximum payload in bytes.
    #[must_use]
    pub const fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Maximum number of bits on the wire for one transfer.
    #[must_use]
    pub const fn max_stuffed_bits(&self) -> usize {
        stuffed_bits(self.max_payload)
    }

    /// Maximum number of data bits the decoder will hold.
    #[must_use]
    pub const fn max_data_bits(&self) -> usize {
        data_bits(self.max_payload)
    }

    /// Encodes `payload` into data symbols.
    ///
    /// # Errors
    /// `BufferTooSmall` if the stuffed payload exceeds the configured
    /// maximum. Nothing is produced in that case.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let requested = stuffed_bits(payload.len());
        let max = self.max_stuffed_bits();
        if requested > max {
            return Err(CoreError::buffer_too_small(requested, max));
        }
        let symbols = stuffing::stuff(payload);
        trace!(bytes = payload.len(), symbols = symbols.len(), "Payload encoded");
        Ok(symbols)
    }

    /// Creates an empty decoder sized for this codec.
    #[must_use]
    pub fn decoder(&self) -> SymbolDecoder {
        SymbolDecoder::new(self.max_data_bits())
    }
}

impl Default for SymbolCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

// ============================================
// SymbolDecoder
// ============================================

/// Incremental decoder accumulating data bits from received symbols.
#[derive(Debug, Clone)]
pub struct SymbolDecoder {
    bits: BitBuffer,
    symbols: usize,
}

impl SymbolDecoder {
    /// Creates a decoder holding at most `capacity` data bits.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: BitBuffer::with_capacity(capacity),
            symbols: 0,
        }
    }

    /// Feeds one received symbol.
    ///
    /// Returns `Ok(false)` if the symbol fails the framing check; it is
    /// discarded and the decoder is unchanged.
    ///
    /// # Errors
    /// `BufferFull` if the symbol's bits do not fit.
    pub fn push(&mut self, symbol: u8) -> Result<bool> {
        if !is_data_symbol(symbol) {
            trace!(symbol, "Discarding symbol without framing bit");
            return Ok(false);
        }
        if !self.bits.push_bits(symbol >> 1, DATA_BITS_PER_SYMBOL) {
            return Err(CoreError::buffer_full(self.bits.capacity()));
        }
        self.symbols += 1;
        Ok(true)
    }

    /// Number of data symbols accepted so far.
    #[must_use]
    pub const fn symbols(&self) -> usize {
        self.symbols
    }

    /// Returns `true` if no data symbol has been accepted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.symbols == 0
    }

    /// Packs the accumulated bits into the decoded payload.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bits.pack()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    fn roundtrip(codec: &SymbolCodec, payload: &[u8]) -> Vec<u8> {
        let mut decoder = codec.decoder();
        for symbol in codec.encode(payload).unwrap() {
            assert!(decoder.push(symbol).unwrap());
        }
        decoder.finish()
    }

    #[test]
    fn test_roundtrip_random_payloads() {
        let codec = SymbolCodec::default();
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let len = rng.gen_range(0..=DEFAULT_MAX_PAYLOAD);
            let mut payload = vec![0u8; len];
            rng.fill_bytes(&mut payload);
            assert_eq!(roundtrip(&codec, &payload), payload);
        }
    }

    #[test]
    fn test_max_payload_boundary() {
        let codec = SymbolCodec::default();
        assert!(codec.encode(&[0u8; DEFAULT_MAX_PAYLOAD]).is_ok());

        let err = codec.encode(&[0u8; DEFAULT_MAX_PAYLOAD + 1]).unwrap_err();
        match err {
            CoreError::BufferTooSmall { requested, max } => {
                assert!(requested > max);
                assert_eq!(max, 9368);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_full_payload_fits_decoder() {
        let codec = SymbolCodec::default();
        let payload = vec![0x5A; DEFAULT_MAX_PAYLOAD];
        assert_eq!(roundtrip(&codec, &payload), payload);
    }

    #[test]
    fn test_decoder_discards_unframed_symbols() {
        let codec = SymbolCodec::new(4);
        let mut decoder = codec.decoder();
        assert!(!decoder.push(0xFE).unwrap());
        assert!(!decoder.push(0x00).unwrap());
        assert!(decoder.is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_decoder_overflow() {
        let codec = SymbolCodec::new(1);
        let mut decoder = codec.decoder();
        assert_eq!(codec.max_data_bits(), 14);
        assert!(decoder.push(0x01).unwrap());
        assert!(decoder.push(0x01).unwrap());
        let err = decoder.push(0x01).unwrap_err();
        assert!(matches!(err, CoreError::BufferFull { capacity: 14 }));
    }

    #[test]
    fn test_known_vector() {
        let codec = SymbolCodec::default();
        let symbols = codec.encode(&[0x22, 0x50, 0x02, 0x32]).unwrap();
        assert_eq!(symbols.len(), 5);
        assert!(symbols.iter().all(|s| is_data_symbol(*s)));
        assert_eq!(roundtrip(&codec, &[0x22, 0x50, 0x02, 0x32]), vec![0x22, 0x50, 0x02, 0x32]);
    }
}
