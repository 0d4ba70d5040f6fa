// ============================================
// File: crates/ipstego-core/src/codec/bits.rs
// ============================================
//! # Bit Buffer
//!
//! Bounded, append-only bit sequence used by the decoder. Bits are stored
//! MSB-first inside each byte so `pack` is a plain copy of whole bytes.

/// Append-only sequence of bits with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    len: usize,
    capacity: usize,
}

impl BitBuffer {
    /// Creates an empty buffer holding at most `capacity` bits.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity.div_ceil(8)),
            len: 0,
            capacity,
        }
    }

    /// Number of bits pushed so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bits have been pushed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of bits the buffer accepts.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bits left before the buffer is full.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Appends the `count` low bits of `value`, most significant first.
    ///
    /// Returns `false` and leaves the buffer untouched if the bits do not
    /// fit.
    pub fn push_bits(&mut self, value: u8, count: usize) -> bool {
        debug_assert!(count <= 8);
        if count > self.remaining() {
            return false;
        }
        for shift in (0..count).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
        true
    }

    fn push_bit(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> offset;
            }
        }
        self.len += 1;
    }

    /// Returns the complete bytes accumulated so far.
    ///
    /// A trailing partial byte is dropped.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        self.bytes[..self.len / 8].to_vec()
    }

    /// Discards all bits, keeping the capacity.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pack() {
        let mut bits = BitBuffer::with_capacity(16);
        assert!(bits.push_bits(0b101, 3));
        assert!(bits.push_bits(0b00110, 5));
        assert_eq!(bits.len(), 8);
        assert_eq!(bits.pack(), vec![0b1010_0110]);
    }

    #[test]
    fn test_partial_byte_dropped() {
        let mut bits = BitBuffer::with_capacity(16);
        assert!(bits.push_bits(0xFF, 8));
        assert!(bits.push_bits(0b11, 2));
        assert_eq!(bits.pack(), vec![0xFF]);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut bits = BitBuffer::with_capacity(10);
        assert!(bits.push_bits(0x7F, 7));
        assert!(!bits.push_bits(0x7F, 7));
        assert_eq!(bits.len(), 7);
        assert!(bits.push_bits(0b111, 3));
        assert_eq!(bits.remaining(), 0);
    }

    #[test]
    fn test_clear() {
        let mut bits = BitBuffer::with_capacity(8);
        bits.push_bits(0xAA, 8);
        bits.clear();
        assert!(bits.is_empty());
        assert_eq!(bits.capacity(), 8);
    }
}
