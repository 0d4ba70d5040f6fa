// ============================================
// File: crates/ipstego-transport/src/ipv4.rs
// ============================================
//! # IPv4 Header Access
//!
//! ## Creation Reason
//! The covert channel lives in the IPv4 Type-of-Service byte. This module
//! validates headers, pulls out addresses, and rewrites the TOS byte with
//! a correct header checksum.
//!
//! ## Header Layout (first 20 bytes)
//! ```text
//!  0      4      8              16      19             31
//! ┌──────┬──────┬───────────────┬──────────────────────┐
//! │ Ver  │ IHL  │      TOS      │     Total Length     │
//! ├──────┴──────┴───────────────┼──────┬───────────────┤
//! │        Identification       │Flags │ Frag Offset   │
//! ├─────────────┬───────────────┼──────┴───────────────┤
//! │     TTL     │   Protocol    │   Header Checksum    │
//! ├─────────────┴───────────────┴──────────────────────┤
//! │                  Source Address                     │
//! ├─────────────────────────────────────────────────────┤
//! │                Destination Address                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The checksum covers the header only (IHL * 4 bytes), options included
//! - Anything that is not a well-formed IPv4 header yields `None`
//!
//! ## Last Modified
//! v0.1.0 - Initial IPv4 accessor

use std::net::Ipv4Addr;

use crate::traits::FieldAccessor;

// ============================================
// Constants
// ============================================

/// Minimum IPv4 header size.
pub const IPV4_HEADER_MIN_SIZE: usize = 20;

/// Offset of the Type-of-Service byte.
const IPV4_TOS_OFFSET: usize = 1;

/// Offset of the total length field.
const IPV4_TOTAL_LEN_OFFSET: usize = 2;

/// Offset of the TTL byte.
const IPV4_TTL_OFFSET: usize = 8;

/// Offset of the protocol byte.
const IPV4_PROTOCOL_OFFSET: usize = 9;

/// Offset of the header checksum.
const IPV4_CHECKSUM_OFFSET: usize = 10;

/// Offset of source IP in IPv4 header.
const IPV4_SRC_OFFSET: usize = 12;

/// Offset of destination IP in IPv4 header.
const IPV4_DST_OFFSET: usize = 16;

// ============================================
// Header Helpers
// ============================================

/// Returns the header length in bytes if `packet` starts with a valid
/// IPv4 header.
#[must_use]
pub fn header_len(packet: &[u8]) -> Option<usize> {
    let first = *packet.first()?;
    if first >> 4 != 4 {
        return None;
    }
    let len = usize::from(first & 0x0F) * 4;
    if len < IPV4_HEADER_MIN_SIZE || packet.len() < len {
        return None;
    }
    Some(len)
}

/// Returns `true` if `packet` starts with a valid IPv4 header.
#[must_use]
pub fn is_ipv4(packet: &[u8]) -> bool {
    header_len(packet).is_some()
}

/// Extracts the source address.
#[must_use]
pub fn source(packet: &[u8]) -> Option<Ipv4Addr> {
    header_len(packet)?;
    address_at(packet, IPV4_SRC_OFFSET)
}

/// Extracts the destination address.
#[must_use]
pub fn destination(packet: &[u8]) -> Option<Ipv4Addr> {
    header_len(packet)?;
    address_at(packet, IPV4_DST_OFFSET)
}

fn address_at(packet: &[u8], offset: usize) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = packet.get(offset..offset + 4)?.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

/// Internet checksum (RFC 1071).
#[must_use]
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        sum += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    #[allow(clippy::cast_possible_truncation)]
    let folded = sum as u16;
    !folded
}

/// Recomputes the header checksum in place.
///
/// Does nothing if the packet is not IPv4.
pub fn update_checksum(packet: &mut [u8]) {
    let Some(len) = header_len(packet) else {
        return;
    };
    packet[IPV4_CHECKSUM_OFFSET..IPV4_CHECKSUM_OFFSET + 2].fill(0);
    let checksum = internet_checksum(&packet[..len]);
    packet[IPV4_CHECKSUM_OFFSET..IPV4_CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
}

/// Returns `true` if the header checksum verifies.
#[must_use]
pub fn checksum_valid(packet: &[u8]) -> bool {
    header_len(packet).is_some_and(|len| internet_checksum(&packet[..len]) == 0)
}

/// Builds a minimal IPv4 packet with a valid header checksum.
///
/// Used for synthetic traffic in tests and local experiments.
#[must_use]
pub fn build_packet(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload: &[u8]) -> Vec<u8> {
    let total = IPV4_HEADER_MIN_SIZE + payload.len();
    let mut packet = vec![0u8; IPV4_HEADER_MIN_SIZE];
    packet[0] = 0x45;
    // Oversized payloads get a saturated length; only used for synthetic traffic.
    let total_len = u16::try_from(total).unwrap_or(u16::MAX);
    packet[IPV4_TOTAL_LEN_OFFSET..IPV4_TOTAL_LEN_OFFSET + 2].copy_from_slice(&total_len.to_be_bytes());
    packet[IPV4_TTL_OFFSET] = 64;
    packet[IPV4_PROTOCOL_OFFSET] = protocol;
    packet[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4].copy_from_slice(&src.octets());
    packet[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4].copy_from_slice(&dst.octets());
    update_checksum(&mut packet);
    packet.extend_from_slice(payload);
    packet
}

// ============================================
// IpTos
// ============================================

/// Field accessor for the IPv4 Type-of-Service byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpTos;

impl IpTos {
    /// Reads the TOS byte without copying the packet.
    #[must_use]
    pub fn peek(packet: &[u8]) -> Option<u8> {
        header_len(packet)?;
        Some(packet[IPV4_TOS_OFFSET])
    }
}

impl FieldAccessor for IpTos {
    fn read_field(&self, packet: &[u8]) -> Option<(u8, Vec<u8>)> {
        let value = Self::peek(packet)?;
        let mut cleared = packet.to_vec();
        cleared[IPV4_TOS_OFFSET] = 0;
        update_checksum(&mut cleared);
        Some((value, cleared))
    }

    fn write_field(&self, packet: &[u8], value: u8) -> Option<Vec<u8>> {
        header_len(packet)?;
        let mut written = packet.to_vec();
        written[IPV4_TOS_OFFSET] = value;
        update_checksum(&mut written);
        Some(written)
    }
}

// ============================================
// Tests
// ============================================
