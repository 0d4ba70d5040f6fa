// ============================================
// File: crates/ipstego-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Separates the protocol driver from the mechanism that intercepts
//! packets. Production uses a netfilter queue; tests use an in-memory one.
//!
//! ## Main Functionality
//! - `PacketFlow`: a stream of intercepted packets that each need a verdict
//! - `InterceptedPacket` / `Verdict`: the packet handle and what to do with it
//! - `FieldAccessor`: reads and writes the covert field of a raw packet
//!
//! ## ⚠️ Important Note for Next Developer
//! - `recv` must be cancel-safe: the driver races two flows in `select!`
//! - `verdict` takes the packet by value; a packet gets exactly one verdict
//! - Implementations must be `Send + Sync`
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// InterceptedPacket
// ============================================

/// A packet held by the kernel (or a mock) until a verdict is issued.
#[derive(Clone, PartialEq, Eq)]
pub struct InterceptedPacket {
    id: u32,
    data: Vec<u8>,
}

impl InterceptedPacket {
    /// Creates a packet handle.
    #[must_use]
    pub const fn new(id: u32, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// Queue-assigned packet id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Raw packet bytes, starting at the network header.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the handle, returning the packet bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for InterceptedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedPacket")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}

// ============================================
// Verdict
// ============================================

/// What to do with an intercepted packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the packet continue unchanged.
    Accept,
    /// Let the packet continue with the given bytes instead.
    AcceptModified(Vec<u8>),
}

impl Verdict {
    /// Returns `true` if the verdict rewrites the packet.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        matches!(self, Self::AcceptModified(_))
    }
}

// ============================================
// PacketFlow Trait
// ============================================

/// A bound packet interception queue.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; a connection holds two of them
/// behind trait objects.
///
/// # Example
/// ```ignore
/// async fn pass_through(flow: &dyn PacketFlow) -> Result<()> {
///     loop {
///         let packet = flow.recv().await?;
///         flow.verdict(packet, Verdict::Accept).await?;
///     }
/// }
/// ```
#[async_trait]
pub trait PacketFlow: Send + Sync {
    /// Waits for the next intercepted packet.
    ///
    /// Cancel-safe: dropping the future never loses a packet.
    ///
    /// # Errors
    /// Returns error if the queue is closed or receiving fails
    async fn recv(&self) -> Result<InterceptedPacket>;

    /// Releases a packet back to the network.
    ///
    /// # Errors
    /// Returns error if the verdict could not be delivered
    async fn verdict(&self, packet: InterceptedPacket, verdict: Verdict) -> Result<()>;

    /// Unbinds the queue. Further calls fail with `Closed`.
    ///
    /// # Errors
    /// Returns error if unbinding fails
    async fn close(&self) -> Result<()>;

    /// Queue number this flow is bound to.
    fn queue_id(&self) -> u16;
}

/// Shared flows, so a caller can keep a handle on a queue a connection owns.
#[async_trait]
impl<T: PacketFlow + ?Sized> PacketFlow for Arc<T> {
    async fn recv(&self) -> Result<InterceptedPacket> {
        (**self).recv().await
    }

    async fn verdict(&self, packet: InterceptedPacket, verdict: Verdict) -> Result<()> {
        (**self).verdict(packet, verdict).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }

    fn queue_id(&self) -> u16 {
        (**self).queue_id()
    }
}

// ============================================
// FieldAccessor Trait
// ============================================

/// Reads and writes the covert header field of a raw packet.
pub trait FieldAccessor: Send + Sync {
    /// Returns the field value and a copy of the packet with the field
    /// cleared and checksums fixed.
    ///
    /// `None` if the packet does not carry the field.
    fn read_field(&self, packet: &[u8]) -> Option<(u8, Vec<u8>)>;

    /// Returns a copy of the packet with the field set to `value` and
    /// checksums fixed.
    ///
    /// `None` if the packet does not carry the field.
    fn write_field(&self, packet: &[u8], value: u8) -> Option<Vec<u8>>;
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_accessors() {
        let packet = InterceptedPacket::new(42, vec![0x45, 0x00]);
        assert_eq!(packet.id(), 42);
        assert_eq!(packet.data(), &[0x45, 0x00]);
        assert!(format!("{packet:?}").contains("len: 2"));
        assert_eq!(packet.into_data(), vec![0x45, 0x00]);
    }

    #[test]
    fn test_verdict_is_modified() {
        assert!(!Verdict::Accept.is_modified());
        assert!(Verdict::AcceptModified(vec![]).is_modified());
    }
}
