// ============================================
// File: crates/ipstego-core/src/exchange/mod.rs
// ============================================
//! # Exchange State Machines
//!
//! ## Creation Reason
//! Handshake, read and write all follow the same pattern: look at the
//! covert field of each inbound packet, optionally overwrite the covert
//! field of each outbound packet, and stop once a result is known. The
//! `Exchange` trait captures that pattern so a single async driver can run
//! any of them.
//!
//! ## Main Functionality
//! - `Exchange`: the transition interface
//! - `InboundAction` / `OutboundAction`: what to do with the packet
//! - [`handshake`]: `DiscoverExchange`, `AcceptExchange`
//! - [`read`]: `ReadExchange`
//! - [`write`]: `WriteExchange`
//!
//! ## Packet Flow
//! ```text
//!  inbound packet ──► read field ──► on_inbound(src, symbol) ──► Ignore  → accept unchanged
//!                                                           └─► Consume → accept, field cleared
//!
//!  outbound packet ─► on_outbound(dst) ──► Pass        → accept unchanged
//!                                     └──► Inject(sym) → accept, field = sym
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Machines never see packets that are not IPv4; the driver filters them
//! - Once bound, packets from or to any other address must not change state
//! - `take_output` returns `Some` exactly once, after the final transition
//!
//! ## Last Modified
//! v0.1.0 - Initial exchange machines

pub mod handshake;
pub mod read;
pub mod write;

pub use handshake::{AcceptExchange, DiscoverExchange};
pub use read::ReadExchange;
pub use write::WriteExchange;

use std::net::Ipv4Addr;

use crate::error::Result;

// ============================================
// Actions
// ============================================

/// Decision for an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    /// Not for us; let it through untouched.
    Ignore,
    /// Symbol consumed; clear the field before letting the packet through.
    Consume,
}

/// Decision for an outbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundAction {
    /// Let the packet through untouched.
    Pass,
    /// Write the symbol into the field, then let the packet through.
    Inject(u8),
}

// ============================================
// Exchange Trait
// ============================================

/// A protocol state machine driven one packet at a time.
pub trait Exchange {
    /// Value produced when the exchange completes.
    type Output;

    /// Handles the covert symbol carried by an inbound packet from `source`.
    ///
    /// # Errors
    /// Codec errors that make the exchange unrecoverable.
    fn on_inbound(&mut self, source: Ipv4Addr, symbol: u8) -> Result<InboundAction>;

    /// Decides what to carry in an outbound packet addressed to `destination`.
    fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction;

    /// Takes the result once the exchange is complete.
    fn take_output(&mut self) -> Option<Self::Output>;
}
