// ============================================
// File: crates/ipstego-core/src/exchange/handshake.rs
// ============================================
//! # Handshake
//!
//! ## Creation Reason
//! Before any data flows, both ends must agree on who the peer is. The
//! initiator advertises itself in every outbound packet until a responder
//! answers; the responder binds to the first initiator it hears.
//!
//! ## Sequence
//! ```text
//!   Initiator                              Responder
//!   SendingDiscover ── DISCOVER ──────────► WaitingDiscover
//!                                           (bind peer = src)
//!                   ◄─────────── ACCEPT ── SendingAcceptance
//!   (bind peer = src)                       WaitingOk
//!   SendingOk ─────── OK ─────────────────►
//!   Established                             Established
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No retransmission: a lost ACCEPT or OK stalls until the driver times out
//! - While no peer is bound, the initiator writes DISCOVER into packets to
//!   any destination
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake machines

use std::net::Ipv4Addr;

use tracing::debug;

use super::{Exchange, InboundAction, OutboundAction};
use crate::error::Result;
use crate::symbol::{ACCEPT, DISCOVER, OK};

// ============================================
// DiscoverExchange
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiscoverState {
    SendingDiscover,
    SendingOk { peer: Ipv4Addr },
    Established,
}

/// Initiator side of the handshake.
///
/// Produces the address of the responder that answered.
#[derive(Debug)]
pub struct DiscoverExchange {
    state: DiscoverState,
    output: Option<Ipv4Addr>,
}

impl DiscoverExchange {
    /// Creates a handshake that starts advertising immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DiscoverState::SendingDiscover,
            output: None,
        }
    }

    /// Returns `true` once the handshake has completed.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.state == DiscoverState::Established
    }
}

impl Default for DiscoverExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange for DiscoverExchange {
    type Output = Ipv4Addr;

    fn on_inbound(&mut self, source: Ipv4Addr, symbol: u8) -> Result<InboundAction> {
        match self.state {
            DiscoverState::SendingDiscover if symbol == ACCEPT => {
                debug!(peer = %source, "Accept received, sending ok");
                self.state = DiscoverState::SendingOk { peer: source };
                Ok(InboundAction::Consume)
            }
            DiscoverState::SendingDiscover
            | DiscoverState::SendingOk { .. }
            | DiscoverState::Established => Ok(InboundAction::Ignore),
        }
    }

    fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction {
        match self.state {
            DiscoverState::SendingDiscover => OutboundAction::Inject(DISCOVER),
            DiscoverState::SendingOk { peer } if destination == peer => {
                debug!(%peer, "Handshake established");
                self.state = DiscoverState::Established;
                self.output = Some(peer);
                OutboundAction::Inject(OK)
            }
            DiscoverState::SendingOk { .. } | DiscoverState::Established => OutboundAction::Pass,
        }
    }

    fn take_output(&mut self) -> Option<Ipv4Addr> {
        self.output.take()
    }
}

// ============================================
// AcceptExchange
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptState {
    WaitingDiscover,
    SendingAcceptance { peer: Ipv4Addr },
    WaitingOk { peer: Ipv4Addr },
    Established,
}

/// Responder side of the handshake.
///
/// Produces the address of the initiator it bound to.
#[derive(Debug)]
pub struct AcceptExchange {
    state: AcceptState,
    output: Option<Ipv4Addr>,
}

impl AcceptExchange {
    /// Creates a handshake waiting for a discover.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AcceptState::WaitingDiscover,
            output: None,
        }
    }

    /// Returns `true` once the handshake has completed.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.state == AcceptState::Established
    }
}

impl Default for AcceptExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange for AcceptExchange {
    type Output = Ipv4Addr;

    fn on_inbound(&mut self, source: Ipv4Addr, symbol: u8) -> Result<InboundAction> {
        match self.state {
            AcceptState::WaitingDiscover if symbol == DISCOVER => {
                debug!(peer = %source, "Discover received, sending acceptance");
                self.state = AcceptState::SendingAcceptance { peer: source };
                Ok(InboundAction::Consume)
            }
            AcceptState::WaitingOk { peer } if source == peer && symbol == OK => {
                debug!(%peer, "Handshake established");
                self.state = AcceptState::Established;
                self.output = Some(peer);
                Ok(InboundAction::Consume)
            }
            AcceptState::WaitingDiscover
            | AcceptState::SendingAcceptance { .. }
            | AcceptState::WaitingOk { .. }
            | AcceptState::Established => Ok(InboundAction::Ignore),
        }
    }

    fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction {
        match self.state {
            AcceptState::SendingAcceptance { peer } if destination == peer => {
                self.state = AcceptState::WaitingOk { peer };
                OutboundAction::Inject(ACCEPT)
            }
            AcceptState::WaitingDiscover
            | AcceptState::SendingAcceptance { .. }
            | AcceptState::WaitingOk { .. }
            | AcceptState::Established => OutboundAction::Pass,
        }
    }

    fn take_output(&mut self) -> Option<Ipv4Addr> {
        self.output.take()
    }
}

// ============================================
// Tests
// ============================================
