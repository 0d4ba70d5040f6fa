// ============================================
// File: crates/ipstego-core/src/exchange/read.rs
// ============================================
//! # Read Exchange
//!
//! Receiving half of one transfer. Waits for `START` from the peer,
//! acknowledges it, collects data symbols until `END`, acknowledges that
//! and yields the decoded payload.
//!
//! ```text
//! WaitingTransmissionStart ─START─► SendingStartAck ─OK out─► TransmissionStarted
//!                                                                │ data... END
//!                                    Complete ◄─OK out─ SendingEndAck
//! ```

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use super::{Exchange, InboundAction, OutboundAction};
use crate::codec::SymbolDecoder;
use crate::error::Result;
use crate::symbol::{END, OK, START};

#[derive(Debug)]
enum ReadState {
    WaitingTransmissionStart,
    SendingStartAck,
    TransmissionStarted,
    SendingEndAck,
    Complete,
}

/// Receives one payload from the bound peer.
#[derive(Debug)]
pub struct ReadExchange {
    peer: Ipv4Addr,
    state: ReadState,
    decoder: Option<SymbolDecoder>,
    output: Option<Vec<u8>>,
}

impl ReadExchange {
    /// Creates a read exchange bound to `peer`, decoding into `decoder`.
    #[must_use]
    pub const fn new(peer: Ipv4Addr, decoder: SymbolDecoder) -> Self {
        Self {
            peer,
            state: ReadState::WaitingTransmissionStart,
            decoder: Some(decoder),
            output: None,
        }
    }

    /// Returns `true` once the transfer has been acknowledged.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, ReadState::Complete)
    }

    fn has_data(&self) -> bool {
        self.decoder.as_ref().is_some_and(|d| !d.is_empty())
    }
}

impl Exchange for ReadExchange {
    type Output = Vec<u8>;

    fn on_inbound(&mut self, source: Ipv4Addr, symbol: u8) -> Result<InboundAction> {
        if source != self.peer {
            return Ok(InboundAction::Ignore);
        }

        match self.state {
            ReadState::WaitingTransmissionStart if symbol == START => {
                debug!(peer = %self.peer, "Transmission start received");
                self.state = ReadState::SendingStartAck;
                Ok(InboundAction::Consume)
            }
            ReadState::TransmissionStarted if symbol == END => {
                if !self.has_data() {
                    trace!("Duplicate start ignored");
                    return Ok(InboundAction::Consume);
                }
                debug!(peer = %self.peer, "Transmission end received");
                self.state = ReadState::SendingEndAck;
                Ok(InboundAction::Consume)
            }
            ReadState::TransmissionStarted => {
                let Some(decoder) = self.decoder.as_mut() else {
                    return Ok(InboundAction::Ignore);
                };
                if decoder.push(symbol)? {
                    Ok(InboundAction::Consume)
                } else {
                    Ok(InboundAction::Ignore)
                }
            }
            ReadState::WaitingTransmissionStart
            | ReadState::SendingStartAck
            | ReadState::SendingEndAck
            | ReadState::Complete => Ok(InboundAction::Ignore),
        }
    }

    fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction {
        if destination != self.peer {
            return OutboundAction::Pass;
        }

        match self.state {
            ReadState::SendingStartAck => {
                self.state = ReadState::TransmissionStarted;
                OutboundAction::Inject(OK)
            }
            ReadState::SendingEndAck => {
                self.state = ReadState::Complete;
                self.output = self.decoder.take().map(SymbolDecoder::finish);
                if let Some(payload) = &self.output {
                    debug!(bytes = payload.len(), "Transmission complete");
                }
                OutboundAction::Inject(OK)
            }
            ReadState::WaitingTransmissionStart
            | ReadState::TransmissionStarted
            | ReadState::Complete => OutboundAction::Pass,
        }
    }

    fn take_output(&mut self) -> Option<Vec<u8>> {
        self.output.take()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SymbolCodec;

    const PEER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const OTHER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 99);

    fn reader() -> ReadExchange {
        ReadExchange::new(PEER, SymbolCodec::default().decoder())
    }

    #[test]
    fn test_full_transfer() {
        let codec = SymbolCodec::default();
        let mut rx = reader();

        assert_eq!(rx.on_outbound(PEER), OutboundAction::Pass);
        assert_eq!(rx.on_inbound(PEER, START).unwrap(), InboundAction::Consume);
        assert_eq!(rx.on_outbound(PEER), OutboundAction::Inject(OK));

        // Writer keeps sending START until it sees the ack
        assert_eq!(rx.on_inbound(PEER, START).unwrap(), InboundAction::Consume);

        for symbol in codec.encode(b"hi!").unwrap() {
            assert_eq!(rx.on_inbound(PEER, symbol).unwrap(), InboundAction::Consume);
        }
        assert_eq!(rx.on_inbound(PEER, END).unwrap(), InboundAction::Consume);
        assert_eq!(rx.take_output(), None);

        assert_eq!(rx.on_outbound(PEER), OutboundAction::Inject(OK));
        assert!(rx.is_complete());
        assert_eq!(rx.take_output(), Some(b"hi!".to_vec()));
    }

    #[test]
    fn test_wrong_source_never_transitions() {
        let mut rx = reader();
        assert_eq!(rx.on_inbound(OTHER, START).unwrap(), InboundAction::Ignore);
        assert_eq!(rx.on_outbound(PEER), OutboundAction::Pass);

        rx.on_inbound(PEER, START).unwrap();
        assert_eq!(rx.on_outbound(OTHER), OutboundAction::Pass);
        assert_eq!(rx.on_outbound(PEER), OutboundAction::Inject(OK));

        assert_eq!(rx.on_inbound(OTHER, 0x03).unwrap(), InboundAction::Ignore);
        assert_eq!(rx.on_inbound(OTHER, END).unwrap(), InboundAction::Ignore);
        assert!(!rx.has_data());
    }

    #[test]
    fn test_unframed_symbols_discarded() {
        let mut rx = reader();
        rx.on_inbound(PEER, START).unwrap();
        rx.on_outbound(PEER);

        assert_eq!(rx.on_inbound(PEER, 0x00).unwrap(), InboundAction::Ignore);
        assert_eq!(rx.on_inbound(PEER, 0x42).unwrap(), InboundAction::Ignore);
        assert!(!rx.has_data());
    }

    #[test]
    fn test_overflow_is_fatal() {
        let mut rx = ReadExchange::new(PEER, SymbolCodec::new(1).decoder());
        rx.on_inbound(PEER, START).unwrap();
        rx.on_outbound(PEER);

        rx.on_inbound(PEER, 0x01).unwrap();
        rx.on_inbound(PEER, 0x01).unwrap();
        assert!(rx.on_inbound(PEER, 0x01).is_err());
    }
}
