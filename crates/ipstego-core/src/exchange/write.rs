// ============================================
// File: crates/ipstego-core/src/exchange/write.rs
// ============================================
//! # Write Exchange
//!
//! Sending half of one transfer. The payload is encoded when the exchange
//! is built, so an oversized payload fails before any packet is touched.
//!
//! ```text
//! SendingTransmissionStart ─OK in─► TransmissionStarted ─last symbol─► SendingTransmissionEnd
//!                                                                        │ END out
//!                                   Complete ◄──────── OK in ──── WaitingEndAck
//! ```

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use super::{Exchange, InboundAction, OutboundAction};
use crate::codec::SymbolCodec;
use crate::error::Result;
use crate::symbol::{END, OK, START};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    SendingTransmissionStart,
    TransmissionStarted { next: usize },
    SendingTransmissionEnd,
    WaitingEndAck,
    Complete,
}

/// Sends one payload to the bound peer.
///
/// Produces the number of payload bytes delivered.
#[derive(Debug)]
pub struct WriteExchange {
    peer: Ipv4Addr,
    state: WriteState,
    symbols: Vec<u8>,
    payload_len: usize,
    output: Option<usize>,
}

impl WriteExchange {
    /// Encodes `payload` and prepares to send it to `peer`.
    ///
    /// An empty payload puts nothing on the wire: the exchange starts
    /// complete with output `0`, since a reader cannot tell an empty
    /// transmission from a repeated start.
    ///
    /// # Errors
    /// `BufferTooSmall` if the payload exceeds the codec limit.
    pub fn new(peer: Ipv4Addr, codec: &SymbolCodec, payload: &[u8]) -> Result<Self> {
        let symbols = codec.encode(payload)?;
        let (state, output) = if payload.is_empty() {
            (WriteState::Complete, Some(0))
        } else {
            (WriteState::SendingTransmissionStart, None)
        };
        Ok(Self {
            peer,
            state,
            symbols,
            payload_len: payload.len(),
            output,
        })
    }

    /// Number of data symbols this transfer carries.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` once the peer acknowledged the end of transmission.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == WriteState::Complete
    }
}

impl Exchange for WriteExchange {
    type Output = usize;

    fn on_inbound(&mut self, source: Ipv4Addr, symbol: u8) -> Result<InboundAction> {
        if source != self.peer || symbol != OK {
            return Ok(InboundAction::Ignore);
        }

        match self.state {
            WriteState::SendingTransmissionStart => {
                debug!(peer = %self.peer, symbols = self.symbols.len(), "Start acknowledged");
                self.state = WriteState::TransmissionStarted { next: 0 };
                Ok(InboundAction::Consume)
            }
            WriteState::WaitingEndAck => {
                debug!(peer = %self.peer, bytes = self.payload_len, "End acknowledged");
                self.state = WriteState::Complete;
                self.output = Some(self.payload_len);
                Ok(InboundAction::Consume)
            }
            WriteState::TransmissionStarted { .. }
            | WriteState::SendingTransmissionEnd
            | WriteState::Complete => Ok(InboundAction::Ignore),
        }
    }

    fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction {
        if destination != self.peer {
            return OutboundAction::Pass;
        }

        match self.state {
            WriteState::SendingTransmissionStart => OutboundAction::Inject(START),
            WriteState::TransmissionStarted { next } => match self.symbols.get(next) {
                Some(&symbol) => {
                    trace!(index = next, symbol, "Data symbol sent");
                    self.state = if next + 1 < self.symbols.len() {
                        WriteState::TransmissionStarted { next: next + 1 }
                    } else {
                        WriteState::SendingTransmissionEnd
                    };
                    OutboundAction::Inject(symbol)
                }
                None => {
                    self.state = WriteState::WaitingEndAck;
                    OutboundAction::Inject(END)
                }
            },
            WriteState::SendingTransmissionEnd => {
                self.state = WriteState::WaitingEndAck;
                OutboundAction::Inject(END)
            }
            WriteState::WaitingEndAck | WriteState::Complete => OutboundAction::Pass,
        }
    }

    fn take_output(&mut self) -> Option<usize> {
        self.output.take()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_MAX_PAYLOAD;
    use crate::error::CoreError;
    use crate::exchange::ReadExchange;

    const PEER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const OTHER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 99);

    #[test]
    fn test_symbol_sequence() {
        let codec = SymbolCodec::default();
        let payload = [0x22, 0x50, 0x02, 0x32];
        let mut tx = WriteExchange::new(PEER, &codec, &payload).unwrap();
        let expected = codec.encode(&payload).unwrap();

        assert_eq!(tx.on_outbound(PEER), OutboundAction::Inject(START));
        assert_eq!(tx.on_outbound(OTHER), OutboundAction::Pass);
        assert_eq!(tx.on_outbound(PEER), OutboundAction::Inject(START));

        assert_eq!(tx.on_inbound(OTHER, OK).unwrap(), InboundAction::Ignore);
        assert_eq!(tx.on_inbound(PEER, OK).unwrap(), InboundAction::Consume);

        for symbol in &expected {
            assert_eq!(tx.on_outbound(PEER), OutboundAction::Inject(*symbol));
        }
        assert_eq!(tx.on_outbound(PEER), OutboundAction::Inject(END));
        assert_eq!(tx.on_outbound(PEER), OutboundAction::Pass);

        assert_eq!(tx.take_output(), None);
        assert_eq!(tx.on_inbound(PEER, OK).unwrap(), InboundAction::Consume);
        assert!(tx.is_complete());
        assert_eq!(tx.take_output(), Some(4));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let codec = SymbolCodec::default();
        let err = WriteExchange::new(PEER, &codec, &[0u8; DEFAULT_MAX_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(err, CoreError::BufferTooSmall { .. }));
        assert!(WriteExchange::new(PEER, &codec, &[0u8; DEFAULT_MAX_PAYLOAD]).is_ok());
    }

    #[test]
    fn test_empty_payload_completes_without_symbols() {
        let codec = SymbolCodec::default();
        let mut tx = WriteExchange::new(PEER, &codec, &[]).unwrap();
        assert!(tx.is_complete());
        assert_eq!(tx.symbol_count(), 0);
        assert_eq!(tx.on_outbound(PEER), OutboundAction::Pass);
        assert_eq!(tx.on_inbound(PEER, OK).unwrap(), InboundAction::Ignore);
        assert_eq!(tx.take_output(), Some(0));
        assert_eq!(tx.take_output(), None);
    }

    #[test]
    fn test_ok_during_data_phase_ignored() {
        let codec = SymbolCodec::default();
        let mut tx = WriteExchange::new(PEER, &codec, b"abc").unwrap();
        tx.on_inbound(PEER, OK).unwrap();
        tx.on_outbound(PEER);
        assert_eq!(tx.on_inbound(PEER, OK).unwrap(), InboundAction::Ignore);
        assert!(!tx.is_complete());
    }

    #[test]
    fn test_writer_and_reader_in_lockstep() {
        let codec = SymbolCodec::default();
        let payload: Vec<u8> = (0u8..=200).collect();
        let mut tx = WriteExchange::new(PEER, &codec, &payload).unwrap();
        let mut rx = ReadExchange::new(OTHER, codec.decoder());

        // tx lives on OTHER and sends to PEER; rx lives on PEER and reads from OTHER
        for _ in 0..10_000 {
            if let OutboundAction::Inject(symbol) = tx.on_outbound(PEER) {
                rx.on_inbound(OTHER, symbol).unwrap();
            }
            if let OutboundAction::Inject(symbol) = rx.on_outbound(OTHER) {
                tx.on_inbound(PEER, symbol).unwrap();
            }
            if tx.is_complete() {
                break;
            }
        }

        assert_eq!(tx.take_output(), Some(payload.len()));
        assert_eq!(rx.take_output(), Some(payload));
    }
}
