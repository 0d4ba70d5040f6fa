// ============================================
// File: crates/ipstego/src/engine.rs
// ============================================
//! # Exchange Engine
//!
//! ## Creation Reason
//! Every protocol step (handshake, read, write) is the same loop: take the
//! next intercepted packet from either queue, let the exchange decide what
//! to do with its covert field, issue the verdict, and stop once the
//! exchange produces its output.
//!
//! ## Packet Flow
//! ```text
//! inbound queue ──► read_field ──► on_inbound ──► Accept / AcceptModified(cleared)
//! outbound queue ──► destination ──► on_outbound ──► Accept / AcceptModified(written)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every packet taken from a queue gets exactly one verdict, including
//!   when the exchange fails on it; the error is returned afterwards
//! - Packets that are not IPv4 are accepted untouched
//! - Both `recv` calls must stay cancel-safe, `select!` drops the loser
//!
//! ## Last Modified
//! v0.1.0 - Initial engine

use tokio::time::Instant as TokioInstant;
use tracing::{debug, trace};

use ipstego_common::time::Deadline;
use ipstego_core::{Exchange, InboundAction, OutboundAction};
use ipstego_transport::{ipv4, FieldAccessor, InterceptedPacket, PacketFlow, Verdict};

use crate::error::Result;

/// Drives `exchange` over the two queues until it completes.
///
/// Returns `Ok(None)` if `deadline` passes first.
///
/// # Errors
/// Queue failures, and codec errors raised by the exchange.
pub async fn drive<E: Exchange>(
    exchange: &mut E,
    inbound: &dyn PacketFlow,
    outbound: &dyn PacketFlow,
    accessor: &dyn FieldAccessor,
    deadline: Option<Deadline>,
) -> Result<Option<E::Output>> {
    let timer = expire_at(deadline);
    tokio::pin!(timer);

    loop {
        if let Some(output) = exchange.take_output() {
            return Ok(Some(output));
        }

        tokio::select! {
            packet = inbound.recv() => {
                handle_inbound(exchange, inbound, accessor, packet?).await?;
            }
            packet = outbound.recv() => {
                handle_outbound(exchange, outbound, accessor, packet?).await?;
            }
            () = &mut timer => {
                debug!("Exchange deadline passed");
                return Ok(None);
            }
        }
    }
}

async fn expire_at(deadline: Option<Deadline>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(TokioInstant::from_std(deadline.instant())).await,
        None => std::future::pending().await,
    }
}

async fn handle_inbound<E: Exchange>(
    exchange: &mut E,
    flow: &dyn PacketFlow,
    accessor: &dyn FieldAccessor,
    packet: InterceptedPacket,
) -> Result<()> {
    let (Some(source), Some((symbol, cleared))) =
        (ipv4::source(packet.data()), accessor.read_field(packet.data()))
    else {
        flow.verdict(packet, Verdict::Accept).await?;
        return Ok(());
    };

    let action = exchange.on_inbound(source, symbol);
    let verdict = match action {
        Ok(InboundAction::Consume) => {
            trace!(%source, symbol, "Consumed inbound symbol");
            Verdict::AcceptModified(cleared)
        }
        Ok(InboundAction::Ignore) | Err(_) => Verdict::Accept,
    };
    flow.verdict(packet, verdict).await?;
    action?;
    Ok(())
}

async fn handle_outbound<E: Exchange>(
    exchange: &mut E,
    flow: &dyn PacketFlow,
    accessor: &dyn FieldAccessor,
    packet: InterceptedPacket,
) -> Result<()> {
    let Some(destination) = ipv4::destination(packet.data()) else {
        flow.verdict(packet, Verdict::Accept).await?;
        return Ok(());
    };

    let verdict = match exchange.on_outbound(destination) {
        OutboundAction::Inject(symbol) => match accessor.write_field(packet.data(), symbol) {
            Some(written) => {
                trace!(%destination, symbol, "Injected outbound symbol");
                Verdict::AcceptModified(written)
            }
            None => Verdict::Accept,
        },
        OutboundAction::Pass => Verdict::Accept,
    };
    flow.verdict(packet, verdict).await?;
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use ipstego_core::{symbol, CoreError, SymbolCodec, WriteExchange};
    use ipstego_transport::queue::MockQueue;
    use ipstego_transport::IpTos;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const PEER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    /// Consumes one symbol from `PEER`, then injects `reply` into the next
    /// packet to `PEER`.
    struct Echo {
        reply: u8,
        received: Option<u8>,
        done: bool,
        fail: bool,
    }

    impl Echo {
        fn new(reply: u8) -> Self {
            Self {
                reply,
                received: None,
                done: false,
                fail: false,
            }
        }
    }

    impl Exchange for Echo {
        type Output = u8;

        fn on_inbound(
            &mut self,
            source: Ipv4Addr,
            symbol: u8,
        ) -> ipstego_core::Result<InboundAction> {
            if self.fail {
                return Err(CoreError::buffer_full(0));
            }
            if source != PEER || self.received.is_some() {
                return Ok(InboundAction::Ignore);
            }
            self.received = Some(symbol);
            Ok(InboundAction::Consume)
        }

        fn on_outbound(&mut self, destination: Ipv4Addr) -> OutboundAction {
            if destination == PEER && self.received.is_some() && !self.done {
                self.done = true;
                return OutboundAction::Inject(self.reply);
            }
            OutboundAction::Pass
        }

        fn take_output(&mut self) -> Option<u8> {
            if self.done {
                self.received.take()
            } else {
                None
            }
        }
    }

    fn with_tos(src: Ipv4Addr, dst: Ipv4Addr, tos: u8) -> Vec<u8> {
        let packet = ipv4::build_packet(src, dst, 17, b"data");
        IpTos.write_field(&packet, tos).unwrap()
    }

    #[tokio::test]
    async fn test_drive_consumes_and_injects() {
        let inbound = Arc::new(MockQueue::new(10));
        let outbound = Arc::new(MockQueue::new(20));

        inbound.inject(with_tos(PEER, LOCAL, symbol::DISCOVER));
        {
            let inbound = Arc::clone(&inbound);
            let outbound = Arc::clone(&outbound);
            tokio::spawn(async move {
                while inbound.verdict_count() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                outbound.inject(ipv4::build_packet(LOCAL, Ipv4Addr::new(1, 1, 1, 1), 6, b"x"));
                outbound.inject(ipv4::build_packet(LOCAL, PEER, 6, b"y"));
            });
        }

        let mut echo = Echo::new(symbol::ACCEPT);
        let deadline = Some(Deadline::after(Duration::from_secs(5)));
        let output = drive(&mut echo, &*inbound, &*outbound, &IpTos, deadline)
            .await
            .unwrap();
        assert_eq!(output, Some(symbol::DISCOVER));

        let inbound_verdicts = inbound.take_verdicts();
        assert_eq!(inbound_verdicts.len(), 1);
        assert_eq!(IpTos::peek(inbound_verdicts[0].released()), Some(0));
        assert!(ipv4::checksum_valid(inbound_verdicts[0].released()));

        let outbound_verdicts = outbound.take_verdicts();
        assert_eq!(outbound_verdicts.len(), 2);
        assert!(!outbound_verdicts[0].verdict.is_modified());
        assert_eq!(IpTos::peek(outbound_verdicts[1].released()), Some(symbol::ACCEPT));
    }

    #[tokio::test]
    async fn test_non_ipv4_accepted_untouched() {
        let inbound = MockQueue::new(10);
        let outbound = MockQueue::new(20);
        inbound.inject(vec![0x60; 40]);

        let mut echo = Echo::new(0);
        let deadline = Some(Deadline::after(Duration::from_millis(50)));
        let output = drive(&mut echo, &inbound, &outbound, &IpTos, deadline)
            .await
            .unwrap();
        assert_eq!(output, None);

        let verdicts = inbound.take_verdicts();
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].verdict, Verdict::Accept);
    }

    #[tokio::test]
    async fn test_verdict_issued_before_error() {
        let inbound = MockQueue::new(10);
        let outbound = MockQueue::new(20);
        inbound.inject(with_tos(PEER, LOCAL, 0x03));

        let mut echo = Echo::new(0);
        echo.fail = true;
        let result = drive(&mut echo, &inbound, &outbound, &IpTos, None).await;
        assert!(result.unwrap_err().is_capacity_error());
        assert_eq!(inbound.verdict_count(), 1);
    }

    #[tokio::test]
    async fn test_completed_exchange_touches_no_packets() {
        let inbound = MockQueue::new(10);
        let outbound = MockQueue::new(20);
        inbound.inject(with_tos(PEER, LOCAL, symbol::OK));
        outbound.inject(ipv4::build_packet(LOCAL, PEER, 6, b"y"));

        let codec = SymbolCodec::default();
        let mut exchange = WriteExchange::new(PEER, &codec, &[]).unwrap();
        let output = drive(&mut exchange, &inbound, &outbound, &IpTos, None)
            .await
            .unwrap();
        assert_eq!(output, Some(0));
        assert_eq!(inbound.verdict_count(), 0);
        assert_eq!(outbound.verdict_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_deadline_returns_none() {
        let inbound = MockQueue::new(10);
        let outbound = MockQueue::new(20);
        let mut echo = Echo::new(0);
        let deadline = Some(Deadline::after(Duration::ZERO));
        let output = drive(&mut echo, &inbound, &outbound, &IpTos, deadline)
            .await
            .unwrap();
        assert!(output.is_none());
    }
}
