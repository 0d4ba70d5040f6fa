// ============================================
// File: crates/ipstego/src/connection.rs
// ============================================
//! # Covert Connection
//!
//! ## Creation Reason
//! Stream-style surface over the exchanges: one handshake at creation,
//! then every `read` / `write` call runs one complete transfer against
//! the two packet flows.
//!
//! ## Main Functionality
//! - `Connection::initiate` / `Connection::respond`: handshake and bind peer
//! - `read`: receive one transfer into the caller's buffer
//! - `write`: send one transfer of at most `max_payload` bytes
//! - Deadlines and channel-tagged addresses
//! - `close`: releases both flows
//!
//! ## Connection Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ initiate / respond                                         │
//! │   └─► handshake (timeout) ─► peer bound                    │
//! │                                                            │
//! │ read / write (repeatable, one transfer per call)           │
//! │                                                            │
//! │ close(self)                                                │
//! │   └─► both flows unbound                                   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A connection is driven by one task at a time; `read` and `write`
//!   take `&mut self`
//! - Read and write deadlines are only consulted when
//!   `limits.enforce_data_deadlines` is set
//! - A failed transfer leaves the peer's exchange half done; there is no
//!   resynchronisation, callers should close and dial again
//!
//! ## Last Modified
//! v0.1.0 - Initial connection implementation

use std::fmt;
use std::net::Ipv4Addr;

use tracing::{debug, info, warn};

use ipstego_common::time::Deadline;
use ipstego_common::types::{ChannelKind, StegoAddr};
use ipstego_core::{AcceptExchange, DiscoverExchange, ReadExchange, SymbolCodec, WriteExchange};
use ipstego_transport::{FieldAccessor, IpTos, PacketFlow};

use crate::config::LimitsConfig;
use crate::engine::drive;
use crate::error::{Result, StegoError};

// ============================================
// Role
// ============================================

/// Which side of the handshake a connection played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sent the discover; created by `dial`.
    Initiator,
    /// Answered the discover; created by `Listener::accept`.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Responder => write!(f, "responder"),
        }
    }
}

/// Returns the field accessor carrying symbols for `kind`.
fn accessor_for(kind: ChannelKind) -> Box<dyn FieldAccessor> {
    match kind {
        ChannelKind::IpTos => Box::new(IpTos),
    }
}

// ============================================
// Connection
// ============================================

/// A covert byte stream bound to one peer.
pub struct Connection {
    kind: ChannelKind,
    role: Role,
    peer: Ipv4Addr,
    codec: SymbolCodec,
    accessor: Box<dyn FieldAccessor>,
    inbound: Box<dyn PacketFlow>,
    outbound: Box<dyn PacketFlow>,
    read_deadline: Option<Deadline>,
    write_deadline: Option<Deadline>,
    enforce_deadlines: bool,
}

impl Connection {
    /// Runs the initiator handshake over `inbound` / `outbound`.
    ///
    /// Both flows are closed if the handshake fails.
    ///
    /// # Errors
    /// - `DiscoverTimeout`: no peer completed the handshake in time
    /// - `Transport`: a flow failed
    pub async fn initiate(
        kind: ChannelKind,
        inbound: Box<dyn PacketFlow>,
        outbound: Box<dyn PacketFlow>,
        limits: &LimitsConfig,
    ) -> Result<Self> {
        let mut exchange = DiscoverExchange::new();
        Self::establish(kind, Role::Initiator, &mut exchange, inbound, outbound, limits).await
    }

    /// Runs the responder handshake over `inbound` / `outbound`.
    ///
    /// Both flows are closed if the handshake fails.
    ///
    /// # Errors
    /// - `AcceptTimeout`: no initiator completed the handshake in time
    /// - `Transport`: a flow failed
    pub async fn respond(
        kind: ChannelKind,
        inbound: Box<dyn PacketFlow>,
        outbound: Box<dyn PacketFlow>,
        limits: &LimitsConfig,
    ) -> Result<Self> {
        let mut exchange = AcceptExchange::new();
        Self::establish(kind, Role::Responder, &mut exchange, inbound, outbound, limits).await
    }

    async fn establish<E>(
        kind: ChannelKind,
        role: Role,
        exchange: &mut E,
        inbound: Box<dyn PacketFlow>,
        outbound: Box<dyn PacketFlow>,
        limits: &LimitsConfig,
    ) -> Result<Self>
    where
        E: ipstego_core::Exchange<Output = Ipv4Addr>,
    {
        let accessor = accessor_for(kind);
        let timeout = limits.handshake_timeout();
        info!(
            %kind,
            %role,
            inbound = inbound.queue_id(),
            outbound = outbound.queue_id(),
            ?timeout,
            "Starting handshake"
        );

        let outcome = drive(
            exchange,
            inbound.as_ref(),
            outbound.as_ref(),
            accessor.as_ref(),
            Some(Deadline::after(timeout)),
        )
        .await;

        let peer = match outcome {
            Ok(Some(peer)) => peer,
            Ok(None) => {
                release(inbound.as_ref(), outbound.as_ref()).await;
                return Err(match role {
                    Role::Initiator => StegoError::DiscoverTimeout { timeout },
                    Role::Responder => StegoError::AcceptTimeout { timeout },
                });
            }
            Err(e) => {
                release(inbound.as_ref(), outbound.as_ref()).await;
                return Err(e);
            }
        };

        info!(%kind, %role, %peer, "Handshake complete");
        Ok(Self {
            kind,
            role,
            peer,
            codec: SymbolCodec::new(limits.max_payload),
            accessor,
            inbound,
            outbound,
            read_deadline: None,
            write_deadline: None,
            enforce_deadlines: limits.enforce_data_deadlines,
        })
    }

    /// Receives one transfer from the peer into `buf`.
    ///
    /// # Errors
    /// - `ShortCallerBuffer`: `buf` cannot hold the payload; nothing is copied
    /// - `Core(BufferFull)`: the peer sent more than `max_payload` bytes
    /// - `DeadlineExceeded`: only with deadline enforcement enabled
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut exchange = ReadExchange::new(self.peer, self.codec.decoder());
        let deadline = self.effective(self.read_deadline);

        let payload = drive(
            &mut exchange,
            self.inbound.as_ref(),
            self.outbound.as_ref(),
            self.accessor.as_ref(),
            deadline,
        )
        .await?
        .ok_or(StegoError::DeadlineExceeded { operation: "read" })?;

        if payload.len() > buf.len() {
            return Err(StegoError::ShortCallerBuffer {
                needed: payload.len(),
                available: buf.len(),
            });
        }
        buf[..payload.len()].copy_from_slice(&payload);

        debug!(peer = %self.peer, bytes = payload.len(), "Read complete");
        Ok(payload.len())
    }

    /// Sends `buf` to the peer as one transfer.
    ///
    /// An empty `buf` returns `0` without touching any packet.
    ///
    /// # Errors
    /// - `Core(BufferTooSmall)`: `buf` exceeds `max_payload`; rejected
    ///   before any packet is touched
    /// - `DeadlineExceeded`: only with deadline enforcement enabled
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut exchange = WriteExchange::new(self.peer, &self.codec, buf)?;
        let deadline = self.effective(self.write_deadline);

        debug!(
            peer = %self.peer,
            bytes = buf.len(),
            symbols = exchange.symbol_count(),
            "Starting write"
        );

        let written = drive(
            &mut exchange,
            self.inbound.as_ref(),
            self.outbound.as_ref(),
            self.accessor.as_ref(),
            deadline,
        )
        .await?
        .ok_or(StegoError::DeadlineExceeded { operation: "write" })?;

        debug!(peer = %self.peer, bytes = written, "Write complete");
        Ok(written)
    }

    /// Closes both packet flows.
    ///
    /// Both are closed even if the first fails; the first error is returned.
    ///
    /// # Errors
    /// Returns the flow's error if unbinding fails.
    pub async fn close(self) -> Result<()> {
        info!(peer = %self.peer, role = %self.role, "Closing connection");
        let inbound = self.inbound.close().await;
        let outbound = self.outbound.close().await;
        inbound?;
        outbound?;
        Ok(())
    }

    /// Sets both the read and the write deadline.
    pub fn set_deadline(&mut self, deadline: Option<Deadline>) {
        self.read_deadline = deadline;
        self.write_deadline = deadline;
    }

    /// Sets the deadline for future `read` calls.
    pub fn set_read_deadline(&mut self, deadline: Option<Deadline>) {
        self.read_deadline = deadline;
    }

    /// Sets the deadline for future `write` calls.
    pub fn set_write_deadline(&mut self, deadline: Option<Deadline>) {
        self.write_deadline = deadline;
    }

    /// Local address; carries only the channel kind.
    #[must_use]
    pub const fn local_addr(&self) -> StegoAddr {
        StegoAddr::new(self.kind)
    }

    /// Remote address: the channel kind and the bound peer.
    #[must_use]
    pub const fn remote_addr(&self) -> StegoAddr {
        StegoAddr::with_ip(self.kind, self.peer)
    }

    /// Peer bound by the handshake.
    #[must_use]
    pub const fn peer(&self) -> Ipv4Addr {
        self.peer
    }

    /// Side of the handshake this connection took.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Largest payload accepted by `write`.
    #[must_use]
    pub const fn max_payload(&self) -> usize {
        self.codec.max_payload()
    }

    fn effective(&self, deadline: Option<Deadline>) -> Option<Deadline> {
        if self.enforce_deadlines {
            deadline
        } else {
            None
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("inbound", &self.inbound.queue_id())
            .field("outbound", &self.outbound.queue_id())
            .field("max_payload", &self.codec.max_payload())
            .finish_non_exhaustive()
    }
}

async fn release(inbound: &dyn PacketFlow, outbound: &dyn PacketFlow) {
    for flow in [inbound, outbound] {
        if let Err(e) = flow.close().await {
            warn!(queue = flow.queue_id(), error = %e, "Failed to close flow");
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use ipstego_core::symbol;
    use ipstego_transport::ipv4;
    use ipstego_transport::queue::MockQueue;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const PEER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    fn limits(timeout_secs: u64) -> LimitsConfig {
        LimitsConfig {
            handshake_timeout_secs: timeout_secs,
            ..LimitsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_respond_binds_discovering_peer() {
        let inbound = Arc::new(MockQueue::new(10));
        let outbound = Arc::new(MockQueue::new(20));

        let discover = ipv4::build_packet(PEER, LOCAL, 17, b"d");
        inbound.inject(IpTos.write_field(&discover, symbol::DISCOVER).unwrap());

        let driver = {
            let inbound = Arc::clone(&inbound);
            let outbound = Arc::clone(&outbound);
            tokio::spawn(async move {
                while inbound.verdict_count() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                outbound.inject(ipv4::build_packet(LOCAL, PEER, 17, b"a"));
                while outbound.verdict_count() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                let ok = ipv4::build_packet(PEER, LOCAL, 17, b"o");
                inbound.inject(IpTos.write_field(&ok, symbol::OK).unwrap());
            })
        };

        let conn = Connection::respond(
            ChannelKind::IpTos,
            Box::new(Arc::clone(&inbound)),
            Box::new(Arc::clone(&outbound)),
            &limits(5),
        )
        .await
        .unwrap();
        driver.await.unwrap();

        assert_eq!(conn.peer(), PEER);
        assert_eq!(conn.role(), Role::Responder);
        assert_eq!(conn.remote_addr().ip(), Some(PEER));
        assert_eq!(conn.local_addr().to_string(), "IP.TOS");

        let accepted = outbound.take_verdicts();
        assert_eq!(IpTos::peek(accepted[0].released()), Some(symbol::ACCEPT));

        conn.close().await.unwrap();
        assert!(inbound.is_closed());
        assert!(outbound.is_closed());
    }

    #[tokio::test]
    async fn test_initiate_timeout_closes_flows() {
        let inbound = Arc::new(MockQueue::new(10));
        let outbound = Arc::new(MockQueue::new(20));

        let err = Connection::initiate(
            ChannelKind::IpTos,
            Box::new(Arc::clone(&inbound)),
            Box::new(Arc::clone(&outbound)),
            &limits(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StegoError::DiscoverTimeout { .. }));
        assert!(err.is_timeout());
        assert!(inbound.is_closed());
        assert!(outbound.is_closed());
    }

    #[tokio::test]
    async fn test_respond_timeout() {
        let err = Connection::respond(
            ChannelKind::IpTos,
            Box::new(MockQueue::new(10)),
            Box::new(MockQueue::new(20)),
            &limits(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StegoError::AcceptTimeout { .. }));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Initiator.to_string(), "initiator");
        assert_eq!(Role::Responder.to_string(), "responder");
    }
}
