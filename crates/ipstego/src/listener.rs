// ============================================
// File: crates/ipstego/src/listener.rs
// ============================================
//! # Dial and Listen
//!
//! ## Creation Reason
//! Entry points that resolve a channel kind string, bind the two netfilter
//! queues and run the matching side of the handshake.
//!
//! ## Main Functionality
//! - `dial`: bind queues, run the initiator handshake
//! - `listen` / `Listener::accept`: bind queues per accept, run the
//!   responder handshake
//!
//! ## ⚠️ Important Note for Next Developer
//! - Queues are bound per connection, not per listener; two connections
//!   on the same queue numbers cannot coexist
//! - Only Linux has a queue implementation; elsewhere dial and accept fail
//!   with `TransportError::Unsupported`
//!
//! ## Last Modified
//! v0.1.0 - Initial dial/listen implementation

use tracing::info;

use ipstego_common::error::CommonError;
use ipstego_common::types::{ChannelKind, StegoAddr};
use ipstego_transport::PacketFlow;

use crate::config::LimitsConfig;
use crate::connection::Connection;
use crate::error::Result;

/// Connects to whichever peer answers first on the channel.
///
/// # Errors
/// - `UnsupportedChannelType`: `kind` is not a known channel
/// - `InvalidInput`: both queue numbers are the same
/// - `Transport`: a queue could not be bound
/// - `DiscoverTimeout`: nobody answered within the handshake timeout
pub async fn dial(
    kind: &str,
    inbound_queue: u16,
    outbound_queue: u16,
    limits: &LimitsConfig,
) -> Result<Connection> {
    let kind = resolve(kind, inbound_queue, outbound_queue)?;
    info!(%kind, inbound_queue, outbound_queue, "Dialing");
    let (inbound, outbound) = open_pair(inbound_queue, outbound_queue, limits.queue_depth).await?;
    Connection::initiate(kind, inbound, outbound, limits).await
}

/// Prepares a listener; no queue is bound until `accept`.
///
/// # Errors
/// `UnsupportedChannelType` or `InvalidInput`, as for [`dial`].
pub fn listen(
    kind: &str,
    inbound_queue: u16,
    outbound_queue: u16,
    limits: &LimitsConfig,
) -> Result<Listener> {
    let kind = resolve(kind, inbound_queue, outbound_queue)?;
    Ok(Listener {
        kind,
        inbound_queue,
        outbound_queue,
        limits: limits.clone(),
    })
}

fn resolve(kind: &str, inbound_queue: u16, outbound_queue: u16) -> Result<ChannelKind> {
    let kind: ChannelKind = kind.parse()?;
    if inbound_queue == outbound_queue {
        return Err(CommonError::invalid_input(
            "outbound_queue",
            format!("queue {outbound_queue} is already the inbound queue"),
        )
        .into());
    }
    Ok(kind)
}

// ============================================
// Listener
// ============================================

/// Accepts covert connections on a pair of queues.
#[derive(Debug, Clone)]
pub struct Listener {
    kind: ChannelKind,
    inbound_queue: u16,
    outbound_queue: u16,
    limits: LimitsConfig,
}

impl Listener {
    /// Binds the queues and waits for an initiator.
    ///
    /// # Errors
    /// - `Transport`: a queue could not be bound
    /// - `AcceptTimeout`: no initiator within the handshake timeout
    pub async fn accept(&self) -> Result<Connection> {
        info!(
            kind = %self.kind,
            inbound_queue = self.inbound_queue,
            outbound_queue = self.outbound_queue,
            "Accepting"
        );
        let (inbound, outbound) =
            open_pair(self.inbound_queue, self.outbound_queue, self.limits.queue_depth).await?;
        Connection::respond(self.kind, inbound, outbound, &self.limits).await
    }

    /// Address the listener accepts on.
    #[must_use]
    pub const fn addr(&self) -> StegoAddr {
        StegoAddr::new(self.kind)
    }
}

// ============================================
// Queue Binding
// ============================================

type FlowPair = (Box<dyn PacketFlow>, Box<dyn PacketFlow>);

#[cfg(target_os = "linux")]
async fn open_pair(inbound_queue: u16, outbound_queue: u16, depth: u32) -> Result<FlowPair> {
    use ipstego_transport::NfQueue;
    use tracing::warn;

    let inbound = NfQueue::open(inbound_queue, depth).await?;
    match NfQueue::open(outbound_queue, depth).await {
        Ok(outbound) => Ok((Box::new(inbound), Box::new(outbound))),
        Err(e) => {
            if let Err(close_err) = inbound.close().await {
                warn!(queue = inbound_queue, error = %close_err, "Failed to release queue");
            }
            Err(e.into())
        }
    }
}

#[cfg(not(target_os = "linux"))]
async fn open_pair(_inbound_queue: u16, _outbound_queue: u16, _depth: u32) -> Result<FlowPair> {
    Err(ipstego_transport::TransportError::Unsupported.into())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StegoError;

    #[tokio::test]
    async fn test_dial_unsupported_kind() {
        let err = dial("TCP.SEQ", 10, 20, &LimitsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StegoError::Common(CommonError::UnsupportedChannelType { .. })
        ));
        assert_eq!(err.to_string(), "TCP.SEQ stego type is not supported");
    }

    #[test]
    fn test_listen_unsupported_kind() {
        let err = listen("ip.tos", 10, 20, &LimitsConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StegoError::Common(CommonError::UnsupportedChannelType { .. })
        ));
    }

    #[test]
    fn test_same_queue_rejected() {
        let err = listen("IP.TOS", 10, 10, &LimitsConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StegoError::Common(CommonError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_listen_addr() {
        let listener = listen("IP.TOS", 10, 20, &LimitsConfig::default()).unwrap();
        let addr = listener.addr();
        assert_eq!(addr.kind(), ChannelKind::IpTos);
        assert_eq!(addr.to_string(), "IP.TOS");
        assert_eq!(addr.ip(), None);
    }
}
