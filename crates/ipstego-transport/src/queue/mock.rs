// ============================================
// File: crates/ipstego-transport/src/queue/mock.rs
// ============================================
//! # Mock Packet Queue
//!
//! ## Creation Reason
//! Exercising the protocol against a real NFQUEUE needs root and two hosts.
//! `MockQueue` is an in-memory stand-in that behaves like one bound queue.
//!
//! ## Main Functionality
//! - Bounded pending queue; packets beyond the depth are dropped and counted
//! - Captured verdicts for verification
//! - Optional link: the bytes released by a verdict are injected into a
//!   peer queue, simulating the wire between two hosts
//!
//! ## Simulated Wire
//! ```text
//!  host A                                     host B
//!  outbound(A) ── verdict ──► link ──► inbound(B)
//!  inbound(A)  ◄── link ◄── verdict ── outbound(B)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Links hold an `Arc` to the peer; two queues linked both ways form a
//!   cycle, so call `unlink` if the test cares about drop order
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{InterceptedPacket, PacketFlow, Verdict};

use super::DEFAULT_QUEUE_DEPTH;

// ============================================
// VerdictRecord
// ============================================

/// A verdict captured by [`MockQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictRecord {
    /// Id of the packet the verdict was for
    pub packet_id: u32,
    /// Bytes of the packet as it was intercepted
    pub original: Vec<u8>,
    /// Verdict issued
    pub verdict: Verdict,
}

impl VerdictRecord {
    /// Bytes that left the queue after the verdict.
    #[must_use]
    pub fn released(&self) -> &[u8] {
        match &self.verdict {
            Verdict::Accept => &self.original,
            Verdict::AcceptModified(data) => data,
        }
    }
}

// ============================================
// MockQueue
// ============================================

/// In-memory packet queue for testing.
///
/// # Example
/// ```ignore
/// use ipstego_transport::queue::MockQueue;
/// use ipstego_transport::traits::{PacketFlow, Verdict};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = MockQueue::new(10);
/// queue.inject(vec![0x45; 20]);
///
/// let packet = queue.recv().await?;
/// queue.verdict(packet, Verdict::Accept).await?;
/// assert_eq!(queue.verdict_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockQueue {
    queue_id: u16,
    depth: usize,
    pending: Mutex<VecDeque<InterceptedPacket>>,
    verdicts: Mutex<Vec<VerdictRecord>>,
    link: Mutex<Option<Arc<MockQueue>>>,
    next_id: AtomicU32,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl MockQueue {
    /// Creates a queue with the default depth.
    #[must_use]
    pub fn new(queue_id: u16) -> Self {
        Self::with_depth(queue_id, DEFAULT_QUEUE_DEPTH)
    }

    /// Creates a queue holding at most `depth` pending packets.
    #[must_use]
    pub fn with_depth(queue_id: u16, depth: usize) -> Self {
        Self {
            queue_id,
            depth,
            pending: Mutex::new(VecDeque::with_capacity(depth)),
            verdicts: Mutex::new(Vec::new()),
            link: Mutex::new(None),
            next_id: AtomicU32::new(1),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Forwards every released packet into `peer`.
    pub fn link(&self, peer: Arc<MockQueue>) {
        *self.link.lock() = Some(peer);
    }

    /// Stops forwarding released packets.
    pub fn unlink(&self) {
        *self.link.lock() = None;
    }

    /// Queues a packet as if the kernel had intercepted it.
    ///
    /// Returns `false` if the queue is full or closed; the packet is dropped.
    pub fn inject(&self, data: Vec<u8>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut pending = self.pending.lock();
        if pending.len() >= self.depth {
            drop(pending);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(queue = self.queue_id, "Mock queue full, dropping packet");
            return false;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        pending.push_back(InterceptedPacket::new(id, data));
        drop(pending);
        self.notify.notify_one();
        true
    }

    /// Takes all captured verdicts.
    #[must_use]
    pub fn take_verdicts(&self) -> Vec<VerdictRecord> {
        std::mem::take(&mut *self.verdicts.lock())
    }

    /// Number of verdicts captured and not yet taken.
    #[must_use]
    pub fn verdict_count(&self) -> usize {
        self.verdicts.lock().len()
    }

    /// Number of packets waiting for `recv`.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of packets dropped because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns `true` once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed {
                queue: self.queue_id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PacketFlow for MockQueue {
    async fn recv(&self) -> Result<InterceptedPacket> {
        loop {
            // Registered before checking so a concurrent close is not missed
            let notified = self.notify.notified();
            self.ensure_open()?;
            let next = self.pending.lock().pop_front();
            if let Some(packet) = next {
                return Ok(packet);
            }
            notified.await;
        }
    }

    async fn verdict(&self, packet: InterceptedPacket, verdict: Verdict) -> Result<()> {
        self.ensure_open()?;
        let record = VerdictRecord {
            packet_id: packet.id(),
            original: packet.into_data(),
            verdict,
        };

        let link = self.link.lock().clone();
        if let Some(peer) = link {
            peer.inject(record.released().to_vec());
        }

        self.verdicts.lock().push(record);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.pending.lock().clear();
        self.notify.notify_waiters();
        Ok(())
    }

    fn queue_id(&self) -> u16 {
        self.queue_id
    }
}

impl std::fmt::Debug for MockQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockQueue")
            .field("queue_id", &self.queue_id)
            .field("depth", &self.depth)
            .field("pending", &self.pending_count())
            .field("verdicts", &self.verdict_count())
            .field("dropped", &self.dropped_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
