// ============================================
// File: crates/ipstego-transport/src/queue/linux.rs
// ============================================
//! # Linux NFQUEUE Implementation
//!
//! ## Creation Reason
//! Binds one netfilter queue over a raw `NETLINK_NETFILTER` socket so the
//! protocol can see and rewrite packets matched by an iptables `NFQUEUE`
//! rule.
//!
//! ## Setup
//! 1. Open a non-blocking netlink socket and bind it
//! 2. `CMD_BIND` the queue number for `AF_INET`
//! 3. Switch to `COPY_PACKET` mode with the full copy range
//! 4. Limit the kernel-side queue length
//!
//! ## Required Capabilities
//! - `CAP_NET_ADMIN`: for binding the queue
//! - Or run as root
//!
//! ## Example iptables rules
//! ```text
//! iptables -A INPUT  -j NFQUEUE --queue-num 10
//! iptables -A OUTPUT -j NFQUEUE --queue-num 20
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every packet handed out must get a verdict or the kernel keeps it
//! - Acks for config requests and packets share the socket; packets seen
//!   while waiting for an ack are buffered, not dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial NFQUEUE implementation

#![cfg(target_os = "linux")]

use std::collections::VecDeque;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use nix::libc;
use parking_lot::Mutex;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{InterceptedPacket, PacketFlow, Verdict};

use super::netlink::{self, ConfigCommand, Message, MAX_COPY_RANGE, RECV_BUFFER_SIZE};

// ============================================
// NfQueue
// ============================================

/// One bound netfilter queue.
///
/// # Example
/// ```ignore
/// use ipstego_transport::queue::NfQueue;
///
/// let queue = NfQueue::open(10, 100).await?;
/// let packet = queue.recv().await?;
/// queue.verdict(packet, Verdict::Accept).await?;
/// ```
pub struct NfQueue {
    /// Async wrapper around the netlink socket
    fd: AsyncFd<OwnedFd>,
    /// Queue number
    queue_id: u16,
    /// Netlink sequence counter
    seq: AtomicU32,
    /// Packets received while waiting for something else
    backlog: Mutex<VecDeque<InterceptedPacket>>,
    /// Datagram buffer reused across receives
    recv_buf: Mutex<Vec<u8>>,
    /// Set once the queue has been unbound
    closed: AtomicBool,
}

impl NfQueue {
    /// Opens and binds queue `queue_id`, holding at most `max_len` packets
    /// in the kernel.
    ///
    /// # Errors
    /// - `PermissionDenied`: lacking `CAP_NET_ADMIN`
    /// - `BindFailed`: the kernel refused one of the setup requests
    pub async fn open(queue_id: u16, max_len: u32) -> Result<Self> {
        info!(queue = queue_id, max_len, "Binding netfilter queue");

        let fd = open_socket(queue_id)?;
        // SAFETY: `fd` is an open descriptor moved into the `AsyncFd`, which
        // owns it until drop.
        let async_fd = unsafe { AsyncFd::register(fd) }.map_err(|e| {
            let (_, cause) = e.into_parts();
            TransportError::bind_failed(queue_id, format!("AsyncFd registration failed: {cause}"))
        })?;

        let queue = Self {
            fd: async_fd,
            queue_id,
            seq: AtomicU32::new(1),
            backlog: Mutex::new(VecDeque::new()),
            recv_buf: Mutex::new(vec![0u8; RECV_BUFFER_SIZE]),
            closed: AtomicBool::new(false),
        };

        queue
            .request(|seq| netlink::config_command(seq, queue_id, ConfigCommand::Bind))
            .await?;
        queue
            .request(|seq| netlink::config_params(seq, queue_id, MAX_COPY_RANGE))
            .await?;
        queue
            .request(|seq| netlink::config_max_len(seq, queue_id, max_len))
            .await?;

        debug!(queue = queue_id, "Netfilter queue bound");
        Ok(queue)
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends a config request and waits for its ack.
    async fn request(&self, build: impl FnOnce(u32) -> Bytes) -> Result<()> {
        let seq = self.next_seq();
        self.send(&build(seq)).await?;

        loop {
            for message in self.receive_batch().await? {
                match message {
                    Message::Ack { seq: acked } if acked == seq => return Ok(()),
                    Message::Error { seq: failed, errno } if failed == seq => {
                        let err = io::Error::from_raw_os_error(errno);
                        if err.kind() == io::ErrorKind::PermissionDenied {
                            return Err(TransportError::PermissionDenied {
                                operation: format!("configure netfilter queue {}", self.queue_id),
                            });
                        }
                        return Err(TransportError::bind_failed(self.queue_id, err.to_string()));
                    }
                    Message::Packet(packet) => {
                        self.backlog.lock().push_back(packet);
                    }
                    Message::Overrun => {
                        warn!(queue = self.queue_id, "Netlink overrun, packets lost");
                    }
                    Message::Ack { .. } | Message::Error { .. } => {}
                }
            }
        }
    }

    async fn send(&self, message: &[u8]) -> Result<()> {
        loop {
            let mut guard = self
                .fd
                .ready(Interest::WRITABLE)
                .await
                .map_err(|e| TransportError::io("netlink send readiness", e))?;

            match guard.try_io(|inner| send_to_kernel(inner.get_ref().as_raw_fd(), message)) {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => return Err(TransportError::io("netlink send", e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Reads one datagram and parses it.
    ///
    /// The only await point is readiness, so cancelling loses nothing.
    async fn receive_batch(&self) -> Result<Vec<Message>> {
        loop {
            let mut guard = self
                .fd
                .ready(Interest::READABLE)
                .await
                .map_err(|e| TransportError::receive_failed(self.queue_id, e.to_string()))?;

            match guard.try_io(|inner| receive_into(inner.get_ref().as_raw_fd(), &self.recv_buf)) {
                Ok(Ok(parsed)) => return parsed,
                Ok(Err(e)) if e.raw_os_error() == Some(libc::ENOBUFS) => {
                    warn!(queue = self.queue_id, "Socket buffer overflow, packets lost");
                }
                Ok(Err(e)) => return Err(TransportError::receive_failed(self.queue_id, e.to_string())),
                Err(_would_block) => continue,
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed {
                queue: self.queue_id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PacketFlow for NfQueue {
    async fn recv(&self) -> Result<InterceptedPacket> {
        loop {
            self.ensure_open()?;
            let buffered = self.backlog.lock().pop_front();
            if let Some(packet) = buffered {
                return Ok(packet);
            }

            let mut packets = Vec::new();
            for message in self.receive_batch().await? {
                match message {
                    Message::Packet(packet) => packets.push(packet),
                    Message::Error { seq, errno } => {
                        warn!(queue = self.queue_id, seq, errno, "Kernel rejected a request");
                    }
                    Message::Overrun => {
                        warn!(queue = self.queue_id, "Netlink overrun, packets lost");
                    }
                    Message::Ack { .. } => {}
                }
            }
            self.backlog.lock().extend(packets);
        }
    }

    async fn verdict(&self, packet: InterceptedPacket, verdict: Verdict) -> Result<()> {
        self.ensure_open()?;
        let id = packet.id();
        let message = match &verdict {
            Verdict::Accept => netlink::verdict_accept(self.next_seq(), self.queue_id, id, None),
            Verdict::AcceptModified(data) => {
                netlink::verdict_accept(self.next_seq(), self.queue_id, id, Some(data))
            }
        };
        self.send(&message)
            .await
            .map_err(|e| TransportError::verdict_failed(self.queue_id, id, e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(queue = self.queue_id, "Unbinding netfilter queue");
        let pending = mem::take(&mut *self.backlog.lock());
        for packet in pending {
            let id = packet.id();
            let message = netlink::verdict_accept(self.next_seq(), self.queue_id, id, None);
            if let Err(e) = self.send(&message).await {
                warn!(queue = self.queue_id, packet_id = id, error = %e, "Failed to release packet");
            }
        }
        let queue_id = self.queue_id;
        self.request(|seq| netlink::config_command(seq, queue_id, ConfigCommand::Unbind))
            .await
    }

    fn queue_id(&self) -> u16 {
        self.queue_id
    }
}

impl std::fmt::Debug for NfQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfQueue")
            .field("queue_id", &self.queue_id)
            .field("fd", &self.fd.get_ref().as_raw_fd())
            .field("backlog", &self.backlog.lock().len())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

// ============================================
// Socket Helpers
// ============================================

fn open_socket(queue_id: u16) -> Result<OwnedFd> {
    let raw = unsafe {
        libc::socket(
            libc::AF_NETLINK,
            libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
            libc::NETLINK_NETFILTER,
        )
    };
    if raw < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::PermissionDenied {
            return Err(TransportError::PermissionDenied {
                operation: "open netlink socket".into(),
            });
        }
        return Err(TransportError::bind_failed(queue_id, format!("socket() failed: {err}")));
    }
    // SAFETY: `raw` is a freshly created descriptor we own.
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
    addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;

    let result = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            std::ptr::addr_of!(addr).cast::<libc::sockaddr>(),
            mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
        )
    };
    if result < 0 {
        let err = io::Error::last_os_error();
        return Err(TransportError::bind_failed(queue_id, format!("bind() failed: {err}")));
    }

    Ok(fd)
}

fn send_to_kernel(fd: libc::c_int, message: &[u8]) -> io::Result<()> {
    let mut kernel: libc::sockaddr_nl = unsafe { mem::zeroed() };
    kernel.nl_family = libc::AF_NETLINK as libc::sa_family_t;

    let result = unsafe {
        libc::sendto(
            fd,
            message.as_ptr().cast::<libc::c_void>(),
            message.len(),
            0,
            std::ptr::addr_of!(kernel).cast::<libc::sockaddr>(),
            mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Receives one datagram into `buf` and parses it; the lock is held only
/// for the syscall and the parse.
fn receive_into(fd: libc::c_int, buf: &Mutex<Vec<u8>>) -> io::Result<Result<Vec<Message>>> {
    let mut buf = buf.lock();
    let len = recv_from_kernel(fd, &mut buf)?;
    Ok(netlink::parse(&buf[..len]))
}

fn recv_from_kernel(fd: libc::c_int, buf: &mut [u8]) -> io::Result<usize> {
    let result = unsafe { libc::recv(fd, buf.as_mut_ptr().cast::<libc::c_void>(), buf.len(), 0) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(result as usize)
}

// ============================================
// Tests
// ============================================
