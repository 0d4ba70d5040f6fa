// ============================================
// File: crates/ipstego-transport/src/queue/mod.rs
// ============================================
//! # Packet Queue Module
//!
//! ## Creation Reason
//! Implementations of [`PacketFlow`](crate::traits::PacketFlow): where
//! intercepted packets come from and where verdicts go.
//!
//! ## Platform Implementations
//! - `linux`: netfilter NFQUEUE over a raw netlink socket
//! - `mock`: in-memory queue for testing
//!
//! ## How Interception Works
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     User Space                            │
//! │  ┌────────────────┐          ┌────────────────────────┐   │
//! │  │  Application   │          │  ipstego connection    │   │
//! │  │ (ping, curl..) │          │  recv → TOS → verdict  │   │
//! │  └───────┬────────┘          └───────────▲────────────┘   │
//! │          │                               │ netlink        │
//! ├──────────┼───────────────────────────────┼────────────────┤
//! │          ▼          Kernel Space         │                │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │   netfilter hook ── NFQUEUE rule ── queue N         │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NFQUEUE binding requires root or `CAP_NET_ADMIN`
//! - A connection needs two queues: one for INPUT, one for OUTPUT
//!
//! ## Last Modified
//! v0.1.0 - Initial queue module structure

pub mod netlink;

// Platform-specific implementations
#[cfg(target_os = "linux")]
pub mod linux;

// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::NfQueue;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockQueue, VerdictRecord};

/// Default number of packets a queue holds before dropping.
pub const DEFAULT_QUEUE_DEPTH: usize = 100;
