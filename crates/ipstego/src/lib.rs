// ============================================
// File: crates/ipstego/src/lib.rs
// ============================================
//! # ipstego - Covert Channel over IPv4 TOS
//!
//! ## Creation Reason
//! Carries an application byte stream inside the Type-of-Service byte of
//! IPv4 packets the host is already sending and receiving. Packets are
//! intercepted with netfilter queues, rewritten, and released.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`listener`]: `dial`, `listen` and `Listener::accept`
//! - [`connection`]: handshake, `read`, `write`, deadlines, `close`
//! - [`engine`]: the loop feeding intercepted packets to an exchange
//! - [`config`]: TOML configuration
//! - [`error`]: connection-level error types
//!
//! ## Architecture Overview
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          ipstego                              │
//! │  ┌──────────┐    ┌──────────────┐    ┌──────────────────────┐ │
//! │  │ dial /   │───►│  Connection  │───►│  engine::drive       │ │
//! │  │ listen   │    │ read / write │    │  select! in / out    │ │
//! │  └──────────┘    └──────────────┘    └──────────┬───────────┘ │
//! ├─────────────────────────────────────────────────┼─────────────┤
//! │  ipstego-core: codec + exchanges                │             │
//! │  ipstego-transport: NfQueue / MockQueue ◄───────┘             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! write(buf) → encode → START, symbols..., END → outbound TOS → peer
//! read(buf)  ← decode ← symbols from peer ← inbound TOS (cleared on release)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Binding queues requires root or `CAP_NET_ADMIN`, plus iptables
//!   `NFQUEUE` rules sending INPUT and OUTPUT to the two queue numbers
//! - Throughput is one byte of covert data per 8/7 intercepted packets;
//!   without ambient traffic towards the peer nothing moves
//! - Enable the `mock` feature to drive connections over in-memory queues
//!
//! ## Last Modified
//! v0.1.0 - Initial library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod listener;

// Re-export primary types
pub use config::StegoConfig;
pub use connection::{Connection, Role};
pub use error::{Result, StegoError};
pub use listener::{dial, listen, Listener};

pub use ipstego_common::{ChannelKind, Deadline, StegoAddr};
