// ============================================
// File: crates/ipstego-core/src/lib.rs
// ============================================
//! # ipstego Core - Protocol Library
//!
//! ## Creation Reason
//! Everything that decides *what* goes into a packet's covert field lives
//! here, free of any I/O: the control symbols, the bit-stuffing symbol
//! codec, and the four state machines (handshake initiator, handshake
//! responder, read, write).
//!
//! ## Main Functionality
//!
//! ### Codec Module ([`codec`])
//! - `SymbolCodec`: payload bytes → wire symbols with the framing bit set
//! - `SymbolDecoder`: incremental decoder with a bounded bit buffer
//!
//! ### Exchange Module ([`exchange`])
//! - `Exchange` trait: one inbound/outbound transition function per machine
//! - `DiscoverExchange` / `AcceptExchange`: handshake roles
//! - `ReadExchange` / `WriteExchange`: data transfer roles
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   ipstego                           │
//! │                      │                              │
//! │         ┌────────────┴────────────┐                 │
//! │         ▼                         ▼                 │
//! │   ipstego-core  ◄──       ipstego-transport         │
//! │   You are here                    │                 │
//! │         └────────────┬────────────┘                 │
//! │                      ▼                              │
//! │               ipstego-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No async, no sockets: the driver in the `ipstego` crate feeds packets in
//! - Every data symbol has bit 0 set; `0xFE` can never be a data symbol
//! - `0xFF` CAN be a data symbol, so OK is only meaningful in ack states
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod error;
pub mod exchange;
pub mod symbol;

// Re-export commonly used items
pub use codec::{SymbolCodec, SymbolDecoder, DEFAULT_MAX_PAYLOAD};
pub use error::{CoreError, Result};
pub use exchange::{
    AcceptExchange, DiscoverExchange, Exchange, InboundAction, OutboundAction, ReadExchange,
    WriteExchange,
};
