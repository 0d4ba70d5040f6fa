// ============================================
// File: crates/ipstego-transport/src/lib.rs
// ============================================
//! # ipstego Transport - Packet Interception Layer
//!
//! ## Creation Reason
//! Gives the protocol engine a way to see packets on their way in and out
//! of the host and to release them, possibly rewritten.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `PacketFlow` and `FieldAccessor` abstractions
//! - [`ipv4`]: IPv4 header helpers and the `IpTos` accessor
//! - [`queue`]: NFQUEUE (Linux) and mock queue implementations
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   ipstego                           │
//! │                      │                              │
//! │         ┌────────────┴────────────┐                 │
//! │         ▼                         ▼                 │
//! │   ipstego-core            ipstego-transport         │
//! │                           You are here ◄──          │
//! │         └────────────┬────────────┘                 │
//! │                      ▼                              │
//! │               ipstego-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Platform Support
//! | Platform | NFQUEUE | Mock |
//! |----------|---------|------|
//! | Linux    | ✅      | ✅   |
//! | Other    | ❌      | ✅   |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Queue operations require elevated privileges
//! - Always go through the traits so tests can use `MockQueue`
//! - Mock implementations available with the `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod ipv4;
pub mod queue;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
pub use ipv4::IpTos;
pub use traits::{FieldAccessor, InterceptedPacket, PacketFlow, Verdict};

#[cfg(target_os = "linux")]
pub use queue::NfQueue;
