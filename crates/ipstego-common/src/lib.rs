// ============================================
// File: crates/ipstego-common/src/lib.rs
// ============================================
//! # ipstego Common - Shared Types Library
//!
//! ## Creation Reason
//! Holds the small set of types every ipstego crate agrees on: the channel
//! kind, the address type handed out by connections, deadlines and the base
//! error enum.
//!
//! ## Main Functionality
//! - [`types`]: `ChannelKind`, `StegoAddr`
//! - [`time`]: `Deadline` (absolute point in time for I/O calls)
//! - [`error`]: `CommonError` and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   ipstego                           │
//! │                      │                              │
//! │         ┌────────────┴────────────┐                 │
//! │         ▼                         ▼                 │
//! │   ipstego-core            ipstego-transport         │
//! │         │                         │                 │
//! │         └────────────┬────────────┘                 │
//! │                      ▼                              │
//! │               ipstego-common  ◄── You are here      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies
//! - `ChannelKind` strings are part of the public surface ("IP.TOS")
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::Deadline;
pub use types::{ChannelKind, StegoAddr};
