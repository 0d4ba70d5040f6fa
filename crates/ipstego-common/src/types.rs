// ============================================
// File: crates/ipstego-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Channel kinds and the address type returned by connections and
//! listeners.
//!
//! ## Main Functionality
//! - `ChannelKind`: which header field carries the covert symbols
//! - `StegoAddr`: address tagged with the channel kind string
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only `IP.TOS` exists today; adding a kind means adding a field
//!   accessor in `ipstego-transport` as well
//! - `StegoAddr` intentionally carries the peer IP only when one is bound
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// ChannelKind
// ============================================

/// Network family name reported by [`StegoAddr::network`].
pub const NETWORK_NAME: &str = "chanstego";

/// Header field used as the symbol carrier.
///
/// # Example
/// ```
/// use ipstego_common::types::ChannelKind;
///
/// let kind: ChannelKind = "IP.TOS".parse().unwrap();
/// assert_eq!(kind, ChannelKind::IpTos);
/// assert!("UDP.PORT".parse::<ChannelKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// The IPv4 Type-of-Service byte.
    #[serde(rename = "IP.TOS")]
    IpTos,
}

impl ChannelKind {
    /// Returns the canonical channel kind string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IpTos => "IP.TOS",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IP.TOS" => Ok(Self::IpTos),
            other => Err(CommonError::unsupported_channel(other)),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// StegoAddr
// ============================================

/// Address of either end of a covert connection.
///
/// Displays as the channel kind string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StegoAddr {
    kind: ChannelKind,
    ip: Option<Ipv4Addr>,
}

impl StegoAddr {
    /// Creates an address with no IP attached.
    #[must_use]
    pub const fn new(kind: ChannelKind) -> Self {
        Self { kind, ip: None }
    }

    /// Creates an address for a bound peer.
    #[must_use]
    pub const fn with_ip(kind: ChannelKind, ip: Ipv4Addr) -> Self {
        Self { kind, ip: Some(ip) }
    }

    /// Returns the network family name.
    #[must_use]
    pub const fn network(&self) -> &'static str {
        NETWORK_NAME
    }

    /// Returns the channel kind.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the IP address, if one is bound.
    #[must_use]
    pub const fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}

impl fmt::Display for StegoAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())
    }
}

// ============================================
// Tests
// ============================================
