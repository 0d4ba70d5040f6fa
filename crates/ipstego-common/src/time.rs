// ============================================
// File: crates/ipstego-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Connections store read and write deadlines as absolute points in time,
//! the same way socket APIs do. `Deadline` wraps an `Instant` and offers
//! the conversions the engine needs.
//!
//! ## Main Functionality
//! - `Deadline`: absolute deadline with `remaining` / `is_expired`
//! - Construction from `Instant`, `SystemTime` or a relative `Duration`
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SystemTime` values in the past map to an already-expired deadline
//! - Timeouts too large for `Instant` are clamped to `FAR_FUTURE`
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::time::{Duration, Instant, SystemTime};

/// Stand-in for "never" when a timeout does not fit in an `Instant`.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ============================================
// Deadline
// ============================================

/// An absolute point in time after which an operation should stop.
///
/// # Example
/// ```
/// use ipstego_common::time::Deadline;
/// use std::time::Duration;
///
/// let deadline = Deadline::after(Duration::from_secs(5));
/// assert!(!deadline.is_expired());
/// assert!(deadline.remaining() <= Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(Instant);

impl Deadline {
    /// Creates a deadline at the given instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Creates a deadline `timeout` from now.
    ///
    /// A timeout that would overflow `Instant` is clamped to [`FAR_FUTURE`].
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let instant = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self(instant)
    }

    /// Creates a deadline from a wall-clock time.
    ///
    /// Times in the past produce a deadline that is already expired.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        let remaining = time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        Self::after(remaining)
    }

    /// Returns the underlying instant.
    #[must_use]
    pub const fn instant(&self) -> Instant {
        self.0
    }

    /// Returns the time left before the deadline, zero once passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl From<SystemTime> for Deadline {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

// ============================================
// Tests
// ============================================
