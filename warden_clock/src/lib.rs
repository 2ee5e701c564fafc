//! Utilities for telling time
//!
//! Types included allow mocking out clocks, doing saturating arithmetic on
//! unix timestamps, and applying a uniform clock-skew tolerance ("leeway") to
//! deadline comparisons.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{
    fmt,
    ops::{Add, Sub},
    time::{Duration, SystemTime},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unix time
///
/// Unix time as represented by the number of seconds elapsed since the
/// beginning of the Unix epoch on 1970/01/01 at 00:00:00 UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// The beginning of the Unix epoch
    pub const EPOCH: UnixTime = UnixTime(0);

    /// Adds a duration, saturating at the maximum representable time
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, d: DurationSecs) -> Self {
        Self(self.0.saturating_add(d.0))
    }

    /// Subtracts a duration, saturating at the epoch
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, d: DurationSecs) -> Self {
        Self(self.0.saturating_sub(d.0))
    }
}

impl From<SystemTime> for UnixTime {
    /// Times before the epoch are clamped to the epoch
    #[inline]
    fn from(t: SystemTime) -> Self {
        let time = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        UnixTime(time)
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add<DurationSecs> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn add(self, rhs: DurationSecs) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<DurationSecs> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn sub(self, rhs: DurationSecs) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub for UnixTime {
    type Output = DurationSecs;

    /// The time elapsed between two instants, or zero if `rhs` is later
    #[inline]
    fn sub(self, rhs: UnixTime) -> Self::Output {
        DurationSecs(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(any(feature = "serde", doc))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl Serialize for UnixTime {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(any(feature = "serde", doc))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> Deserialize<'de> for UnixTime {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = u64::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// A span of time measured in whole seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct DurationSecs(pub u64);

impl DurationSecs {
    /// A zero-length duration
    pub const ZERO: DurationSecs = DurationSecs(0);

    /// Whether this duration is zero seconds long
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<Duration> for DurationSecs {
    /// Sub-second precision is truncated
    #[inline]
    fn from(d: Duration) -> Self {
        Self(d.as_secs())
    }
}

impl From<DurationSecs> for Duration {
    #[inline]
    fn from(d: DurationSecs) -> Self {
        Duration::from_secs(d.0)
    }
}

impl fmt::Display for DurationSecs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(any(feature = "serde", doc))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl Serialize for DurationSecs {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(any(feature = "serde", doc))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> Deserialize<'de> for DurationSecs {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = u64::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// Tolerance applied to time comparisons to absorb clock skew between the
/// party that issued a token and the party that checks it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Leeway(DurationSecs);

impl Default for Leeway {
    /// The standard ten second leeway
    #[inline]
    fn default() -> Self {
        Self::STANDARD
    }
}

impl Leeway {
    /// Ten seconds, applied to every time-based check
    pub const STANDARD: Leeway = Leeway(DurationSecs(10));

    /// No tolerance at all
    pub const NONE: Leeway = Leeway(DurationSecs::ZERO);

    /// A leeway of the given number of seconds
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(DurationSecs(secs))
    }

    /// The tolerance as a duration
    #[inline]
    #[must_use]
    pub const fn duration(self) -> DurationSecs {
        self.0
    }

    /// Whether `deadline` has passed as of `now`, even after granting the
    /// leeway, i.e. `deadline + leeway < now`
    #[inline]
    #[must_use]
    pub fn has_elapsed(self, deadline: UnixTime, now: UnixTime) -> bool {
        deadline.saturating_add(self.0) < now
    }

    /// Whether `instant` lies in the future beyond the leeway, i.e.
    /// `instant > now + leeway`
    #[inline]
    #[must_use]
    pub fn is_premature(self, instant: UnixTime, now: UnixTime) -> bool {
        instant > now.saturating_add(self.0)
    }
}

/// Represents a clock, which can tell the current time
pub trait Clock {
    /// Gets the current time according to this clock
    fn now(&self) -> UnixTime;
}

impl<C: Clock + ?Sized> Clock for &'_ C {
    #[inline]
    fn now(&self) -> UnixTime {
        C::now(&**self)
    }
}

/// The system clock as provided by `std::time::SystemTime`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A test clock which maintains the current time as internal state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixTime);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}

impl TestClock {
    /// Creates a new test clock with the specified time
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Updates the clock's current time to `val`
    pub fn set(&mut self, val: UnixTime) {
        self.0 = val;
    }

    /// Increments the clock's current time by `inc` seconds
    pub fn inc(&mut self, inc: u64) {
        self.0 = self.0.saturating_add(DurationSecs(inc));
    }

    /// Decrements the clock's current time by `dec` seconds, stopping at the epoch
    pub fn dec(&mut self, dec: u64) {
        self.0 = self.0.saturating_sub(DurationSecs(dec));
    }
}
