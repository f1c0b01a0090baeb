//! Virtual time: femtoseconds plus the delta cycle within one timestamp.
//!
//! The scheduler orders its queue by femtoseconds alone; the delta index is
//! attached when a signal change is stamped, so `'EVENT` can tell "changed in
//! this delta cycle" apart from "changed earlier at the same time".

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A point in virtual time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Timestamp in femtoseconds.
    pub fs: u64,
    /// Delta cycle within the timestamp.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A timestamp at an explicit delta cycle.
    pub fn new(fs: u64, delta: u32) -> Self {
        Self { fs, delta }
    }

    /// `fs` femtoseconds, delta zero.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// `ps` picoseconds, delta zero.
    pub fn from_ps(ps: u64) -> Self {
        Self::from_fs(ps * FS_PER_PS)
    }

    /// `ns` nanoseconds, delta zero.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// The following delta cycle of the same timestamp.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// A later timestamp with the delta counter reset.
    pub fn advance_to(&self, fs: u64) -> Self {
        debug_assert!(fs >= self.fs, "time runs backwards: {} -> {fs}", self.fs);
        Self { fs, delta: 0 }
    }

    /// Whole nanoseconds, truncated.
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns `now + delay` in femtoseconds, or `TimeOverflow`.
pub fn fs_after(now: u64, delay: u64) -> Result<u64, SimError> {
    now.checked_add(delay)
        .ok_or(SimError::TimeOverflow { now, delay })
}

/// Formats a femtosecond count in the largest unit that divides it.
pub fn format_fs(fs: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (FS_PER_S, "s"),
        (FS_PER_MS, "ms"),
        (FS_PER_US, "us"),
        (FS_PER_NS, "ns"),
        (FS_PER_PS, "ps"),
    ];
    if fs == 0 {
        return "0 fs".to_string();
    }
    for (scale, unit) in UNITS {
        if fs >= scale && fs.is_multiple_of(scale) {
            return format!("{} {unit}", fs / scale);
        }
    }
    format!("{fs} fs")
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fs(self.fs))?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}
