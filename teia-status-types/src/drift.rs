//! Drift comparison between two views of the chain.
//!
//! Every drift-style check reduces to the same question: how far apart are
//! two observed values, and is that distance within tolerance? The math
//! lives here so the answer is identical no matter which probe asks.

use core::fmt;

/// How many blocks a data source may trail the reference head and still
/// count as in sync.
pub const LEVEL_TOLERANCE: u64 = 50;

/// How far the reference API itself may trail the chain it indexes before
/// it is reported as lagging.
pub const HEAD_LAG_TOLERANCE: u64 = 10;

/// Maximum age, in minutes, of an indexer head timestamp before the
/// indexer counts as stale.
pub const TIME_TOLERANCE_MINUTES: u64 = 10;

/// Tighter block tolerance used where a source publishes its own
/// known-level alongside its indexed level.
pub const KNOWN_LEVEL_TOLERANCE: u64 = 5;

/// Unit a drift tolerance is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DriftUnit {
    Blocks,
    Minutes,
}

impl DriftUnit {
    pub fn label(&self) -> &'static str {
        match self {
            DriftUnit::Blocks => "blocks",
            DriftUnit::Minutes => "minutes",
        }
    }
}

/// A tolerance paired with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftPolicy {
    pub unit: DriftUnit,
    pub tolerance: u64,
}

impl DriftPolicy {
    pub const fn blocks(tolerance: u64) -> Self {
        Self {
            unit: DriftUnit::Blocks,
            tolerance,
        }
    }

    pub const fn minutes(tolerance: u64) -> Self {
        Self {
            unit: DriftUnit::Minutes,
            tolerance,
        }
    }

    /// Compare two observations. The distance is the absolute difference,
    /// so the order of arguments does not matter, and a distance exactly
    /// at the tolerance is still in sync.
    pub fn compare(&self, a: i64, b: i64) -> Drift {
        let delta = a.abs_diff(b);
        Drift {
            delta,
            in_sync: delta <= self.tolerance,
            unit: self.unit,
        }
    }
}

/// Result of one [`DriftPolicy::compare`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Drift {
    pub delta: u64,
    pub in_sync: bool,
    pub unit: DriftUnit,
}

impl Drift {
    /// Message fragment in the form `delayed by 60 blocks`.
    pub fn delay(&self) -> String {
        format!("delayed by {} {}", self.delta, self.unit.label())
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.delta, self.unit.label())
    }
}
