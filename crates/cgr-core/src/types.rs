//! Identifiers and time for the contact graph
//!
//! Node numbers are IPN node numbers; zero is never a valid node.
//! Times are whole seconds on the caller's DTN clock.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Absolute time in seconds, as supplied by the caller on each request
pub type DtnTime = i64;

/// Sentinel used for "never" / unreachable arrival times
pub const MAX_TIME: DtnTime = i64::MAX;

/// Convert a wall-clock instant into DTN seconds
pub fn dtn_time(at: DateTime<Utc>) -> DtnTime {
    at.timestamp()
}

/// An IPN node number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeNbr(pub u64);

impl NodeNbr {
    /// Whether this is a usable node number (non-zero)
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Display for NodeNbr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ipn:{}", self.0)
    }
}

impl From<u64> for NodeNbr {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A region number; contacts are scoped to one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionNbr(pub u32);

impl RegionNbr {
    /// The region the local node lives in unless configured otherwise
    pub const HOME: RegionNbr = RegionNbr(1);
}

impl Default for RegionNbr {
    fn default() -> Self {
        Self::HOME
    }
}

impl Display for RegionNbr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region {}", self.0)
    }
}

/// Bundle class of service
///
/// Ordered lowest to highest, so `Priority::Expedited > Priority::Bulk`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Priority {
    /// Lowest class
    Bulk,
    /// Default class
    #[default]
    Standard,
    /// Highest class; subdivided by ordinal
    Expedited,
}

impl Priority {
    /// All priorities, lowest first
    pub const ALL: [Priority; 3] = [Priority::Bulk, Priority::Standard, Priority::Expedited];

    /// Index into per-priority arrays
    pub fn index(self) -> usize {
        match self {
            Priority::Bulk => 0,
            Priority::Standard => 1,
            Priority::Expedited => 2,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Bulk => "bulk",
            Priority::Standard => "standard",
            Priority::Expedited => "expedited",
        };
        f.write_str(name)
    }
}
