use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// `StateGeneration` identifies one leadership term of a replicated-state
/// instance.
///
/// It is an opaque, totally ordered 64-bit counter: every leadership change
/// observed by an instance produces a strictly greater generation than any
/// generation the instance has seen before, and an instance never regresses
/// its own generation.
///
/// The ordering is used pervasively as a freshness gate: an incoming
/// instruction tagged with a generation smaller than the current one is
/// stale and is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateGeneration(u64);

impl StateGeneration {
    /// The generation of an instance that has not yet observed any
    /// leadership change.
    pub const INITIAL: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the next, strictly greater generation.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

impl From<u64> for StateGeneration {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
