//! The serializable status model of a replicated-state instance.
//!
//! A lifecycle manager publishes its progress as a [`StateStatus`]: a
//! role-tagged aggregate of the internal manager state, the leadership
//! generation it is valid under, and the snapshot transfer progress.
//! External callers read consistent, independent copies of it at any time,
//! serialize them for transmission, and reconstruct them losslessly with
//! [`StateStatus::parse`].

mod manager_state;
mod snapshot_info;
mod state_status;
mod timestamp;
mod wait;

#[cfg(test)]
mod manager_state_test;

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub use manager_state::FollowerInternalState;
pub use manager_state::InternalState;
pub use manager_state::LeaderInternalState;
pub use manager_state::ManagerState;
pub use snapshot_info::SnapshotInfo;
pub use snapshot_info::SnapshotStatus;
pub use snapshot_info::TransferAttempt;
pub use state_status::FollowerStatus;
pub use state_status::LeaderStatus;
pub use state_status::StateStatus;
pub use timestamp::LastChange;
pub use wait::Wait;
pub use wait::WaitError;

/// The role a replicated-state instance currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Leader,
    Follower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "Leader",
            Self::Follower => "Follower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
