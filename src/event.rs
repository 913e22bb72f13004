//! Events delivered to a lifecycle manager by its collaborators.

use std::fmt;

use crate::generation::StateGeneration;
use crate::status::TransferAttempt;
use crate::types::LogIndex;
use crate::types::ParticipantId;

/// Outcome of one snapshot transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot was received; it covers the log up to `covers_up_to`.
    Success { covers_up_to: LogIndex },

    /// The attempt failed; `detail` describes the failure.
    Failure { detail: String },
}

/// A notification from the replicated log or the cluster coordination
/// layer.
///
/// Events for one instance are applied strictly in delivery order by the
/// instance's single lifecycle worker. Events tagged with a generation
/// older than the instance's current one are counted and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// This node acquired leadership of the instance at `generation`.
    LeadershipEstablished { generation: StateGeneration },

    /// A leader for the instance was identified at `generation`.
    LeaderIdentified {
        generation: StateGeneration,
        leader: ParticipantId,
    },

    /// New log entries up to `up_to` are available past the applied
    /// watermark.
    LogEntriesAvailable { up_to: LogIndex },

    /// An externally driven snapshot transfer attempt finished.
    SnapshotTransferResult {
        attempt: TransferAttempt,
        outcome: SnapshotOutcome,
    },
}

impl Event {
    /// The generation this event is tagged with, if any.
    pub fn generation(&self) -> Option<StateGeneration> {
        match self {
            Self::LeadershipEstablished { generation } => Some(*generation),
            Self::LeaderIdentified { generation, .. } => Some(*generation),
            Self::LogEntriesAvailable { .. } => None,
            Self::SnapshotTransferResult { .. } => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeadershipEstablished { generation } => {
                write!(f, "LeadershipEstablished({})", generation)
            }
            Self::LeaderIdentified { generation, leader } => {
                write!(f, "LeaderIdentified({}, leader:{})", generation, leader)
            }
            Self::LogEntriesAvailable { up_to } => {
                write!(f, "LogEntriesAvailable(up_to:{})", up_to)
            }
            Self::SnapshotTransferResult { attempt, outcome } => {
                write!(f, "SnapshotTransferResult(attempt:{}, {:?})", attempt, outcome)
            }
        }
    }
}
