//! Interfaces of the replicated log collaborators.
//!
//! The log itself (append, election, quorum commit, compaction) is outside
//! this crate; the lifecycle core only consumes these seams. Calls made
//! through them may be cancelled by dropping the returned future when a
//! newer generation supersedes the in-flight step; implementations must
//! tolerate that.

use async_trait::async_trait;

use crate::error::LogError;
use crate::error::TransferError;
use crate::generation::StateGeneration;
use crate::status::TransferAttempt;
use crate::types::LogIndex;
use crate::types::ParticipantId;

/// One entry of the replicated log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub index: LogIndex,
    pub payload: Vec<u8>,
}

impl LogEntry {
    pub fn new(index: LogIndex, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }
}

/// Access to the replicated log underlying one instance.
#[async_trait]
pub trait ReplicatedLog: Send + 'static {
    /// Resolve once this node's leadership at `generation` is durable, i.e.
    /// committed by the log.
    async fn confirm_leadership(&mut self, generation: StateGeneration) -> Result<(), LogError>;

    /// Read all entries written by prior leaders, for the new leader to
    /// index before recovery.
    async fn read_existing(
        &mut self,
        generation: StateGeneration,
    ) -> Result<Vec<LogEntry>, LogError>;

    /// Register this node as a follower of `leader` at `generation`;
    /// resolves once the leader acknowledges the registration.
    async fn register_follower(
        &mut self,
        generation: StateGeneration,
        leader: ParticipantId,
    ) -> Result<(), LogError>;

    /// Fetch the entries with indexes in `[first, last]`.
    async fn fetch_entries(
        &mut self,
        first: LogIndex,
        last: LogIndex,
    ) -> Result<Vec<LogEntry>, LogError>;
}

/// Transfers a leader snapshot to this follower.
#[async_trait]
pub trait SnapshotTransport: Send + 'static {
    /// Run one transfer attempt; on success return the log index the
    /// received snapshot covers.
    ///
    /// Network or disk bound. The future is dropped when a newer
    /// generation supersedes the attempt; a partially transferred snapshot
    /// must not become visible to the application.
    async fn transfer(
        &mut self,
        attempt: TransferAttempt,
        generation: StateGeneration,
    ) -> Result<LogIndex, TransferError>;
}
