//! Interface of the application state machine the manager drives.

use async_trait::async_trait;

use crate::error::ApplyError;
use crate::log::LogEntry;

/// The shard-level state machine that replays replicated log entries into
/// an application-visible data structure.
///
/// The lifecycle worker re-issues entries from the applied watermark after
/// a failed or cancelled step; applying the same batch twice must be
/// harmless.
#[async_trait]
pub trait ReplicatedStateMachine: Send + 'static {
    /// Index the entries a prior leader wrote, before recovery replays
    /// them. Called on the leader path only.
    async fn ingest(&mut self, entries: Vec<LogEntry>) -> Result<(), ApplyError>;

    /// Replay all ingested entries to reach a consistent in-memory state.
    async fn recover(&mut self) -> Result<(), ApplyError>;

    /// Apply freshly replicated entries past the applied watermark.
    async fn apply(&mut self, entries: Vec<LogEntry>) -> Result<(), ApplyError>;
}
