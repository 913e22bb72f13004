//! Fundamental identifier types shared across the crate.

/// Identifier of one replicated-state instance, i.e. one shard-level
/// consumer of a replicated log.
pub type StateId = u64;

/// Identifier of a cluster participant (a database node).
pub type ParticipantId = u64;

/// Index of an entry in the replicated log.
pub type LogIndex = u64;
