//! Error types exposed by this crate.
//!
//! Parsing errors ([`StatusParseError`]) are returned to the caller and
//! fail closed: a partially valid [`StateStatus`](crate::StateStatus) is
//! never constructed. Runtime lifecycle errors ([`TransferError`],
//! [`ApplyError`], [`LogError`]) are absorbed by the owning lifecycle
//! worker and surface as status detail.

use anyerror::AnyError;
use serde::Deserialize;
use serde::Serialize;

use crate::status::Role;
use crate::status::TransferAttempt;
use crate::types::StateId;

/// A structured status document misses required fields or carries fields of
/// the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("malformed status document: {reason}")]
pub struct MalformedStatus {
    pub reason: String,
}

impl MalformedStatus {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// A textual state name does not match any defined internal state of the
/// target role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("unknown {role} internal state: {name:?}")]
pub struct UnknownInternalState {
    pub role: Role,
    pub name: String,
}

impl UnknownInternalState {
    pub fn new(role: Role, name: impl ToString) -> Self {
        Self {
            role,
            name: name.to_string(),
        }
    }
}

/// Error returned by [`StateStatus::parse`](crate::StateStatus::parse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StatusParseError {
    #[error(transparent)]
    Malformed(#[from] MalformedStatus),

    #[error(transparent)]
    UnknownState(#[from] UnknownInternalState),
}

/// One snapshot transfer attempt failed.
///
/// Recorded into [`SnapshotInfo`](crate::SnapshotInfo) and retried with
/// backoff up to a configured bound; exhausting the bound marks the
/// instance degraded but never crashes the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("snapshot transfer attempt {attempt} failed: {source}")]
pub struct TransferError {
    pub attempt: TransferAttempt,
    pub source: AnyError,
}

impl TransferError {
    pub fn new(attempt: TransferAttempt, source: impl Into<AnyError>) -> Self {
        Self {
            attempt,
            source: source.into(),
        }
    }

    pub fn with_message(attempt: TransferAttempt, msg: impl ToString) -> Self {
        Self {
            attempt,
            source: AnyError::error(msg),
        }
    }
}

/// Applying or ingesting replicated log entries failed.
///
/// Attached as `detail` on the current manager state and retried; entries
/// are never silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("failed to apply replicated log entries: {source}")]
pub struct ApplyError {
    pub source: AnyError,
}

impl ApplyError {
    pub fn new(source: impl Into<AnyError>) -> Self {
        Self { source: source.into() }
    }

    pub fn with_message(msg: impl ToString) -> Self {
        Self {
            source: AnyError::error(msg),
        }
    }
}

/// An operation against the replicated log collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("replicated log operation failed: {source}")]
pub struct LogError {
    pub source: AnyError,
}

impl LogError {
    pub fn new(source: impl Into<AnyError>) -> Self {
        Self { source: source.into() }
    }

    pub fn with_message(msg: impl ToString) -> Self {
        Self {
            source: AnyError::error(msg),
        }
    }
}

/// An event was submitted to an instance whose lifecycle worker has already
/// shut down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("replicated-state instance {id} has shut down")]
pub struct InstanceClosed {
    pub id: StateId,
}

impl InstanceClosed {
    pub fn new(id: StateId) -> Self {
        Self { id }
    }
}
