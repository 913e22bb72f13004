use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use validit::Validate;

use crate::display_ext::DisplayOptionExt;
use crate::error::MalformedStatus;
use crate::error::StatusParseError;
use crate::status::LastChange;

/// Progress of transferring a state snapshot from the leader to a follower.
///
/// Within one attempt the status only advances forward:
/// `NotStarted -> InProgress -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotStatus {
    type Err = MalformedStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotStarted" => Ok(Self::NotStarted),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(MalformedStatus::new(format!(
                "unknown snapshot status {:?}",
                s
            ))),
        }
    }
}

impl Serialize for SnapshotStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SnapshotStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Identifies one snapshot transfer attempt.
///
/// A restarted transfer gets a fresh attempt id; results tagged with an
/// outdated attempt id are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferAttempt(u64);

impl TransferAttempt {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransferAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome and progress of the snapshot transfer for one follower, under
/// one generation.
///
/// A new generation never reuses a `SnapshotInfo`: the role status is reset
/// wholesale and a fresh `SnapshotInfo` starts at `NotStarted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub status: SnapshotStatus,

    /// Failure detail; present iff `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Id of the current (or last) transfer attempt.
    pub attempt: TransferAttempt,

    #[serde(rename = "lastChange", skip_serializing_if = "Option::is_none")]
    pub last_change: Option<LastChange>,
}

impl Default for SnapshotInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotInfo {
    pub fn new() -> Self {
        Self {
            status: SnapshotStatus::NotStarted,
            detail: None,
            attempt: TransferAttempt::default(),
            last_change: None,
        }
    }

    /// Start (or restart) a transfer attempt.
    ///
    /// Valid from `NotStarted` and `Failed`, and from `InProgress` when
    /// `attempt` differs from the running one (a restarted transfer). A
    /// `begin` with the attempt id already in progress is a no-op.
    pub fn begin(&mut self, attempt: TransferAttempt) {
        if self.status == SnapshotStatus::InProgress && self.attempt == attempt {
            return;
        }

        debug_assert!(
            self.status != SnapshotStatus::Completed,
            "snapshot transfer restarted after completion: attempt {} over {}",
            attempt,
            self.attempt
        );

        tracing::debug!("snapshot transfer attempt {} begins", attempt);

        self.status = SnapshotStatus::InProgress;
        self.attempt = attempt;
        self.detail = None;
        self.last_change = Some(LastChange::now());
    }

    /// Mark the running attempt as completed.
    pub fn complete(&mut self) {
        debug_assert_eq!(
            self.status,
            SnapshotStatus::InProgress,
            "completing a snapshot transfer that is not in progress"
        );

        tracing::debug!("snapshot transfer attempt {} completed", self.attempt);

        self.status = SnapshotStatus::Completed;
        self.detail = None;
        self.last_change = Some(LastChange::now());
    }

    /// Mark the running attempt as failed, recording the failure detail.
    pub fn fail(&mut self, detail: impl ToString) {
        debug_assert_eq!(
            self.status,
            SnapshotStatus::InProgress,
            "failing a snapshot transfer that is not in progress"
        );

        let detail = detail.to_string();
        tracing::warn!("snapshot transfer attempt {} failed: {}", self.attempt, detail);

        self.status = SnapshotStatus::Failed;
        self.detail = Some(detail);
        self.last_change = Some(LastChange::now());
    }

    pub fn is_completed(&self) -> bool {
        self.status == SnapshotStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == SnapshotStatus::Failed
    }

    pub(crate) fn parse(v: &Value) -> Result<Self, StatusParseError> {
        let obj = v
            .as_object()
            .ok_or_else(|| MalformedStatus::new("`snapshot` is not an object"))?;

        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedStatus::new("`snapshot` misses a string `status`"))?
            .parse::<SnapshotStatus>()?;

        let detail = match obj.get("detail") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| MalformedStatus::new("`snapshot.detail` is not a string"))?
                    .to_string(),
            ),
        };

        // Absent in legacy documents.
        let attempt = match obj.get("attempt") {
            None => TransferAttempt::default(),
            Some(v) => TransferAttempt::new(
                v.as_u64()
                    .ok_or_else(|| MalformedStatus::new("`snapshot.attempt` is not an integer"))?,
            ),
        };

        let last_change = match obj.get("lastChange") {
            None => None,
            Some(v) => Some(LastChange::from_millis(v.as_u64().ok_or_else(|| {
                MalformedStatus::new("`snapshot.lastChange` is not an integer")
            })?)),
        };

        Ok(Self {
            status,
            detail,
            attempt,
            last_change,
        })
    }
}

impl fmt::Display for SnapshotInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, attempt:{}, detail:{}}}",
            self.status,
            self.attempt,
            self.detail.display()
        )
    }
}

impl Validate for SnapshotInfo {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if (self.status == SnapshotStatus::Failed) != self.detail.is_some() {
            return Err(format!(
                "snapshot detail must be present iff status is Failed: {}",
                self
            )
            .into());
        }
        Ok(())
    }
}
