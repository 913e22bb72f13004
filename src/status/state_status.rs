use std::error::Error;
use std::fmt;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use validit::Validate;

use crate::error::MalformedStatus;
use crate::error::StatusParseError;
use crate::generation::StateGeneration;
use crate::status::FollowerInternalState;
use crate::status::LeaderInternalState;
use crate::status::ManagerState;
use crate::status::Role;
use crate::status::SnapshotInfo;
use crate::status::SnapshotStatus;

/// Status of the leader-side lifecycle manager of one replicated-state
/// instance.
///
/// All fields are valid under `generation` and are always replaced as one
/// unit: a reader never observes a `manager_state` from one generation
/// paired with a `snapshot` from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderStatus {
    #[serde(rename = "managerState")]
    pub manager_state: ManagerState<LeaderInternalState>,

    pub generation: StateGeneration,

    pub snapshot: SnapshotInfo,
}

impl LeaderStatus {
    pub fn new(generation: StateGeneration) -> Self {
        Self {
            manager_state: ManagerState::new(),
            generation,
            snapshot: SnapshotInfo::new(),
        }
    }

    fn parse(obj: &Map<String, Value>) -> Result<Self, StatusParseError> {
        let (manager_state, generation, snapshot) = parse_role_fields(obj)?;
        Ok(Self {
            manager_state,
            generation,
            snapshot,
        })
    }
}

impl fmt::Display for LeaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Leader{{{}, {}, snapshot:{}}}",
            self.manager_state, self.generation, self.snapshot
        )
    }
}

impl Validate for LeaderStatus {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        self.snapshot.validate()?;
        // A leader never transfers a snapshot to itself.
        if self.snapshot.status != SnapshotStatus::NotStarted {
            return Err(format!("leader snapshot status must be NotStarted: {}", self).into());
        }
        Ok(())
    }
}

/// Status of the follower-side lifecycle manager of one replicated-state
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowerStatus {
    #[serde(rename = "managerState")]
    pub manager_state: ManagerState<FollowerInternalState>,

    pub generation: StateGeneration,

    pub snapshot: SnapshotInfo,
}

impl FollowerStatus {
    pub fn new(generation: StateGeneration) -> Self {
        Self {
            manager_state: ManagerState::new(),
            generation,
            snapshot: SnapshotInfo::new(),
        }
    }

    fn parse(obj: &Map<String, Value>) -> Result<Self, StatusParseError> {
        let (manager_state, generation, snapshot) = parse_role_fields(obj)?;
        Ok(Self {
            manager_state,
            generation,
            snapshot,
        })
    }
}

impl fmt::Display for FollowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Follower{{{}, {}, snapshot:{}}}",
            self.manager_state, self.generation, self.snapshot
        )
    }
}

impl Validate for FollowerStatus {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        self.snapshot.validate()?;
        Ok(())
    }
}

fn parse_role_fields<S>(
    obj: &Map<String, Value>,
) -> Result<(ManagerState<S>, StateGeneration, SnapshotInfo), StatusParseError>
where
    S: crate::status::InternalState + Serialize,
{
    let manager_state = ManagerState::<S>::parse(
        obj.get("managerState")
            .ok_or_else(|| MalformedStatus::new("missing `managerState`"))?,
    )?;

    // `log` is the key of the legacy wire form.
    let generation = obj
        .get("generation")
        .or_else(|| obj.get("log"))
        .and_then(Value::as_u64)
        .map(StateGeneration::new)
        .ok_or_else(|| MalformedStatus::new("missing integer `generation`"))?;

    let snapshot = SnapshotInfo::parse(
        obj.get("snapshot")
            .ok_or_else(|| MalformedStatus::new("missing `snapshot`"))?,
    )?;

    Ok((manager_state, generation, snapshot))
}

/// The externally visible, serializable status of one replicated-state
/// instance: a tagged union over the two role statuses.
///
/// An instance owns exactly one live `StateStatus` at a time. On a role
/// change it is replaced wholesale at the new generation, never mutated
/// field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role")]
pub enum StateStatus {
    Leader(LeaderStatus),
    Follower(FollowerStatus),
}

impl StateStatus {
    pub fn role(&self) -> Role {
        match self {
            Self::Leader(_) => Role::Leader,
            Self::Follower(_) => Role::Follower,
        }
    }

    pub fn generation(&self) -> StateGeneration {
        match self {
            Self::Leader(x) => x.generation,
            Self::Follower(x) => x.generation,
        }
    }

    pub fn snapshot(&self) -> &SnapshotInfo {
        match self {
            Self::Leader(x) => &x.snapshot,
            Self::Follower(x) => &x.snapshot,
        }
    }

    pub fn as_leader(&self) -> Option<&LeaderStatus> {
        match self {
            Self::Leader(x) => Some(x),
            Self::Follower(_) => None,
        }
    }

    pub fn as_follower(&self) -> Option<&FollowerStatus> {
        match self {
            Self::Leader(_) => None,
            Self::Follower(x) => Some(x),
        }
    }

    /// Deterministically reconstruct a `StateStatus` from a structured
    /// document.
    ///
    /// Fails with [`MalformedStatus`] if the role discriminator is missing
    /// or unrecognized, if role-specific fields are absent or of the
    /// wrong shape, or if the decoded fields violate a status invariant
    /// (for example `Failed` without a failure detail); fails with
    /// [`UnknownInternalState`](crate::error::UnknownInternalState) if a
    /// state name does not match any defined internal state of the parsed
    /// role. The exact inverse of serialization: for every valid status
    /// `s`, `parse(serialize(s)) == s`.
    pub fn parse(doc: &Value) -> Result<Self, StatusParseError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| MalformedStatus::new("status document is not an object"))?;

        let role = obj
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedStatus::new("missing string `role`"))?;

        let status = match role {
            "Leader" => Self::Leader(LeaderStatus::parse(obj)?),
            "Follower" => Self::Follower(FollowerStatus::parse(obj)?),
            _ => return Err(MalformedStatus::new(format!("unknown role {:?}", role)).into()),
        };

        // A document that decodes field by field may still violate the
        // cross-field invariants; such a status must never be constructed.
        status.validate().map_err(MalformedStatus::new)?;

        Ok(status)
    }
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader(x) => x.fmt(f),
            Self::Follower(x) => x.fmt(f),
        }
    }
}

impl Validate for StateStatus {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        match self {
            Self::Leader(x) => x.validate(),
            Self::Follower(x) => x.validate(),
        }
    }
}

impl<'de> Deserialize<'de> for StateStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let doc = Value::deserialize(deserializer)?;
        Self::parse(&doc).map_err(de::Error::custom)
    }
}
