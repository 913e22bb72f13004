use std::fmt;
use std::str::FromStr;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;

use crate::display_ext::DisplayOptionExt;
use crate::error::MalformedStatus;
use crate::error::StatusParseError;
use crate::error::UnknownInternalState;
use crate::status::LastChange;
use crate::status::Role;

/// A closed set of internal states for one role, with an exhaustive mapping
/// to and from canonical state-name strings.
///
/// Parsing fails on any unmapped string instead of defaulting.
pub trait InternalState:
    fmt::Debug
    + fmt::Display
    + Clone
    + Copy
    + PartialEq
    + Eq
    + FromStr<Err = UnknownInternalState>
    + Send
    + Sync
    + 'static
{
    /// The role this state set belongs to.
    const ROLE: Role;

    /// The state of a freshly created instance.
    const INITIAL: Self;

    fn as_str(&self) -> &'static str;
}

/// Internal states of the leader-side lifecycle manager.
///
/// Within one generation the progression is linear with no regression:
/// `UninitializedState -> WaitingForLeadershipEstablished ->
/// IngestingExistingLog -> RecoveryInProgress -> ServiceAvailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderInternalState {
    UninitializedState,
    WaitingForLeadershipEstablished,
    IngestingExistingLog,
    RecoveryInProgress,
    ServiceAvailable,
}

impl InternalState for LeaderInternalState {
    const ROLE: Role = Role::Leader;
    const INITIAL: Self = Self::UninitializedState;

    fn as_str(&self) -> &'static str {
        match self {
            Self::UninitializedState => "UninitializedState",
            Self::WaitingForLeadershipEstablished => "WaitingForLeadershipEstablished",
            Self::IngestingExistingLog => "IngestingExistingLog",
            Self::RecoveryInProgress => "RecoveryInProgress",
            Self::ServiceAvailable => "ServiceAvailable",
        }
    }
}

impl FromStr for LeaderInternalState {
    type Err = UnknownInternalState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UninitializedState" => Ok(Self::UninitializedState),
            "WaitingForLeadershipEstablished" => Ok(Self::WaitingForLeadershipEstablished),
            "IngestingExistingLog" => Ok(Self::IngestingExistingLog),
            "RecoveryInProgress" => Ok(Self::RecoveryInProgress),
            "ServiceAvailable" => Ok(Self::ServiceAvailable),
            _ => Err(UnknownInternalState::new(Role::Leader, s)),
        }
    }
}

impl fmt::Display for LeaderInternalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal states of the follower-side lifecycle manager.
///
/// After bootstrap the follower oscillates between `NothingToApply` and
/// `ApplyRecentEntries`, giving observers an explicit idle/busy signal for
/// catch-up-lag monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerInternalState {
    UninitializedState,
    WaitForLeaderConfirmation,
    TransferSnapshot,
    NothingToApply,
    ApplyRecentEntries,
}

impl InternalState for FollowerInternalState {
    const ROLE: Role = Role::Follower;
    const INITIAL: Self = Self::UninitializedState;

    fn as_str(&self) -> &'static str {
        match self {
            Self::UninitializedState => "UninitializedState",
            Self::WaitForLeaderConfirmation => "WaitForLeaderConfirmation",
            Self::TransferSnapshot => "TransferSnapshot",
            Self::NothingToApply => "NothingToApply",
            Self::ApplyRecentEntries => "ApplyRecentEntries",
        }
    }
}

impl FromStr for FollowerInternalState {
    type Err = UnknownInternalState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UninitializedState" => Ok(Self::UninitializedState),
            "WaitForLeaderConfirmation" => Ok(Self::WaitForLeaderConfirmation),
            "TransferSnapshot" => Ok(Self::TransferSnapshot),
            "NothingToApply" => Ok(Self::NothingToApply),
            "ApplyRecentEntries" => Ok(Self::ApplyRecentEntries),
            _ => Err(UnknownInternalState::new(Role::Follower, s)),
        }
    }
}

impl fmt::Display for FollowerInternalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! impl_internal_state_serde {
    ($typ:ty) => {
        impl Serialize for $typ {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where S: Serializer {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $typ {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where D: Deserializer<'de> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

impl_internal_state_serde!(LeaderInternalState);
impl_internal_state_serde!(FollowerInternalState);

/// The internal state-machine value of one role: current state plus an
/// optional free-form diagnostic detail.
///
/// `detail` belongs to the *current* state: it is cleared on every state
/// change unless explicitly re-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerState<S>
where S: InternalState + Serialize
{
    pub state: S,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(rename = "lastChange", skip_serializing_if = "Option::is_none")]
    pub last_change: Option<LastChange>,
}

impl<S> Default for ManagerState<S>
where S: InternalState + Serialize
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ManagerState<S>
where S: InternalState + Serialize
{
    pub fn new() -> Self {
        Self {
            state: S::INITIAL,
            detail: None,
            last_change: None,
        }
    }

    /// Move to `state`, clearing any diagnostic detail of the old state.
    pub fn transition_to(&mut self, state: S) {
        tracing::debug!("{} manager state: {} -> {}", S::ROLE, self.state, state);

        self.state = state;
        self.detail = None;
        self.last_change = Some(LastChange::now());
    }

    /// Attach a diagnostic detail to the current state, without
    /// transitioning.
    pub fn set_detail(&mut self, detail: impl ToString) {
        self.detail = Some(detail.to_string());
        self.last_change = Some(LastChange::now());
    }

    pub(crate) fn parse(v: &Value) -> Result<Self, StatusParseError> {
        let obj = v
            .as_object()
            .ok_or_else(|| MalformedStatus::new("`managerState` is not an object"))?;

        // `managerState` is the ambiguous inner key of the legacy wire form.
        let name = obj
            .get("state")
            .or_else(|| obj.get("managerState"))
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedStatus::new("`managerState` misses a string `state`"))?;

        let state = name.parse::<S>()?;

        let detail = match obj.get("detail") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| MalformedStatus::new("`managerState.detail` is not a string"))?
                    .to_string(),
            ),
        };

        let last_change = match obj.get("lastChange") {
            None => None,
            Some(v) => Some(LastChange::from_millis(v.as_u64().ok_or_else(|| {
                MalformedStatus::new("`managerState.lastChange` is not an integer")
            })?)),
        };

        Ok(Self {
            state,
            detail,
            last_change,
        })
    }
}

impl<S> fmt::Display for ManagerState<S>
where S: InternalState + Serialize
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, detail:{}}}", self.state, self.detail.display())
    }
}
