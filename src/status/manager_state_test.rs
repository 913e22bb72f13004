use pretty_assertions::assert_eq;
use serde_json::json;

use crate::error::StatusParseError;
use crate::status::FollowerInternalState;
use crate::status::InternalState;
use crate::status::LeaderInternalState;
use crate::status::ManagerState;
use crate::status::Role;

#[test]
fn test_state_name_strings() -> anyhow::Result<()> {
    let leader_states = [
        (LeaderInternalState::UninitializedState, "UninitializedState"),
        (
            LeaderInternalState::WaitingForLeadershipEstablished,
            "WaitingForLeadershipEstablished",
        ),
        (LeaderInternalState::IngestingExistingLog, "IngestingExistingLog"),
        (LeaderInternalState::RecoveryInProgress, "RecoveryInProgress"),
        (LeaderInternalState::ServiceAvailable, "ServiceAvailable"),
    ];

    for (state, name) in leader_states {
        assert_eq!(name, state.as_str());
        assert_eq!(state, name.parse::<LeaderInternalState>()?);
    }

    let follower_states = [
        (FollowerInternalState::UninitializedState, "UninitializedState"),
        (
            FollowerInternalState::WaitForLeaderConfirmation,
            "WaitForLeaderConfirmation",
        ),
        (FollowerInternalState::TransferSnapshot, "TransferSnapshot"),
        (FollowerInternalState::NothingToApply, "NothingToApply"),
        (FollowerInternalState::ApplyRecentEntries, "ApplyRecentEntries"),
    ];

    for (state, name) in follower_states {
        assert_eq!(name, state.as_str());
        assert_eq!(state, name.parse::<FollowerInternalState>()?);
    }

    Ok(())
}

#[test]
fn test_unknown_state_name_is_rejected() {
    let err = "Bogus".parse::<LeaderInternalState>().unwrap_err();
    assert_eq!(Role::Leader, err.role);
    assert_eq!("Bogus", err.name);

    // State names are role-specific; a leader name is unknown to a follower.
    let err = "ServiceAvailable".parse::<FollowerInternalState>().unwrap_err();
    assert_eq!(Role::Follower, err.role);
}

#[test]
fn test_transition_clears_detail() {
    let mut m = ManagerState::<LeaderInternalState>::new();
    assert_eq!(LeaderInternalState::UninitializedState, m.state);
    assert_eq!(None, m.last_change);

    m.set_detail("log unreachable");
    assert_eq!(Some("log unreachable".to_string()), m.detail);
    assert!(m.last_change.is_some());

    m.transition_to(LeaderInternalState::WaitingForLeadershipEstablished);
    assert_eq!(None, m.detail);
    assert!(m.last_change.is_some());
}

#[test]
fn test_manager_state_serialization() -> anyhow::Result<()> {
    let mut m = ManagerState::<FollowerInternalState>::new();
    let got = serde_json::to_value(&m)?;
    assert_eq!(json!({"state": "UninitializedState"}), got);

    m.set_detail("x");
    let got = serde_json::to_value(&m)?;
    assert_eq!("x", got["detail"]);
    assert!(got["lastChange"].is_u64());

    Ok(())
}

#[test]
fn test_manager_state_parse() -> anyhow::Result<()> {
    let m = ManagerState::<LeaderInternalState>::parse(&json!({
        "state": "RecoveryInProgress",
        "detail": "slow disk",
        "lastChange": 1700000000000u64,
    }))?;

    assert_eq!(LeaderInternalState::RecoveryInProgress, m.state);
    assert_eq!(Some("slow disk".to_string()), m.detail);
    assert_eq!(1_700_000_000_000, m.last_change.unwrap().as_millis());

    Ok(())
}

#[test]
fn test_manager_state_parse_legacy_inner_key() -> anyhow::Result<()> {
    let m = ManagerState::<FollowerInternalState>::parse(&json!({
        "managerState": "TransferSnapshot",
    }))?;

    assert_eq!(FollowerInternalState::TransferSnapshot, m.state);
    assert_eq!(None, m.detail);

    Ok(())
}

#[test]
fn test_manager_state_parse_malformed() {
    let res = ManagerState::<LeaderInternalState>::parse(&json!("not an object"));
    assert!(matches!(res, Err(StatusParseError::Malformed(_))));

    let res = ManagerState::<LeaderInternalState>::parse(&json!({"detail": "x"}));
    assert!(matches!(res, Err(StatusParseError::Malformed(_))));

    let res = ManagerState::<LeaderInternalState>::parse(&json!({"state": "Bogus"}));
    assert!(matches!(res, Err(StatusParseError::UnknownState(_))));
}
