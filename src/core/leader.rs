use std::cmp::Ordering;

use crate::core::EventDisposition;
use crate::generation::StateGeneration;
use crate::status::LeaderInternalState;
use crate::status::LeaderStatus;
use crate::status::ManagerState;
use crate::status::SnapshotInfo;

/// The leader-side lifecycle state machine of one replicated-state
/// instance.
///
/// Within a generation the progression is strictly linear:
/// `UninitializedState -> WaitingForLeadershipEstablished ->
/// IngestingExistingLog -> RecoveryInProgress -> ServiceAvailable`.
/// An event tagged with a newer generation resets the machine to
/// `UninitializedState` at that generation; an older one is rejected as
/// stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeaderStateMachine {
    manager_state: ManagerState<LeaderInternalState>,
    generation: StateGeneration,
    snapshot: SnapshotInfo,
}

impl LeaderStateMachine {
    pub(crate) fn new(generation: StateGeneration) -> Self {
        Self {
            manager_state: ManagerState::new(),
            generation,
            snapshot: SnapshotInfo::new(),
        }
    }

    pub(crate) fn generation(&self) -> StateGeneration {
        self.generation
    }

    pub(crate) fn state(&self) -> LeaderInternalState {
        self.manager_state.state
    }

    /// Build an independent copy of the current status.
    pub(crate) fn status(&self) -> LeaderStatus {
        LeaderStatus {
            manager_state: self.manager_state.clone(),
            generation: self.generation,
            snapshot: self.snapshot.clone(),
        }
    }

    /// Handle a leadership-acquired event tagged with `generation`.
    ///
    /// - Older generation: stale, rejected.
    /// - Current generation: starts the bootstrap if still uninitialized,
    ///   otherwise it is a duplicate delivery and is ignored.
    /// - Newer generation: supersession. From `UninitializedState` the
    ///   bootstrap starts directly at the new generation; from any other
    ///   state the machine resets to `UninitializedState` and awaits the
    ///   next leadership event.
    pub(crate) fn handle_leadership_established(
        &mut self,
        generation: StateGeneration,
    ) -> EventDisposition {
        match generation.cmp(&self.generation) {
            Ordering::Less => EventDisposition::Stale,
            Ordering::Equal => {
                if self.state() == LeaderInternalState::UninitializedState {
                    self.manager_state
                        .transition_to(LeaderInternalState::WaitingForLeadershipEstablished);
                    EventDisposition::Applied
                } else {
                    EventDisposition::Ignored
                }
            }
            Ordering::Greater => {
                if self.state() == LeaderInternalState::UninitializedState {
                    self.generation = generation;
                    self.manager_state
                        .transition_to(LeaderInternalState::WaitingForLeadershipEstablished);
                } else {
                    self.reset(generation);
                }
                EventDisposition::Applied
            }
        }
    }

    /// Reset to `UninitializedState` at `generation`, discarding any
    /// in-progress bootstrap.
    pub(crate) fn reset(&mut self, generation: StateGeneration) {
        tracing::info!(
            "leader lifecycle superseded: {} -> {}, resetting from {}",
            self.generation,
            generation,
            self.state()
        );

        *self = Self::new(generation);
    }

    /// The log confirmed that this node's leadership is durable.
    pub(crate) fn leadership_confirmed(&mut self) {
        debug_assert_eq!(
            self.state(),
            LeaderInternalState::WaitingForLeadershipEstablished,
            "leadership confirmed in unexpected state"
        );
        self.manager_state.transition_to(LeaderInternalState::IngestingExistingLog);
    }

    /// All entries written by prior leaders have been read and indexed.
    pub(crate) fn ingest_done(&mut self) {
        debug_assert_eq!(
            self.state(),
            LeaderInternalState::IngestingExistingLog,
            "ingest finished in unexpected state"
        );
        self.manager_state.transition_to(LeaderInternalState::RecoveryInProgress);
    }

    /// All ingested entries have been replayed; the instance now serves.
    pub(crate) fn recovery_done(&mut self) {
        debug_assert_eq!(
            self.state(),
            LeaderInternalState::RecoveryInProgress,
            "recovery finished in unexpected state"
        );
        self.manager_state.transition_to(LeaderInternalState::ServiceAvailable);
    }

    /// Record a step failure as diagnostic detail on the current state.
    /// The step is retried; no transition happens.
    pub(crate) fn record_failure(&mut self, detail: impl ToString) {
        self.manager_state.set_detail(detail);
    }
}
