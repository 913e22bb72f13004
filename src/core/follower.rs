use std::cmp::Ordering;

use crate::core::EventDisposition;
use crate::generation::StateGeneration;
use crate::status::FollowerInternalState;
use crate::status::FollowerStatus;
use crate::status::ManagerState;
use crate::status::SnapshotInfo;
use crate::status::SnapshotStatus;
use crate::status::TransferAttempt;
use crate::types::LogIndex;
use crate::types::ParticipantId;

/// The follower-side lifecycle state machine of one replicated-state
/// instance.
///
/// Bootstrap: `UninitializedState -> WaitForLeaderConfirmation ->
/// TransferSnapshot`, then the steady oscillation
/// `NothingToApply <-> ApplyRecentEntries` for the lifetime of the
/// follower. Supersession and staleness are handled as on the leader side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FollowerStateMachine {
    manager_state: ManagerState<FollowerInternalState>,
    generation: StateGeneration,
    snapshot: SnapshotInfo,

    /// The leader this follower registers with; known once identified.
    leader: Option<ParticipantId>,

    /// Highest log index applied to the application state machine.
    applied: LogIndex,

    /// Highest log index known to be available from the log.
    target: LogIndex,

    /// Transfer attempts consumed under the current generation.
    transfer_attempts: u64,

    /// Set when the transfer retry bound is exhausted; cleared only by a
    /// generation reset.
    degraded: bool,
}

impl FollowerStateMachine {
    pub(crate) fn new(generation: StateGeneration) -> Self {
        Self {
            manager_state: ManagerState::new(),
            generation,
            snapshot: SnapshotInfo::new(),
            leader: None,
            applied: 0,
            target: 0,
            transfer_attempts: 0,
            degraded: false,
        }
    }

    pub(crate) fn generation(&self) -> StateGeneration {
        self.generation
    }

    pub(crate) fn state(&self) -> FollowerInternalState {
        self.manager_state.state
    }

    pub(crate) fn leader(&self) -> Option<ParticipantId> {
        self.leader
    }

    pub(crate) fn applied(&self) -> LogIndex {
        self.applied
    }

    pub(crate) fn target(&self) -> LogIndex {
        self.target
    }

    pub(crate) fn transfer_attempts(&self) -> u64 {
        self.transfer_attempts
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub(crate) fn current_attempt(&self) -> TransferAttempt {
        self.snapshot.attempt
    }

    pub(crate) fn snapshot_status(&self) -> SnapshotStatus {
        self.snapshot.status
    }

    /// Build an independent copy of the current status.
    pub(crate) fn status(&self) -> FollowerStatus {
        FollowerStatus {
            manager_state: self.manager_state.clone(),
            generation: self.generation,
            snapshot: self.snapshot.clone(),
        }
    }

    /// Handle a leader-identified event tagged with `generation`.
    ///
    /// Freshness rules mirror the leader machine: older is stale, equal is
    /// a duplicate outside `UninitializedState`, newer supersedes.
    pub(crate) fn handle_leader_identified(
        &mut self,
        generation: StateGeneration,
        leader: ParticipantId,
    ) -> EventDisposition {
        match generation.cmp(&self.generation) {
            Ordering::Less => EventDisposition::Stale,
            Ordering::Equal => {
                if self.state() == FollowerInternalState::UninitializedState {
                    self.leader = Some(leader);
                    self.manager_state
                        .transition_to(FollowerInternalState::WaitForLeaderConfirmation);
                    EventDisposition::Applied
                } else {
                    EventDisposition::Ignored
                }
            }
            Ordering::Greater => {
                if self.state() == FollowerInternalState::UninitializedState {
                    self.generation = generation;
                    self.leader = Some(leader);
                    self.manager_state
                        .transition_to(FollowerInternalState::WaitForLeaderConfirmation);
                } else {
                    self.reset(generation);
                }
                EventDisposition::Applied
            }
        }
    }

    /// Reset to `UninitializedState` at `generation` with a fresh
    /// `SnapshotInfo`, abandoning registration, transfer and catch-up
    /// progress.
    pub(crate) fn reset(&mut self, generation: StateGeneration) {
        tracing::info!(
            "follower lifecycle superseded: {} -> {}, resetting from {}",
            self.generation,
            generation,
            self.state()
        );

        *self = Self::new(generation);
    }

    /// The leader acknowledged this follower's registration: start the
    /// first snapshot transfer attempt.
    pub(crate) fn registration_acked(&mut self) -> TransferAttempt {
        debug_assert_eq!(
            self.state(),
            FollowerInternalState::WaitForLeaderConfirmation,
            "registration acknowledged in unexpected state"
        );

        self.manager_state.transition_to(FollowerInternalState::TransferSnapshot);
        self.begin_transfer()
    }

    /// Begin a fresh transfer attempt and return its id.
    pub(crate) fn begin_transfer(&mut self) -> TransferAttempt {
        let attempt = TransferAttempt::new(self.transfer_attempts);
        self.transfer_attempts += 1;
        self.snapshot.begin(attempt);
        attempt
    }

    /// The snapshot covering the log up to `covers_up_to` was received.
    pub(crate) fn transfer_succeeded(&mut self, covers_up_to: LogIndex) {
        debug_assert_eq!(
            self.state(),
            FollowerInternalState::TransferSnapshot,
            "snapshot transfer finished in unexpected state"
        );

        self.snapshot.complete();
        self.applied = covers_up_to;
        self.target = self.target.max(covers_up_to);

        if self.target > self.applied {
            self.manager_state.transition_to(FollowerInternalState::ApplyRecentEntries);
        } else {
            self.manager_state.transition_to(FollowerInternalState::NothingToApply);
        }
    }

    /// A transfer attempt failed; the state stays `TransferSnapshot` and
    /// the failure is recorded for observability.
    pub(crate) fn transfer_failed(&mut self, detail: impl ToString) {
        debug_assert_eq!(
            self.state(),
            FollowerInternalState::TransferSnapshot,
            "snapshot transfer failed in unexpected state"
        );

        self.snapshot.fail(detail);
    }

    /// The transfer retry bound is exhausted: report degraded, keep
    /// running, and wait for supersession.
    pub(crate) fn mark_degraded(&mut self) {
        self.degraded = true;
        self.manager_state.set_detail(format!(
            "snapshot transfer degraded after {} failed attempts",
            self.transfer_attempts
        ));
    }

    /// New entries up to `up_to` are available.
    pub(crate) fn entries_available(&mut self, up_to: LogIndex) -> EventDisposition {
        if up_to <= self.target {
            return EventDisposition::Ignored;
        }

        self.target = up_to;

        match self.state() {
            FollowerInternalState::NothingToApply => {
                self.manager_state.transition_to(FollowerInternalState::ApplyRecentEntries);
                EventDisposition::Applied
            }
            FollowerInternalState::ApplyRecentEntries => EventDisposition::Applied,
            // Not catching up yet; the raised target is picked up after
            // the snapshot transfer completes.
            _ => EventDisposition::Ignored,
        }
    }

    /// All entries up to `up_to` have been applied.
    pub(crate) fn entries_applied(&mut self, up_to: LogIndex) {
        debug_assert_eq!(
            self.state(),
            FollowerInternalState::ApplyRecentEntries,
            "entries applied in unexpected state"
        );

        self.applied = self.applied.max(up_to);

        if self.applied >= self.target {
            self.manager_state.transition_to(FollowerInternalState::NothingToApply);
        }
    }

    /// Record a catch-up failure as diagnostic detail on the current
    /// state. The step is retried; no transition, no skipped entries.
    pub(crate) fn record_failure(&mut self, detail: impl ToString) {
        self.manager_state.set_detail(detail);
    }
}
