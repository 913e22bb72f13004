use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::Instant;
use validit::Validate;

use crate::config::Config;
use crate::core::EventDisposition;
use crate::core::FollowerStateMachine;
use crate::core::LeaderStateMachine;
use crate::core::StateHandle;
use crate::event::Event;
use crate::event::SnapshotOutcome;
use crate::generation::StateGeneration;
use crate::log::ReplicatedLog;
use crate::log::SnapshotTransport;
use crate::status::FollowerInternalState;
use crate::status::LeaderInternalState;
use crate::status::Role;
use crate::status::SnapshotStatus;
use crate::status::StateStatus;
use crate::status::TransferAttempt;
use crate::storage::ReplicatedStateMachine;
use crate::types::LogIndex;
use crate::types::ParticipantId;
use crate::types::StateId;

/// The role-specific lifecycle state machine a worker currently runs.
///
/// Replaced wholesale on a role change; the discarded role status is never
/// partially reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoleState {
    Leader(LeaderStateMachine),
    Follower(FollowerStateMachine),
}

impl RoleState {
    fn new(role: Role, generation: StateGeneration) -> Self {
        match role {
            Role::Leader => Self::Leader(LeaderStateMachine::new(generation)),
            Role::Follower => Self::Follower(FollowerStateMachine::new(generation)),
        }
    }

    fn generation(&self) -> StateGeneration {
        match self {
            Self::Leader(m) => m.generation(),
            Self::Follower(f) => f.generation(),
        }
    }

    fn status(&self) -> StateStatus {
        match self {
            Self::Leader(m) => StateStatus::Leader(m.status()),
            Self::Follower(f) => StateStatus::Follower(f.status()),
        }
    }
}

/// One blocking lifecycle step the worker drives against a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    ConfirmLeadership,
    IngestExistingLog,
    Recover,
    RegisterFollower { leader: ParticipantId },
    TransferSnapshot { attempt: TransferAttempt },
    ApplyEntries { first: LogIndex, last: LogIndex },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfirmLeadership => write!(f, "ConfirmLeadership"),
            Self::IngestExistingLog => write!(f, "IngestExistingLog"),
            Self::Recover => write!(f, "Recover"),
            Self::RegisterFollower { leader } => write!(f, "RegisterFollower(leader:{})", leader),
            Self::TransferSnapshot { attempt } => write!(f, "TransferSnapshot(attempt:{})", attempt),
            Self::ApplyEntries { first, last } => write!(f, "ApplyEntries([{}, {}])", first, last),
        }
    }
}

/// Successful completion of a [`Step`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepOk {
    LeadershipConfirmed,
    Ingested,
    Recovered,
    Registered,
    SnapshotReceived { covers_up_to: LogIndex },
    EntriesApplied { up_to: LogIndex },
}

/// What woke the worker while a step was in flight.
enum Wake {
    Event(Option<Event>),
    Step(Result<StepOk, String>),
}

/// The per-instance lifecycle worker.
///
/// It is the sole writer of its instance's status: it applies collaborator
/// events strictly in delivery order, drives the blocking lifecycle steps,
/// and publishes every change as one immutable [`StateStatus`] value
/// through a watch channel. An in-flight step is cancelled by dropping its
/// future whenever an event arrives, so a newer generation supersedes it
/// promptly and no partial result of an abandoned attempt is ever
/// committed.
pub struct LifecycleWorker<L, SM, T>
where
    L: ReplicatedLog,
    SM: ReplicatedStateMachine,
    T: SnapshotTransport,
{
    id: StateId,

    config: Arc<Config>,

    /// The replicated log underlying this instance.
    log: L,

    /// The application state machine entries are replayed into.
    state_machine: SM,

    /// Transfers leader snapshots to this node when it follows.
    transport: T,

    role: RoleState,

    rx: mpsc::UnboundedReceiver<Event>,

    tx_status: watch::Sender<StateStatus>,

    stale_events: Arc<AtomicU64>,

    /// Delay before retrying the last failed step.
    backoff: Option<Duration>,
}

impl<L, SM, T> LifecycleWorker<L, SM, T>
where
    L: ReplicatedLog,
    SM: ReplicatedStateMachine,
    T: SnapshotTransport,
{
    /// Spawn the lifecycle worker of one replicated-state instance, and
    /// return the controlling handle.
    ///
    /// `generation` is the first generation the instance observes, `role`
    /// the role it is created with.
    pub fn spawn(
        id: StateId,
        config: Arc<Config>,
        role: Role,
        generation: StateGeneration,
        log: L,
        state_machine: SM,
        transport: T,
    ) -> StateHandle {
        let role = RoleState::new(role, generation);

        let (tx_event, rx_event) = mpsc::unbounded_channel();
        let (tx_status, rx_status) = watch::channel(role.status());
        let stale_events = Arc::new(AtomicU64::new(0));

        let worker = LifecycleWorker {
            id,
            config,
            log,
            state_machine,
            transport,
            role,
            rx: rx_event,
            tx_status,
            stale_events: stale_events.clone(),
            backoff: None,
        };

        let join_handle = tokio::spawn(worker.main());

        StateHandle::new(id, tx_event, rx_status, stale_events, join_handle)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(id = self.id))]
    async fn main(mut self) {
        tracing::info!(
            "lifecycle worker started: instance {}, {}",
            self.id,
            self.role.status()
        );

        loop {
            if let Some(delay) = self.backoff.take() {
                if !self.backoff_wait(delay).await {
                    break;
                }
                continue;
            }

            match self.plan_step() {
                None => match self.rx.recv().await {
                    None => break,
                    Some(ev) => {
                        self.handle_event(ev);
                    }
                },
                Some(step) => {
                    if !self.run_step(step).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("lifecycle worker stopped: instance {}", self.id);
    }

    /// Sleep before retrying a failed step, while staying responsive to
    /// events. Returns `false` on shutdown.
    async fn backoff_wait(&mut self, delay: Duration) -> bool {
        tracing::debug!("instance {}: backing off for {:?}", self.id, delay);

        let deadline = Instant::now() + delay;
        loop {
            let wake = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => None,
                ev = self.rx.recv() => Some(ev),
            };

            match wake {
                None => return true,
                Some(None) => return false,
                Some(Some(ev)) => {
                    // Only a generation change invalidates the pending
                    // retry; anything else keeps waiting.
                    let before = self.role.generation();
                    if self.handle_event(ev) == EventDisposition::Applied
                        && self.role.generation() != before
                    {
                        return true;
                    }
                }
            }
        }
    }

    /// Decide the next blocking step for the current state, if any.
    fn plan_step(&mut self) -> Option<Step> {
        match &mut self.role {
            RoleState::Leader(m) => match m.state() {
                LeaderInternalState::UninitializedState | LeaderInternalState::ServiceAvailable => {
                    None
                }
                LeaderInternalState::WaitingForLeadershipEstablished => {
                    Some(Step::ConfirmLeadership)
                }
                LeaderInternalState::IngestingExistingLog => Some(Step::IngestExistingLog),
                LeaderInternalState::RecoveryInProgress => Some(Step::Recover),
            },
            RoleState::Follower(f) => match f.state() {
                FollowerInternalState::UninitializedState
                | FollowerInternalState::NothingToApply => None,
                FollowerInternalState::WaitForLeaderConfirmation => {
                    f.leader().map(|leader| Step::RegisterFollower { leader })
                }
                FollowerInternalState::TransferSnapshot => {
                    if f.is_degraded() {
                        // Out of retries; only supersession restarts the
                        // transfer.
                        return None;
                    }
                    let attempt = if f.snapshot_status() == SnapshotStatus::InProgress {
                        f.current_attempt()
                    } else {
                        f.begin_transfer()
                    };
                    Some(Step::TransferSnapshot { attempt })
                }
                FollowerInternalState::ApplyRecentEntries => {
                    if f.target() > f.applied() {
                        Some(Step::ApplyEntries {
                            first: f.applied() + 1,
                            last: f.target(),
                        })
                    } else {
                        None
                    }
                }
            },
        }
    }

    /// Run one step, racing it against incoming events. Returns `false` on
    /// shutdown.
    async fn run_step(&mut self, step: Step) -> bool {
        tracing::debug!("instance {}: running step {}", self.id, step);

        // Make any attempt begun while planning visible before blocking.
        self.publish();

        let generation = self.role.generation();

        let wake = tokio::select! {
            ev = self.rx.recv() => Wake::Event(ev),
            res = Self::perform_step(
                &step,
                generation,
                &mut self.log,
                &mut self.state_machine,
                &mut self.transport,
            ) => Wake::Step(res),
        };

        match wake {
            Wake::Event(None) => false,
            Wake::Event(Some(ev)) => {
                // The step future is dropped: cancelled, no partial result
                // is committed.
                tracing::debug!("instance {}: step {} interrupted by event", self.id, step);
                self.handle_event(ev);
                true
            }
            Wake::Step(res) => {
                self.on_step_result(step, res);
                true
            }
        }
    }

    async fn perform_step(
        step: &Step,
        generation: StateGeneration,
        log: &mut L,
        state_machine: &mut SM,
        transport: &mut T,
    ) -> Result<StepOk, String> {
        match step {
            Step::ConfirmLeadership => {
                log.confirm_leadership(generation).await.map_err(|e| e.to_string())?;
                Ok(StepOk::LeadershipConfirmed)
            }
            Step::IngestExistingLog => {
                let entries = log.read_existing(generation).await.map_err(|e| e.to_string())?;
                state_machine.ingest(entries).await.map_err(|e| e.to_string())?;
                Ok(StepOk::Ingested)
            }
            Step::Recover => {
                state_machine.recover().await.map_err(|e| e.to_string())?;
                Ok(StepOk::Recovered)
            }
            Step::RegisterFollower { leader } => {
                log.register_follower(generation, *leader).await.map_err(|e| e.to_string())?;
                Ok(StepOk::Registered)
            }
            Step::TransferSnapshot { attempt } => {
                let covers_up_to =
                    transport.transfer(*attempt, generation).await.map_err(|e| e.to_string())?;
                Ok(StepOk::SnapshotReceived { covers_up_to })
            }
            Step::ApplyEntries { first, last } => {
                let entries = log.fetch_entries(*first, *last).await.map_err(|e| e.to_string())?;
                state_machine.apply(entries).await.map_err(|e| e.to_string())?;
                Ok(StepOk::EntriesApplied { up_to: *last })
            }
        }
    }

    fn on_step_result(&mut self, step: Step, res: Result<StepOk, String>) {
        match res {
            Ok(ok) => {
                match (&mut self.role, ok) {
                    (RoleState::Leader(m), StepOk::LeadershipConfirmed) => m.leadership_confirmed(),
                    (RoleState::Leader(m), StepOk::Ingested) => m.ingest_done(),
                    (RoleState::Leader(m), StepOk::Recovered) => m.recovery_done(),
                    (RoleState::Follower(f), StepOk::Registered) => {
                        f.registration_acked();
                    }
                    (RoleState::Follower(f), StepOk::SnapshotReceived { covers_up_to }) => {
                        f.transfer_succeeded(covers_up_to)
                    }
                    (RoleState::Follower(f), StepOk::EntriesApplied { up_to }) => {
                        f.entries_applied(up_to)
                    }
                    (role, ok) => {
                        tracing::error!(
                            "instance {}: impossible step result {:?} for role status {}",
                            self.id,
                            ok,
                            role.status()
                        );
                        debug_assert!(false, "impossible role/step combination");
                    }
                }
                self.publish();
            }
            Err(detail) => {
                tracing::warn!("instance {}: step {} failed: {}", self.id, step, detail);

                let is_transfer = matches!(step, Step::TransferSnapshot { .. });

                match &mut self.role {
                    RoleState::Leader(m) => m.record_failure(&detail),
                    RoleState::Follower(f) => {
                        if is_transfer {
                            f.transfer_failed(&detail);
                        } else {
                            f.record_failure(&detail);
                        }
                    }
                }

                if is_transfer {
                    self.after_transfer_failure();
                } else {
                    // Retried forever, until success or supersession.
                    self.backoff = Some(self.config.new_rand_backoff());
                }

                self.publish();
            }
        }
    }

    /// Apply one collaborator event to the role state machine.
    fn handle_event(&mut self, ev: Event) -> EventDisposition {
        tracing::debug!("instance {}: received event {}", self.id, ev);

        let generation_before = self.role.generation();

        let disposition = match ev {
            Event::LeadershipEstablished { generation } => {
                if let RoleState::Leader(m) = &mut self.role {
                    m.handle_leadership_established(generation)
                } else {
                    self.change_role(Role::Leader, generation)
                }
            }
            Event::LeaderIdentified { generation, leader } => {
                if let RoleState::Follower(f) = &mut self.role {
                    f.handle_leader_identified(generation, leader)
                } else {
                    let d = self.change_role(Role::Follower, generation);
                    if d == EventDisposition::Applied {
                        if let RoleState::Follower(f) = &mut self.role {
                            f.handle_leader_identified(generation, leader);
                        }
                    }
                    d
                }
            }
            Event::LogEntriesAvailable { up_to } => match &mut self.role {
                RoleState::Follower(f) => f.entries_available(up_to),
                RoleState::Leader(_) => {
                    // The leader applies its own writes; availability
                    // notifications only matter to followers.
                    EventDisposition::Ignored
                }
            },
            Event::SnapshotTransferResult { attempt, outcome } => {
                self.handle_snapshot_result(attempt, outcome)
            }
        };

        match disposition {
            EventDisposition::Applied => {
                // Supersession abandons the superseded step's backoff. A
                // backoff installed by this event itself, a failed transfer
                // result, must survive.
                if self.role.generation() != generation_before {
                    self.backoff = None;
                }
                self.publish();
            }
            EventDisposition::Stale => {
                self.stale_events.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("instance {}: dropping stale event", self.id);
            }
            EventDisposition::Ignored => {}
        }

        disposition
    }

    /// Replace the whole role status with a fresh one at `generation`, if
    /// `generation` supersedes the current one.
    fn change_role(&mut self, role: Role, generation: StateGeneration) -> EventDisposition {
        let current = self.role.generation();
        if generation < current {
            return EventDisposition::Stale;
        }
        if generation == current {
            // A duplicate delivery for the generation already in effect.
            return EventDisposition::Ignored;
        }

        tracing::info!(
            "instance {}: role change {} -> {} at {}",
            self.id,
            self.role.status().role(),
            role,
            generation
        );

        self.role = RoleState::new(role, generation);

        if role == Role::Leader {
            if let RoleState::Leader(m) = &mut self.role {
                m.handle_leadership_established(generation);
            }
        }

        EventDisposition::Applied
    }

    fn handle_snapshot_result(
        &mut self,
        attempt: TransferAttempt,
        outcome: SnapshotOutcome,
    ) -> EventDisposition {
        let failed = matches!(&outcome, SnapshotOutcome::Failure { .. });

        let disposition = match &mut self.role {
            RoleState::Follower(f)
                if f.state() == FollowerInternalState::TransferSnapshot
                    && !f.is_degraded()
                    && attempt == f.current_attempt() =>
            {
                match outcome {
                    SnapshotOutcome::Success { covers_up_to } => {
                        f.transfer_succeeded(covers_up_to);
                    }
                    SnapshotOutcome::Failure { detail } => {
                        f.transfer_failed(detail);
                    }
                }
                EventDisposition::Applied
            }
            _ => {
                tracing::debug!(
                    "instance {}: dropping snapshot result for outdated attempt {}",
                    self.id,
                    attempt
                );
                EventDisposition::Ignored
            }
        };

        if disposition == EventDisposition::Applied && failed {
            self.after_transfer_failure();
        }

        disposition
    }

    /// Schedule a transfer retry, or report the follower degraded once the
    /// retry bound is exhausted.
    fn after_transfer_failure(&mut self) {
        let RoleState::Follower(f) = &mut self.role else {
            return;
        };

        if f.transfer_attempts() >= self.config.snapshot_max_attempts {
            tracing::warn!(
                "instance {}: snapshot transfer retries exhausted after {} attempts, degraded",
                self.id,
                f.transfer_attempts()
            );
            f.mark_degraded();
        } else {
            self.backoff = Some(self.config.new_rand_backoff());
        }
    }

    /// Publish the current status as one immutable value.
    fn publish(&self) {
        let status = self.role.status();

        debug_assert!(
            status.validate().is_ok(),
            "publishing an invalid status: {}",
            status
        );

        self.tx_status.send_replace(status);
    }
}
