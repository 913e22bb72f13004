//! The per-instance lifecycle workers and their role state machines.

mod follower;
mod handle;
mod leader;
mod worker;


pub use handle::StateHandle;
pub use worker::LifecycleWorker;

pub(crate) use follower::FollowerStateMachine;
pub(crate) use leader::LeaderStateMachine;

/// How a role state machine disposed of an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventDisposition {
    /// The event changed the machine.
    Applied,

    /// The event carried an older generation and was dropped.
    Stale,

    /// The event was valid but redundant in the current state.
    Ignored,
}
