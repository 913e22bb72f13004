//! repstate is a lifecycle manager for instances of replicated state built
//! on top of a replicated log.
//!
//! Each instance runs as exactly one of two roles. A leader bootstraps
//! through leadership confirmation, log ingest and recovery before serving;
//! a follower registers with its leader, receives a state snapshot and then
//! keeps applying recent log entries as they arrive. Both roles publish
//! their progress as a serializable [`StateStatus`] that external observers
//! read without ever blocking the lifecycle itself.
//!
//! Every status is valid under a [`StateGeneration`]: a monotonically
//! growing epoch that advances on each leadership change. Events tagged
//! with an older generation are dropped as stale; a newer generation
//! supersedes whatever the instance is doing and restarts the lifecycle
//! from scratch.
//!
//! # Example
//!
//! ```ignore
//! let config = Arc::new(Config::default().validate()?);
//! let handle = LifecycleWorker::spawn(
//!     1, config, Role::Follower, StateGeneration::INITIAL,
//!     log, state_machine, transport,
//! );
//!
//! handle.submit(Event::LeaderIdentified { generation: StateGeneration::new(1), leader: 2 })?;
//!
//! handle
//!     .wait(Duration::from_millis(500))
//!     .follower_state(FollowerInternalState::NothingToApply, "caught up")
//!     .await?;
//! ```

mod config;
mod display_ext;
mod generation;
mod registry;

pub mod core;
pub mod error;
pub mod event;
pub mod log;
pub mod status;
pub mod storage;
pub mod types;

pub use config::Config;
pub use config::ConfigError;
pub use core::LifecycleWorker;
pub use core::StateHandle;
pub use event::Event;
pub use event::SnapshotOutcome;
pub use generation::StateGeneration;
pub use log::LogEntry;
pub use log::ReplicatedLog;
pub use log::SnapshotTransport;
pub use registry::StateRegistry;
pub use status::FollowerInternalState;
pub use status::FollowerStatus;
pub use status::LeaderInternalState;
pub use status::LeaderStatus;
pub use status::ManagerState;
pub use status::Role;
pub use status::SnapshotInfo;
pub use status::SnapshotStatus;
pub use status::StateStatus;
pub use status::TransferAttempt;
pub use status::Wait;
pub use status::WaitError;
pub use storage::ReplicatedStateMachine;
pub use types::LogIndex;
pub use types::ParticipantId;
pub use types::StateId;
