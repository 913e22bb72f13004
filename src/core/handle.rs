use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::InstanceClosed;
use crate::event::Event;
use crate::generation::StateGeneration;
use crate::status::StateStatus;
use crate::status::Wait;
use crate::types::StateId;

/// The controlling handle of one replicated-state instance.
///
/// Events are submitted through it to the instance's lifecycle worker, and
/// the status the worker publishes is read through it. Reading never
/// blocks and never contends with the worker: every read observes one
/// complete published [`StateStatus`] value.
#[derive(Debug)]
pub struct StateHandle {
    id: StateId,

    tx: mpsc::UnboundedSender<Event>,

    rx_status: watch::Receiver<StateStatus>,

    stale_events: Arc<AtomicU64>,

    join_handle: JoinHandle<()>,
}

impl StateHandle {
    pub(crate) fn new(
        id: StateId,
        tx: mpsc::UnboundedSender<Event>,
        rx_status: watch::Receiver<StateStatus>,
        stale_events: Arc<AtomicU64>,
        join_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            tx,
            rx_status,
            stale_events,
            join_handle,
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    /// Submit a collaborator event to the lifecycle worker.
    ///
    /// Events are applied strictly in submission order.
    pub fn submit(&self, event: Event) -> Result<(), InstanceClosed> {
        self.tx.send(event).map_err(|_| InstanceClosed::new(self.id))
    }

    /// A snapshot of the most recently published status.
    pub fn current_status(&self) -> StateStatus {
        self.rx_status.borrow().clone()
    }

    /// The generation of the most recently published status.
    pub fn current_generation(&self) -> StateGeneration {
        self.rx_status.borrow().generation()
    }

    /// Subscribe to status updates.
    pub fn watch(&self) -> watch::Receiver<StateStatus> {
        self.rx_status.clone()
    }

    /// Wait for the published status to satisfy some condition, up to
    /// `timeout` per condition.
    pub fn wait(&self, timeout: Duration) -> Wait {
        Wait {
            timeout,
            rx: self.rx_status.clone(),
        }
    }

    /// How many stale events this instance has dropped so far.
    pub fn stale_events(&self) -> u64 {
        self.stale_events.load(Ordering::Relaxed)
    }

    /// Shut the lifecycle worker down and wait for it to finish.
    ///
    /// Closing the event channel is the shutdown signal; the worker drains
    /// nothing and stops at the next await point.
    pub async fn shutdown(self) {
        let Self {
            id,
            tx,
            join_handle,
            ..
        } = self;

        drop(tx);

        if let Err(err) = join_handle.await {
            tracing::error!("joining lifecycle worker of instance {} failed: {}", id, err);
        }
    }
}
