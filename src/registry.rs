//! A process-wide directory of running replicated-state instances.

use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::core::StateHandle;
use crate::generation::StateGeneration;
use crate::status::StateStatus;
use crate::types::StateId;

/// Maps instance ids to the handles of their lifecycle workers.
///
/// Shared read access for status observers; exclusive access only to add or
/// remove an instance. Status reads go through the handles' watch channels
/// and never block a lifecycle worker.
#[derive(Debug, Default)]
pub struct StateRegistry {
    handles: RwLock<BTreeMap<StateId, StateHandle>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running instance, returning the previous handle under the
    /// same id, if any.
    pub fn insert(&self, handle: StateHandle) -> Option<StateHandle> {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        handles.insert(handle.id(), handle)
    }

    /// Remove an instance, handing its handle back to the caller for
    /// shutdown.
    pub fn remove(&self, id: StateId) -> Option<StateHandle> {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        handles.remove(&id)
    }

    pub fn contains(&self, id: StateId) -> bool {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.contains_key(&id)
    }

    /// The current status of one instance.
    pub fn status_of(&self, id: StateId) -> Option<StateStatus> {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.get(&id).map(|h| h.current_status())
    }

    /// The current generation of one instance.
    pub fn generation_of(&self, id: StateId) -> Option<StateGeneration> {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.get(&id).map(|h| h.current_generation())
    }

    /// A consistent-per-instance snapshot of all statuses, in id order.
    pub fn all_statuses(&self) -> BTreeMap<StateId, StateStatus> {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.iter().map(|(id, h)| (*id, h.current_status())).collect()
    }

    pub fn len(&self) -> usize {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
