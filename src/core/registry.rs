//! # Component registry.
//!
//! Ordered collection of attached components. Insertion order is the start
//! order. Each entry gets an opaque [`ComponentId`] at attach time so it can
//! be removed when its own `stop` completes without disturbing the others.
//!
//! ## Rules
//! - A component is registered from the moment `attach` returns until its
//!   `stop` completes during a shutdown or reload.
//! - The `started` flag flips to true atomically with the start sequence
//!   reaching the end of the list, so a component attached concurrently is
//!   either picked up by the sequence or started by `attach`, never both.
//! - The lock is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::components::ComponentRef;

/// Opaque identity of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ComponentId(u64);

struct Entry {
    id: ComponentId,
    component: ComponentRef,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    next_id: u64,
    started: bool,
}

/// Ordered registry of attached components.
#[derive(Default)]
pub(crate) struct Registry {
    state: Mutex<State>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends `component`. Returns true if the start sequence already
    /// completed, in which case the caller must start it now.
    pub(crate) fn attach(&self, component: ComponentRef) -> bool {
        let mut state = self.lock();
        let id = ComponentId(state.next_id);
        state.next_id += 1;
        state.entries.push(Entry { id, component });
        state.started
    }

    /// Component at position `idx` for the start sequence.
    ///
    /// Past the end, marks the registry as started and returns `None`.
    pub(crate) fn next_to_start(&self, idx: usize) -> Option<ComponentRef> {
        let mut state = self.lock();
        match state.entries.get(idx) {
            Some(entry) => Some(Arc::clone(&entry.component)),
            None => {
                state.started = true;
                None
            }
        }
    }

    /// Everything currently registered, for the stop fan-out.
    pub(crate) fn stopping(&self) -> Vec<(ComponentId, ComponentRef)> {
        self.lock()
            .entries
            .iter()
            .map(|e| (e.id, Arc::clone(&e.component)))
            .collect()
    }

    /// Removes the entry with `id`. Returns false if it was already gone.
    pub(crate) fn remove(&self, id: ComponentId) -> bool {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        state.entries.len() != before
    }

    /// Resets the started flag once the stop fan-out concluded.
    pub(crate) fn mark_stopped(&self) {
        self.lock().started = false;
    }

    pub(crate) fn is_started(&self) -> bool {
        self.lock().started
    }

    /// Names of registered components, in attachment order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|e| e.component.name().to_string())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
