//! Single-flight population slots.
//!
//! A [`Slot`] is the cell behind one cache key while that key is being
//! populated. The caller that claims a missing key creates the slot in the
//! `InFlight` state and runs the factory; every other caller for the same key
//! blocks on the slot and receives a clone of whatever the winner publishes.
//! A slot that ends without a cacheable value (provider fault, confirmed
//! non-existence, panic) carries no payload; observers are told which of the
//! two happened so they can either report "absent" or re-enter the table and
//! retry.

use std::sync::{Condvar, Mutex, PoisonError};

/// Population states for a slot.
#[derive(Debug)]
enum SlotState<V> {
    /// The claiming caller is still computing the value.
    InFlight,
    /// The value is published; every observer gets a clone.
    Ready(V),
    /// The computation confirmed the key does not exist. Nothing is cached.
    Missing,
    /// The computation failed or was torn down. Observers retry.
    Abandoned,
}

/// Outcome observed by a caller blocking on someone else's population.
#[derive(Debug, PartialEq, Eq)]
pub enum Waited<V> {
    /// The winner published a value.
    Ready(V),
    /// The winner confirmed the key does not exist.
    Missing,
    /// The winner failed; the observer should retry from the table.
    Abandoned,
}

/// A per-key population cell shared between one winner and any number of
/// waiters.
#[derive(Debug)]
pub struct Slot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V: Clone> Slot<V> {
    /// Creates a slot in the `InFlight` state.
    #[must_use]
    pub fn in_flight() -> Self {
        Self {
            state: Mutex::new(SlotState::InFlight),
            ready: Condvar::new(),
        }
    }

    /// Publishes `value` and wakes all waiters.
    pub fn fulfill(&self, value: V) {
        self.transition(SlotState::Ready(value));
    }

    /// Records a confirmed-absent outcome and wakes all waiters.
    pub fn resolve_missing(&self) {
        self.transition(SlotState::Missing);
    }

    /// Marks an `InFlight` slot as abandoned and wakes all waiters. A slot
    /// that already resolved is left as-is, so the teardown guard can call
    /// this unconditionally.
    pub fn abandon(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SlotState::InFlight) {
            *state = SlotState::Abandoned;
        }
        drop(state);
        self.ready.notify_all();
    }

    /// Blocks until the slot leaves `InFlight` and reports the outcome.
    #[must_use]
    pub fn wait(&self) -> Waited<V> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*state {
                SlotState::Ready(value) => return Waited::Ready(value.clone()),
                SlotState::Missing => return Waited::Missing,
                SlotState::Abandoned => return Waited::Abandoned,
                SlotState::InFlight => {
                    state = self
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Applies `f` to the published value, if there is one.
    pub fn update<R>(&self, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            SlotState::Ready(value) => Some(f(value)),
            _ => None,
        }
    }

    fn transition(&self, next: SlotState<V>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
        drop(state);
        self.ready.notify_all();
    }
}
