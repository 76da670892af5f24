//! Concurrency gate for connection handlers
//!
//! A shared counter of active handlers guarded by a mutex, with the accept
//! loop blocking on "active below max". Each slot is owned by a
//! [`GatePermit`]; dropping the permit frees the slot and wakes one waiter.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Bounds the number of simultaneously active connection handlers
#[derive(Debug)]
pub struct ConcurrencyGate {
    active: Mutex<usize>,
    slot_freed: Condvar,
    max: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max` holders (at least one)
    pub fn new(max: usize) -> Self {
        Self {
            active: Mutex::new(0),
            slot_freed: Condvar::new(),
            max: max.max(1),
        }
    }

    fn active_guard(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a slot is free and take it
    pub fn acquire(self: &Arc<Self>) -> GatePermit {
        let active = self.active_guard();
        let mut active = self
            .slot_freed
            .wait_while(active, |active| *active >= self.max)
            .unwrap_or_else(PoisonError::into_inner);
        *active += 1;

        GatePermit { gate: self.clone() }
    }

    /// Number of slots currently held
    pub fn active(&self) -> usize {
        *self.active_guard()
    }

    /// Maximum number of slots
    pub fn max(&self) -> usize {
        self.max
    }

    fn release(&self) {
        {
            let mut active = self.active_guard();
            *active = active.saturating_sub(1);
        }
        self.slot_freed.notify_one();
    }
}

/// One held slot of a [`ConcurrencyGate`]
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<ConcurrencyGate>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
