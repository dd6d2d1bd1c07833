use crate::lock_or_recover;
use std::sync::{Condvar, Mutex};

#[derive(Debug)]
enum Slot {
    Idle,
    Pending,
    Answered(String),
    Released,
}

/// Why a prompt wait ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptError {
    /// Another prompt is already outstanding.
    AlreadyPending,
    /// The session was interrupted or killed while waiting.
    Released,
}

/// Single-slot handoff between a script blocked in `prompt()` and the controller.
///
/// At most one request is outstanding; it ends exactly once, with either `resolve`
/// or `release`.
pub(crate) struct PromptCell {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl PromptCell {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Idle),
            changed: Condvar::new(),
        }
    }

    /// Mark a request as outstanding so `resolve` can land before `wait` starts.
    pub(crate) fn open(&self) -> Result<(), PromptError> {
        let mut slot = lock_or_recover(&self.slot, "prompt open");
        if matches!(*slot, Slot::Pending) {
            return Err(PromptError::AlreadyPending);
        }
        *slot = Slot::Pending;
        Ok(())
    }

    /// Block until the outstanding request is resolved or released.
    pub(crate) fn wait(&self) -> Result<String, PromptError> {
        let mut slot = lock_or_recover(&self.slot, "prompt wait");
        while matches!(*slot, Slot::Pending) {
            slot = match self.changed.wait(slot) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Answered(value) => Ok(value),
            _ => Err(PromptError::Released),
        }
    }

    /// Hand `value` to the waiting script. False when nothing is outstanding.
    pub(crate) fn resolve(&self, value: String) -> bool {
        let mut slot = lock_or_recover(&self.slot, "prompt resolve");
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Answered(value);
        self.changed.notify_all();
        true
    }

    /// Unblock the waiting script without a value. False when nothing is outstanding.
    pub(crate) fn release(&self) -> bool {
        let mut slot = lock_or_recover(&self.slot, "prompt release");
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Released;
        self.changed.notify_all();
        true
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        matches!(*lock_or_recover(&self.slot, "prompt state"), Slot::Pending)
    }
}
