use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Idle and accepting commands.
    Ready = 0,
    /// Executing a command (or the preload sources).
    Busy = 1,
    /// Blocked in `prompt()` until a value is supplied.
    Waiting = 2,
    /// Interrupt teardown in progress.
    Interrupted = 3,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Ready,
            1 => SessionState::Busy,
            2 => SessionState::Waiting,
            _ => SessionState::Interrupted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Waiting => "waiting",
            SessionState::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Session state shared by the controller and the worker. Guarded transitions use
/// compare-and-swap so two threads never both win the same edge.
#[derive(Debug)]
pub(crate) struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub(crate) fn new(initial: SessionState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: SessionState) {
        let previous = SessionState::from_u8(self.0.swap(state as u8, Ordering::SeqCst));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "session state");
        }
    }

    /// Move `from -> to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let moved = self
            .0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if moved {
            tracing::debug!(from = %from, to = %to, "session state");
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_requires_expected_state() {
        let state = AtomicSessionState::new(SessionState::Busy);
        assert!(!state.transition(SessionState::Ready, SessionState::Busy));
        assert!(state.transition(SessionState::Busy, SessionState::Waiting));
        assert_eq!(state.load(), SessionState::Waiting);
        assert!(state.transition(SessionState::Waiting, SessionState::Busy));
        assert!(state.transition(SessionState::Busy, SessionState::Ready));
        assert_eq!(state.load(), SessionState::Ready);
    }

    #[test]
    fn store_overrides_any_state() {
        let state = AtomicSessionState::new(SessionState::Waiting);
        state.store(SessionState::Interrupted);
        assert_eq!(state.load(), SessionState::Interrupted);
        state.store(SessionState::Ready);
        assert_eq!(state.load().to_string(), "ready");
    }
}
