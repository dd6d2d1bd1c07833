use crate::lock_or_recover;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// How the worker treats a command once it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Configured source run at session start.
    Preload,
    /// User-selected document run at session start, bracketed by run start/end events.
    Script,
    /// Typed by the user; reports exactly one outcome.
    Interactive,
    /// Empty command queued after an interrupt to settle the runtime. Reports nothing.
    Flush,
}

impl CommandKind {
    pub fn is_source(self) -> bool {
        matches!(self, CommandKind::Preload | CommandKind::Script)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Submission order within the session.
    pub seq: u64,
    pub kind: CommandKind,
    pub text: String,
    /// Display name for source commands.
    pub name: Option<String>,
}

struct QueueState {
    items: VecDeque<Command>,
    next_seq: u64,
    epoch: u64,
}

/// FIFO of pending commands shared by the controller (producer) and the worker
/// (single consumer).
///
/// Every `clear` starts a new epoch. The `*_with` variants run a closure while the
/// queue lock is held so callers can tie their own bookkeeping to a clear or a take
/// without racing concurrent enqueues.
pub struct CommandQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                next_seq: 0,
                epoch: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a command; never waits on the consumer. Returns its sequence number.
    pub fn enqueue(&self, kind: CommandKind, text: impl Into<String>) -> u64 {
        let mut state = lock_or_recover(&self.state, "command queue enqueue");
        let seq = Self::push(&mut state, kind, text.into(), None);
        self.available.notify_one();
        seq
    }

    pub(crate) fn enqueue_named(&self, kind: CommandKind, name: String, text: String) -> u64 {
        let mut state = lock_or_recover(&self.state, "command queue enqueue");
        let seq = Self::push(&mut state, kind, text, Some(name));
        self.available.notify_one();
        seq
    }

    /// Append only if `admit` agrees, deciding under the queue lock.
    pub(crate) fn enqueue_if(
        &self,
        admit: impl FnOnce() -> bool,
        kind: CommandKind,
        text: impl Into<String>,
    ) -> Option<u64> {
        let mut state = lock_or_recover(&self.state, "command queue enqueue");
        if !admit() {
            return None;
        }
        let seq = Self::push(&mut state, kind, text.into(), None);
        self.available.notify_one();
        Some(seq)
    }

    /// Next command, if one is queued. Never blocks.
    pub fn dequeue_if_any(&self) -> Option<Command> {
        let mut state = lock_or_recover(&self.state, "command queue dequeue");
        state.items.pop_front()
    }

    /// Wait up to `timeout` for a command. Returns `None` on timeout or `wake`.
    pub fn wait_next(&self, timeout: Duration) -> Option<Command> {
        self.wait_next_with(timeout, |_| {})
    }

    /// Like `wait_next`; `on_take` receives the current epoch under the queue lock.
    pub(crate) fn wait_next_with(
        &self,
        timeout: Duration,
        on_take: impl FnOnce(u64),
    ) -> Option<Command> {
        let mut state = lock_or_recover(&self.state, "command queue wait");
        if state.items.is_empty() {
            state = match self.available.wait_timeout(state, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        let command = state.items.pop_front()?;
        on_take(state.epoch);
        Some(command)
    }

    /// Pop the head only if it is a source command.
    pub(crate) fn take_source_with(&self, on_take: impl FnOnce(u64)) -> Option<Command> {
        let mut state = lock_or_recover(&self.state, "command queue take source");
        if !state.items.front().is_some_and(|command| command.kind.is_source()) {
            return None;
        }
        let command = state.items.pop_front()?;
        on_take(state.epoch);
        Some(command)
    }

    /// Discard everything pending. Returns how many commands were dropped.
    pub fn clear(&self) -> usize {
        self.clear_with(|| {})
    }

    /// Discard everything pending and start a new epoch, running `on_cleared` before
    /// any other thread can enqueue.
    pub(crate) fn clear_with(&self, on_cleared: impl FnOnce()) -> usize {
        let mut state = lock_or_recover(&self.state, "command queue clear");
        let dropped = state.items.len();
        state.items.clear();
        state.epoch += 1;
        on_cleared();
        dropped
    }

    /// Run `when_empty` under the queue lock if nothing is pending.
    pub(crate) fn settle_with(&self, when_empty: impl FnOnce()) {
        let state = lock_or_recover(&self.state, "command queue settle");
        if state.items.is_empty() {
            when_empty();
        }
    }

    pub fn epoch(&self) -> u64 {
        lock_or_recover(&self.state, "command queue epoch").epoch
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.state, "command queue len").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release a consumer blocked in `wait_next`.
    pub fn wake(&self) {
        let _state = lock_or_recover(&self.state, "command queue wake");
        self.available.notify_all();
    }

    fn push(state: &mut QueueState, kind: CommandKind, text: String, name: Option<String>) -> u64 {
        let seq = state.next_seq;
        state.next_seq += 1;
        state.items.push_back(Command {
            seq,
            kind,
            text,
            name,
        });
        seq
    }
}
