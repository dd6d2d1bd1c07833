//! Ordered fan-out of session events to observers.
//!
//! Every attached observer owns an unbounded queue, so publishing never blocks the
//! session worker and a slow observer never delays the others. Push observers run on a
//! dedicated dispatch thread; pull subscribers drain their queue on their own schedule.
//!
//! The channel also tracks the generation of the session allowed to publish. Retiring a
//! session bumps the generation, after which anything its worker still tries to emit is
//! discarded instead of leaking into the replacement session.


use crate::lock_or_recover;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

/// Notification emitted by a session while it runs commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// All preload sources have run and the session accepts commands.
    Initialized,
    /// `print(value)` output, no trailing newline.
    Print(String),
    /// `println(value)` output; renderers append the newline.
    PrintLine(String),
    /// A script is blocked in `prompt(message)` awaiting a value.
    Prompt(String),
    ClearConsole,
    Result(String),
    EvaluateError(String),
    SourceRunStart,
    SourceRunEnd,
    Interrupted,
    SourceLoadError(String),
}

impl SessionEvent {
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::Initialized => "initialized",
            SessionEvent::Print(_) => "print",
            SessionEvent::PrintLine(_) => "print_line",
            SessionEvent::Prompt(_) => "prompt",
            SessionEvent::ClearConsole => "clear_console",
            SessionEvent::Result(_) => "result",
            SessionEvent::EvaluateError(_) => "evaluate_error",
            SessionEvent::SourceRunStart => "source_run_start",
            SessionEvent::SourceRunEnd => "source_run_end",
            SessionEvent::Interrupted => "interrupted",
            SessionEvent::SourceLoadError(_) => "source_load_error",
        }
    }

    /// Text payload carried by the event, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            SessionEvent::Print(text)
            | SessionEvent::PrintLine(text)
            | SessionEvent::Prompt(text)
            | SessionEvent::Result(text)
            | SessionEvent::EvaluateError(text)
            | SessionEvent::SourceLoadError(text) => Some(text),
            _ => None,
        }
    }

    /// True for events that conclude an interactive command.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            SessionEvent::Result(_) | SessionEvent::EvaluateError(_) | SessionEvent::Interrupted
        )
    }
}

/// Receives every event published after the observer was attached, in publish order.
pub trait SessionObserver: Send + 'static {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent) + Send + 'static,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

pub type ObserverId = u64;

struct Sink {
    id: ObserverId,
    tx: Sender<SessionEvent>,
}

struct ChannelState {
    next_id: ObserverId,
    generation: u64,
    sinks: Vec<Sink>,
}

/// Cloneable handle to the event fan-out shared by the controller and its sessions.
#[derive(Clone)]
pub struct EventChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                next_id: 1,
                generation: 0,
                sinks: Vec::new(),
            })),
        }
    }

    /// Attach a push observer. Its callbacks run on a dedicated thread.
    pub fn attach<O: SessionObserver>(&self, mut observer: O) -> ObserverId {
        let (id, rx) = self.register();
        let spawned = thread::Builder::new()
            .name(format!("scriptline-observer-{id}"))
            .spawn(move || {
                for event in rx.iter() {
                    observer.on_event(&event);
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(observer = id, error = %err, "failed to spawn observer thread");
            self.detach(id);
        }
        id
    }

    /// Attach a pull subscriber. Dropping the subscription detaches it.
    pub fn subscribe(&self) -> EventSubscription {
        let (id, rx) = self.register();
        EventSubscription {
            id,
            rx,
            channel: Arc::downgrade(&self.state),
        }
    }

    /// Stop delivering to `id`. Events already queued for it are still handed over.
    pub fn detach(&self, id: ObserverId) -> bool {
        let mut state = lock_or_recover(&self.state, "event channel detach");
        let before = state.sinks.len();
        state.sinks.retain(|sink| sink.id != id);
        before != state.sinks.len()
    }

    pub fn observer_count(&self) -> usize {
        lock_or_recover(&self.state, "event channel count").sinks.len()
    }

    /// Deliver `event` to every attached observer regardless of generation.
    pub fn publish(&self, event: SessionEvent) {
        let mut state = lock_or_recover(&self.state, "event channel publish");
        Self::fan_out(&mut state, event);
    }

    /// Deliver `event` only if `generation` is still the active one.
    pub(crate) fn publish_for(&self, generation: u64, event: SessionEvent) -> bool {
        let mut state = lock_or_recover(&self.state, "event channel publish");
        if state.generation != generation {
            tracing::debug!(
                generation,
                active = state.generation,
                event = event.label(),
                "dropping event from retired session"
            );
            return false;
        }
        Self::fan_out(&mut state, event);
        true
    }

    /// Retire the publishing session; returns the generation for its successor.
    pub(crate) fn advance_generation(&self) -> u64 {
        let mut state = lock_or_recover(&self.state, "event channel generation");
        state.generation += 1;
        state.generation
    }

    fn register(&self) -> (ObserverId, Receiver<SessionEvent>) {
        let (tx, rx) = unbounded();
        let mut state = lock_or_recover(&self.state, "event channel attach");
        let id = state.next_id;
        state.next_id += 1;
        state.sinks.push(Sink { id, tx });
        (id, rx)
    }

    fn fan_out(state: &mut ChannelState, event: SessionEvent) {
        // A failed send means the receiving side is gone; forget it.
        state
            .sinks
            .retain(|sink| sink.tx.send(event.clone()).is_ok());
    }
}

/// Pull-style view of the event stream.
pub struct EventSubscription {
    id: ObserverId,
    rx: Receiver<SessionEvent>,
    channel: Weak<Mutex<ChannelState>>,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.channel.upgrade() {
            let mut state = lock_or_recover(&state, "event channel detach");
            state.sinks.retain(|sink| sink.id != self.id);
        }
    }
}

impl EventSubscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<SessionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }

    /// Underlying receiver, for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<SessionEvent> {
        &self.rx
    }
}
