//! Live session: one runtime, one worker thread, one command queue.
//!
//! The controller thread(s) enqueue commands and request interrupts; the worker
//! thread is the only caller of the runtime. Worker events pass through a gate that
//! drops anything produced for work an interrupt already discarded.

mod controller;
mod history;
mod prompt;
mod queue;
mod state;
mod worker;

pub use controller::{SessionController, Submission};
pub use history::CommandHistory;
pub use queue::{Command, CommandKind, CommandQueue};
pub use state::SessionState;

use crate::channel::{EventChannel, SessionEvent};
use crate::error::{SessionError, SubmitError};
use crate::lock_or_recover;
use crate::runtime::{RuntimeFactory, TerminateHandle};
use crate::source::SourceDocument;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use prompt::PromptCell;
use state::AtomicSessionState;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Engine knobs shared by every session a controller creates.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on one blocking queue wait in the worker.
    pub poll_interval: Duration,
    /// Longest pause a script may request through `sleep`.
    pub max_sleep: Duration,
    /// Queue an empty command after an interrupt so the runtime settles.
    pub flush_after_interrupt: bool,
    /// How long kill/restart waits for the worker to exit.
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            max_sleep: Duration::from_secs(60),
            flush_after_interrupt: true,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// State shared between the controller and the worker of one session.
pub(crate) struct SessionShared {
    generation: u64,
    pub(crate) state: AtomicSessionState,
    pub(crate) queue: CommandQueue,
    pub(crate) prompt: PromptCell,
    pub(crate) terminate: TerminateHandle,
    running: AtomicBool,
    events: EventChannel,
    gate: Mutex<()>,
    active_epoch: AtomicU64,
}

impl SessionShared {
    fn new(generation: u64, events: EventChannel) -> Self {
        Self {
            generation,
            state: AtomicSessionState::new(SessionState::Busy),
            queue: CommandQueue::new(),
            prompt: PromptCell::new(),
            terminate: TerminateHandle::new(),
            running: AtomicBool::new(true),
            events,
            gate: Mutex::new(()),
            active_epoch: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the command just taken to the queue epoch it was taken in.
    /// Runs under the queue lock.
    pub(crate) fn arm(&self, epoch: u64) {
        self.terminate.reset();
        self.active_epoch.store(epoch, Ordering::SeqCst);
    }

    /// Publish an event produced by the running command. Dropped if an interrupt
    /// has cleared the queue since the command was taken.
    pub(crate) fn emit(&self, event: SessionEvent) -> bool {
        let _gate = lock_or_recover(&self.gate, "session emit");
        self.publish_current(event)
    }

    /// Move BUSY to WAITING and announce the prompt. False, with nothing published,
    /// if an interrupt already discarded the running command.
    pub(crate) fn enter_prompt(&self, message: String) -> bool {
        let _gate = lock_or_recover(&self.gate, "session prompt");
        if self.terminate.is_requested() || !self.is_current() {
            return false;
        }
        self.state.transition(SessionState::Busy, SessionState::Waiting);
        self.events.publish_for(self.generation, SessionEvent::Prompt(message))
    }

    /// Finish the running command: settle to READY when nothing else is queued,
    /// then report `outcome`. An interrupt cannot land between the two.
    pub(crate) fn complete(&self, settle: bool, outcome: Option<SessionEvent>) {
        let _gate = lock_or_recover(&self.gate, "session complete");
        if settle {
            self.queue.settle_with(|| {
                // WAITING here is stale: the worker is no longer inside `prompt()`.
                if !self.state.transition(SessionState::Busy, SessionState::Ready) {
                    self.state.transition(SessionState::Waiting, SessionState::Ready);
                }
            });
        }
        if let Some(event) = outcome {
            self.publish_current(event);
        }
    }

    /// See [`Session::interrupt`]. The idle check is repeated under the gate so
    /// concurrent callers publish one `Interrupted` per discarded command.
    pub(crate) fn interrupt(&self, flush: bool) -> bool {
        if self.state.load() == SessionState::Ready {
            return false;
        }
        let _gate = lock_or_recover(&self.gate, "session interrupt");
        if self.state.load() == SessionState::Ready {
            return false;
        }
        self.state.store(SessionState::Interrupted);
        let dropped = self.queue.clear_with(|| self.terminate.terminate());
        let released = self.prompt.release();
        if flush {
            self.queue.enqueue(CommandKind::Flush, "");
        }
        self.state.store(SessionState::Ready);
        self.events.publish_for(self.generation, SessionEvent::Interrupted);
        tracing::info!(dropped, prompt_released = released, "session interrupted");
        true
    }

    fn is_current(&self) -> bool {
        self.queue.epoch() == self.active_epoch.load(Ordering::SeqCst)
    }

    /// Caller holds the gate.
    fn publish_current(&self, event: SessionEvent) -> bool {
        if !self.is_current() {
            tracing::debug!(event = event.label(), "dropping event from discarded command");
            return false;
        }
        self.events.publish_for(self.generation, event)
    }

    /// Publish a session-level event regardless of interrupts.
    pub(crate) fn emit_lifecycle(&self, event: SessionEvent) -> bool {
        let _gate = lock_or_recover(&self.gate, "session emit");
        self.events.publish_for(self.generation, event)
    }
}

/// Handle to a running session, owned by the controller.
pub(crate) struct Session {
    shared: Arc<SessionShared>,
    worker: Option<JoinHandle<()>>,
    done: Receiver<()>,
    config: SessionConfig,
}

impl Session {
    /// Queue `sources` and start the worker. Returns once the runtime exists and the
    /// host functions are installed; the sources run afterwards on the worker.
    pub(crate) fn spawn(
        generation: u64,
        events: EventChannel,
        factory: RuntimeFactory,
        config: SessionConfig,
        sources: Vec<(CommandKind, SourceDocument)>,
    ) -> Result<Self, SessionError> {
        let shared = Arc::new(SessionShared::new(generation, events));
        for (kind, document) in sources {
            shared.queue.enqueue_named(kind, document.name, document.text);
        }

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let worker_shared = Arc::clone(&shared);
        let worker_config = config.clone();
        let handle = thread::Builder::new()
            .name(format!("scriptline-worker-{generation}"))
            .spawn(move || {
                worker::run(worker_shared, factory, worker_config, ready_tx);
                let _ = done_tx.send(());
            })
            .map_err(SessionError::WorkerSpawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(generation, "session started");
                Ok(Self {
                    shared,
                    worker: Some(handle),
                    done: done_rx,
                    config,
                })
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(SessionError::Runtime(err))
            }
            Err(_) => {
                let _ = handle.join();
                Err(SessionError::WorkerLost)
            }
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.shared.state.load()
    }

    /// Queue `text` if the session is idle, or answer the outstanding prompt.
    /// `record` runs only for queued commands.
    pub(crate) fn submit(
        &self,
        text: String,
        record: impl FnOnce(&str) -> usize,
    ) -> Result<Submission, SubmitError> {
        let shared = &self.shared;
        if shared.state.load() == SessionState::Waiting {
            return if shared.prompt.resolve(text) {
                Ok(Submission::PromptAnswered)
            } else {
                Err(SubmitError::Busy)
            };
        }
        let seq = shared.queue.enqueue_if(
            || shared.state.transition(SessionState::Ready, SessionState::Busy),
            CommandKind::Interactive,
            text.clone(),
        );
        match seq {
            Some(seq) => {
                tracing::debug!(seq, "command queued");
                Ok(Submission::Queued(record(&text)))
            }
            None => Err(SubmitError::Busy),
        }
    }

    /// Abort the running command and drop everything queued. False when the session
    /// was already idle.
    pub(crate) fn interrupt(&self, flush: bool) -> bool {
        self.shared.interrupt(flush)
    }

    /// Stop the worker and wait for it to dispose the runtime. False if the worker
    /// did not exit within the configured timeout; it is then left detached.
    pub(crate) fn shutdown(mut self) -> bool {
        let shared = &self.shared;
        shared.running.store(false, Ordering::SeqCst);
        {
            let _gate = lock_or_recover(&shared.gate, "session shutdown");
            shared.queue.clear_with(|| shared.terminate.terminate());
            shared.prompt.release();
        }
        shared.queue.wake();

        let exited = match self.done.recv_timeout(self.config.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };
        if let Some(handle) = self.worker.take() {
            if exited {
                if handle.join().is_err() {
                    tracing::warn!(generation = shared.generation, "session worker panicked");
                }
            } else {
                tracing::warn!(
                    generation = shared.generation,
                    "session worker did not stop in time; detaching"
                );
            }
        }
        exited
    }
}
