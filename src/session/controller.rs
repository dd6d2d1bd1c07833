use super::{CommandHistory, CommandKind, Session, SessionConfig, SessionState};
use crate::channel::{EventChannel, EventSubscription, ObserverId, SessionEvent, SessionObserver};
use crate::error::{SessionError, SubmitError};
use crate::lock_or_recover;
use crate::runtime::RuntimeFactory;
use crate::source::{SourceDocument, SourceLoader};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// What happened to a submitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued as a command; carries its history index.
    Queued(usize),
    /// Handed to the script blocked in `prompt()`. Not recorded in history.
    PromptAnswered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Killed,
}

struct ControllerInner {
    phase: Phase,
    session: Option<Session>,
    document: Option<SourceDocument>,
}

/// Owns the live session and everything that outlives it: the event channel, the
/// command history and the current document.
///
/// All methods take `&self`; the controller can be shared across threads behind an
/// `Arc`. Events are delivered through [`SessionController::events`].
pub struct SessionController {
    config: SessionConfig,
    factory: RuntimeFactory,
    loader: Arc<dyn SourceLoader>,
    events: EventChannel,
    history: CommandHistory,
    inner: Mutex<ControllerInner>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        factory: RuntimeFactory,
        loader: Arc<dyn SourceLoader>,
    ) -> Self {
        Self {
            config,
            factory,
            loader,
            events: EventChannel::new(),
            history: CommandHistory::new(),
            inner: Mutex::new(ControllerInner {
                phase: Phase::Idle,
                session: None,
                document: None,
            }),
        }
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub fn attach<O: SessionObserver>(&self, observer: O) -> ObserverId {
        self.events.attach(observer)
    }

    /// Create the first session: preload sources, then the current document if one
    /// was selected.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Killed => return Err(SessionError::Killed),
            Phase::Running => return Err(SessionError::AlreadyStarted),
            Phase::Idle => {}
        }
        let seed = inner.document.clone();
        inner.session = Some(self.spawn_session(seed)?);
        inner.phase = Phase::Running;
        Ok(())
    }

    pub fn submit(&self, text: impl Into<String>) -> Result<Submission, SubmitError> {
        let inner = self.lock();
        match inner.phase {
            Phase::Killed => return Err(SubmitError::Killed),
            Phase::Idle => return Err(SubmitError::NotStarted),
            Phase::Running => {}
        }
        let session = inner.session.as_ref().ok_or(SubmitError::NotStarted)?;
        session.submit(text.into(), |text| self.history.push(text))
    }

    /// Abort the running command and drop everything queued. False when idle.
    pub fn interrupt(&self) -> bool {
        let inner = self.lock();
        inner
            .session
            .as_ref()
            .is_some_and(|session| session.interrupt(self.config.flush_after_interrupt))
    }

    /// Replace the session with a fresh one, seeded with `source` after the preload
    /// sources. History and the current document are kept.
    pub fn restart(&self, source: Option<String>) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::ensure_live(&inner)?;
        self.replace_session(&mut inner, source.map(SourceDocument::inline))
    }

    /// Load `reference` as the current document and restart with it. On a load
    /// failure the current session keeps running.
    pub fn load_and_restart(&self, reference: &Path) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::ensure_live(&inner)?;
        let document = self.load(reference)?;
        inner.document = Some(document.clone());
        self.replace_session(&mut inner, Some(document))
    }

    /// Restart with the current document re-read from its reference.
    pub fn reload(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::ensure_live(&inner)?;
        let current = inner
            .document
            .clone()
            .ok_or(SessionError::NoSourceDocument)?;
        let document = match current.reference.as_deref() {
            Some(reference) => self.load(reference)?,
            None => current,
        };
        inner.document = Some(document.clone());
        self.replace_session(&mut inner, Some(document))
    }

    /// Choose the document `start` will run, without touching a live session.
    pub fn select_document(&self, reference: &Path) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.phase == Phase::Killed {
            return Err(SessionError::Killed);
        }
        let document = self.loader.load(reference)?;
        inner.document = Some(document);
        Ok(())
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    /// Stop the session for good. Idempotent.
    pub fn kill(&self) {
        let mut inner = self.lock();
        if inner.phase == Phase::Killed {
            return;
        }
        inner.phase = Phase::Killed;
        self.events.advance_generation();
        if let Some(session) = inner.session.take() {
            session.shutdown();
        }
        tracing::info!("session controller killed");
    }

    pub fn command_history(&self) -> Vec<String> {
        self.history.entries()
    }

    pub fn history_entry(&self, index: usize) -> Option<String> {
        self.history.get(index)
    }

    pub fn state(&self) -> Option<SessionState> {
        self.lock().session.as_ref().map(Session::state)
    }

    /// True unless a session exists and is idle.
    pub fn is_busy(&self) -> bool {
        self.state() != Some(SessionState::Ready)
    }

    pub fn current_source(&self) -> Option<SourceDocument> {
        self.lock().document.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        lock_or_recover(&self.inner, "session controller")
    }

    fn ensure_live(inner: &ControllerInner) -> Result<(), SessionError> {
        match inner.phase {
            Phase::Killed => Err(SessionError::Killed),
            Phase::Idle => Err(SessionError::NotStarted),
            Phase::Running => Ok(()),
        }
    }

    fn load(&self, reference: &Path) -> Result<SourceDocument, SessionError> {
        self.loader.load(reference).map_err(|err| {
            tracing::warn!(path = %reference.display(), error = %err, "source load failed");
            self.events.publish(SessionEvent::SourceLoadError(err.to_string()));
            SessionError::from(err)
        })
    }

    fn replace_session(
        &self,
        inner: &mut ControllerInner,
        seed: Option<SourceDocument>,
    ) -> Result<(), SessionError> {
        if let Some(session) = inner.session.take() {
            session.interrupt(false);
            self.events.advance_generation();
            session.shutdown();
        }
        match self.spawn_session(seed) {
            Ok(session) => {
                inner.session = Some(session);
                Ok(())
            }
            Err(err) => {
                inner.phase = Phase::Idle;
                Err(err)
            }
        }
    }

    fn spawn_session(&self, seed: Option<SourceDocument>) -> Result<Session, SessionError> {
        let generation = self.events.advance_generation();
        let mut sources = Vec::new();
        for loaded in self.loader.preload_sources() {
            match loaded {
                Ok(document) => sources.push((CommandKind::Preload, document)),
                Err(err) => {
                    tracing::warn!(error = %err, "preload source skipped");
                    self.events
                        .publish_for(generation, SessionEvent::SourceLoadError(err.to_string()));
                }
            }
        }
        if let Some(document) = seed {
            sources.push((CommandKind::Script, document));
        }
        Session::spawn(
            generation,
            self.events.clone(),
            Arc::clone(&self.factory),
            self.config.clone(),
            sources,
        )
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.kill();
    }
}
