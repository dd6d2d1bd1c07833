//! Error types shared by the session engine and its collaborators.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while creating or wiring a script runtime. These are fatal for the
/// session being created and are surfaced synchronously to `start`/`restart` callers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime initialization failed: {0}")]
    Init(String),

    #[error("failed to install host function `{name}`: {message}")]
    HostInstall { name: String, message: String },
}

/// Lifecycle errors reported by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("session not started")]
    NotStarted,

    #[error("session was killed")]
    Killed,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("failed to spawn session worker: {0}")]
    WorkerSpawn(#[source] io::Error),

    #[error("session worker exited before reporting readiness")]
    WorkerLost,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("no source document is loaded")]
    NoSourceDocument,
}

/// Reasons an interactive submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("session is busy")]
    Busy,

    #[error("session not started")]
    NotStarted,

    #[error("session was killed")]
    Killed,
}

/// Failures while reading script sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source \"{}\" not found", .0.display())]
    NotFound(PathBuf),
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            return Self::NotFound(path);
        }
        Self::Io { path, source }
    }
}

/// Failures from the shortcut registry.
#[derive(Debug, Error)]
pub enum ShortcutError {
    #[error("shortcut name must not be empty")]
    EmptyName,

    #[error("failed to access shortcut file \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid shortcut file: {0}")]
    Format(#[from] serde_json::Error),
}
