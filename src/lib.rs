pub mod channel;
pub mod config;
pub mod error;
pub mod ipc;
mod lock;
pub mod runtime;
pub mod session;
pub mod shortcuts;
pub mod source;
pub mod telemetry;

pub(crate) use lock::lock_or_recover;

pub use channel::{EventChannel, EventSubscription, ObserverId, SessionEvent, SessionObserver};
pub use error::{RuntimeError, SessionError, ShortcutError, SourceError, SubmitError};
pub use runtime::{lua_factory, LuaOptions, RuntimeFactory, ScriptRuntime};
pub use session::{SessionConfig, SessionController, SessionState, Submission};
pub use source::{FsSourceLoader, InMemorySourceLoader, SourceDocument, SourceLoader};
