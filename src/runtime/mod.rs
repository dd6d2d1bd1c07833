//! Script runtime capability plus the session-owned adapter around it.
//!
//! The engine only needs four things from a language runtime: evaluate text, expose
//! host-callable functions, abort an evaluation cooperatively, and release its
//! resources. `ScriptRuntime` captures that; `RuntimeAdapter` layers the session rules
//! on top (value normalization, host-function wiring, termination plumbing).

mod lua;
#[cfg(test)]
mod tests;

pub use lua::{LuaOptions, LuaRuntime, INTERRUPTED_MESSAGE};

use crate::error::RuntimeError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Placeholder reported when an evaluation produces no value.
pub const UNDEFINED_RESULT: &str = "undefined";

/// Argument or return value crossing the host-function boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    /// Any other runtime value, already rendered by the runtime.
    Opaque(String),
}

impl HostValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Integer(value) => Some(*value as f64),
            HostValue::Number(value) => Some(*value),
            HostValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Nil => write!(f, "nil"),
            HostValue::Boolean(value) => write!(f, "{value}"),
            HostValue::Integer(value) => write!(f, "{value}"),
            HostValue::Number(value) => write!(f, "{value}"),
            HostValue::Text(text) | HostValue::Opaque(text) => write!(f, "{text}"),
        }
    }
}

/// Host-side implementation of a script-visible function. Errors abort the calling
/// evaluation with the returned message.
pub type HostFunction = Arc<dyn Fn(&[HostValue]) -> Result<HostValue, String> + Send + Sync>;

/// Language runtime consumed by the session worker.
///
/// Implementations are driven from a single thread: the worker that created them.
pub trait ScriptRuntime {
    /// Evaluate `source`. `Ok(None)` means the evaluation produced no value.
    fn execute(&mut self, source: &str) -> Result<Option<String>, String>;

    /// Expose `function` to scripts as the global `name`.
    fn register_host_function(
        &mut self,
        name: &str,
        function: HostFunction,
    ) -> Result<(), RuntimeError>;

    /// Release the runtime. Called at most once, after the last `execute`.
    fn dispose(self: Box<Self>) {}
}

/// Builds a runtime wired to the session's termination handle.
pub type RuntimeFactory =
    Arc<dyn Fn(&TerminateHandle) -> Result<Box<dyn ScriptRuntime>, RuntimeError> + Send + Sync>;

/// Factory for the bundled Lua runtime.
pub fn lua_factory(options: LuaOptions) -> RuntimeFactory {
    Arc::new(move |terminate: &TerminateHandle| {
        let runtime = LuaRuntime::new(terminate.clone(), options.clone())?;
        Ok(Box::new(runtime) as Box<dyn ScriptRuntime>)
    })
}

struct TerminateState {
    requested: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Thread-safe request to abort the in-flight evaluation.
///
/// Runtimes poll `is_requested`; blocking host functions wait through `sleep`, which
/// returns early when termination is requested.
#[derive(Clone)]
pub struct TerminateHandle {
    inner: Arc<TerminateState>,
}

impl Default for TerminateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TerminateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminateHandle")
            .field("requested", &self.is_requested())
            .finish()
    }
}

impl TerminateHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TerminateState {
                requested: AtomicBool::new(false),
                lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
        }
    }

    /// Idempotent; callable from any thread.
    pub fn terminate(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        let _guard = crate::lock_or_recover(&self.inner.lock, "terminate wake");
        self.inner.wake.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Re-arm before the next command runs.
    pub(crate) fn reset(&self) {
        self.inner.requested.store(false, Ordering::SeqCst);
    }

    /// Block for `duration` unless termination is requested first.
    /// Returns `false` when the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = crate::lock_or_recover(&self.inner.lock, "terminate sleep");
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            guard = match self.inner.wake.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Host callbacks a session installs into its runtime.
pub struct HostFunctions {
    pub print: HostFunction,
    pub println: HostFunction,
    pub clear: HostFunction,
    pub prompt: HostFunction,
    pub sleep: HostFunction,
}

impl HostFunctions {
    fn entries(&self) -> [(&'static str, &HostFunction); 5] {
        [
            ("print", &self.print),
            ("println", &self.println),
            ("clear", &self.clear),
            ("prompt", &self.prompt),
            ("sleep", &self.sleep),
        ]
    }
}

/// The single runtime instance owned by one session.
pub struct RuntimeAdapter {
    runtime: Box<dyn ScriptRuntime>,
    terminate: TerminateHandle,
}

impl RuntimeAdapter {
    pub fn create(
        factory: &RuntimeFactory,
        terminate: TerminateHandle,
    ) -> Result<Self, RuntimeError> {
        let runtime = factory(&terminate)?;
        Ok(Self { runtime, terminate })
    }

    pub fn install_host_functions(&mut self, host: &HostFunctions) -> Result<(), RuntimeError> {
        for (name, function) in host.entries() {
            self.runtime
                .register_host_function(name, Arc::clone(function))?;
        }
        Ok(())
    }

    /// Evaluate `source`, normalizing an absent value to [`UNDEFINED_RESULT`].
    pub fn execute(&mut self, source: &str) -> Result<String, String> {
        match self.runtime.execute(source) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(UNDEFINED_RESULT.to_string()),
            Err(message) if message.is_empty() => Err("evaluation failed".to_string()),
            Err(message) => Err(message),
        }
    }

    pub fn terminate(&self) {
        self.terminate.terminate();
    }

    pub fn terminate_handle(&self) -> &TerminateHandle {
        &self.terminate
    }

    pub fn dispose(self) {
        self.runtime.dispose();
    }
}
