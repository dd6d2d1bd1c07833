use super::queue::Command;
use super::{CommandKind, SessionConfig, SessionShared, SessionState};
use crate::channel::SessionEvent;
use crate::error::RuntimeError;
use crate::runtime::{
    HostFunction, HostFunctions, HostValue, RuntimeAdapter, RuntimeFactory, INTERRUPTED_MESSAGE,
};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::Duration;

/// Worker thread body: build the runtime, run queued sources, then serve commands
/// until the session stops running.
pub(super) fn run(
    shared: Arc<SessionShared>,
    factory: RuntimeFactory,
    config: SessionConfig,
    ready: Sender<Result<(), RuntimeError>>,
) {
    let mut adapter = match create_runtime(&shared, &factory, &config) {
        Ok(adapter) => {
            let _ = ready.send(Ok(()));
            adapter
        }
        Err(err) => {
            tracing::warn!(error = %err, "session runtime failed to start");
            let _ = ready.send(Err(err));
            return;
        }
    };

    while shared.is_running() {
        let Some(command) = shared.queue.take_source_with(|epoch| shared.arm(epoch)) else {
            break;
        };
        execute(&shared, &mut adapter, command);
    }
    if shared.is_running() {
        shared.queue.settle_with(|| {
            shared.state.transition(SessionState::Busy, SessionState::Ready);
        });
        shared.emit_lifecycle(SessionEvent::Initialized);
    }

    while shared.is_running() {
        let next = shared.queue.wait_next_with(config.poll_interval, |epoch| shared.arm(epoch));
        if let Some(command) = next {
            execute(&shared, &mut adapter, command);
        }
    }

    adapter.dispose();
    tracing::info!("session worker stopped");
}

fn create_runtime(
    shared: &Arc<SessionShared>,
    factory: &RuntimeFactory,
    config: &SessionConfig,
) -> Result<RuntimeAdapter, RuntimeError> {
    let mut adapter = RuntimeAdapter::create(factory, shared.terminate.clone())?;
    if let Err(err) = adapter.install_host_functions(&host_functions(shared, config)) {
        adapter.dispose();
        return Err(err);
    }
    Ok(adapter)
}

fn execute(shared: &SessionShared, adapter: &mut RuntimeAdapter, command: Command) {
    let Command { seq, kind, text, name } = command;
    tracing::debug!(seq, kind = ?kind, source = name.as_deref(), "executing command");
    if kind == CommandKind::Script {
        shared.emit(SessionEvent::SourceRunStart);
    }

    let outcome = adapter.execute(&text);
    let event = match (kind, outcome) {
        (CommandKind::Flush, Ok(_)) => None,
        (CommandKind::Flush, Err(message)) => {
            tracing::debug!(%message, "flush command failed");
            None
        }
        (CommandKind::Preload | CommandKind::Script, Ok(_)) => Some(SessionEvent::SourceRunEnd),
        (CommandKind::Interactive, Ok(value)) => Some(SessionEvent::Result(value)),
        (_, Err(message)) => {
            if let Some(name) = name.as_deref() {
                tracing::info!(source = name, "source failed to evaluate");
            }
            Some(SessionEvent::EvaluateError(message))
        }
    };

    // Settle before reporting so a caller reacting to the outcome can submit at once.
    shared.complete(!kind.is_source(), event);
}

fn host_functions(shared: &Arc<SessionShared>, config: &SessionConfig) -> HostFunctions {
    let print: HostFunction = {
        let shared = Arc::clone(shared);
        Arc::new(move |args: &[HostValue]| {
            if let Some(value) = args.first() {
                shared.emit(SessionEvent::Print(value.to_string()));
            }
            Ok(HostValue::Nil)
        })
    };
    let println: HostFunction = {
        let shared = Arc::clone(shared);
        Arc::new(move |args: &[HostValue]| {
            let line = args.first().map(ToString::to_string).unwrap_or_default();
            shared.emit(SessionEvent::PrintLine(line));
            Ok(HostValue::Nil)
        })
    };
    let clear: HostFunction = {
        let shared = Arc::clone(shared);
        Arc::new(move |_: &[HostValue]| {
            shared.emit(SessionEvent::ClearConsole);
            Ok(HostValue::Nil)
        })
    };
    let prompt: HostFunction = {
        let shared = Arc::clone(shared);
        Arc::new(move |args: &[HostValue]| {
            let message = args
                .first()
                .filter(|value| !value.is_nil())
                .map(ToString::to_string)
                .unwrap_or_default();
            wait_for_prompt(&shared, message)
        })
    };
    let sleep: HostFunction = {
        let shared = Arc::clone(shared);
        let max_millis = config.max_sleep.as_millis() as f64;
        Arc::new(move |args: &[HostValue]| {
            let millis = args.first().and_then(HostValue::as_f64).unwrap_or(0.0);
            if millis.is_nan() || millis <= 0.0 {
                return Ok(HostValue::Nil);
            }
            let duration = Duration::from_millis(millis.min(max_millis) as u64);
            if shared.terminate.sleep(duration) {
                Ok(HostValue::Nil)
            } else {
                Err(INTERRUPTED_MESSAGE.to_string())
            }
        })
    };
    HostFunctions {
        print,
        println,
        clear,
        prompt,
        sleep,
    }
}

/// Block the script until the controller supplies a value or interrupts.
fn wait_for_prompt(shared: &SessionShared, message: String) -> Result<HostValue, String> {
    if shared.prompt.open().is_err() {
        return Err("a prompt is already pending".to_string());
    }
    // An interrupt that landed before `open` found nothing to release; one that
    // lands after it has already released the slot.
    if !shared.enter_prompt(message) {
        shared.prompt.release();
        let _ = shared.prompt.wait();
        return Err(INTERRUPTED_MESSAGE.to_string());
    }
    match shared.prompt.wait() {
        Ok(value) => {
            shared
                .state
                .transition(SessionState::Waiting, SessionState::Busy);
            Ok(HostValue::Text(value))
        }
        Err(_) => Err(INTERRUPTED_MESSAGE.to_string()),
    }
}
