use super::protocol::{IpcCommand, IpcEvent};
use super::session::IpcState;
use crate::error::{SessionError, SubmitError};
use crate::session::Submission;
use crate::telemetry::loggable_content;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Exit,
}

pub(super) fn handle_command(state: &IpcState, cmd: IpcCommand) -> Flow {
    match cmd {
        IpcCommand::Submit { text } => handle_submit(state, text),
        IpcCommand::Interrupt => {
            if !state.controller.interrupt() {
                send_status(state);
            }
        }
        IpcCommand::Restart { source } => report(state, state.controller.restart(source)),
        IpcCommand::Load { path } => report(state, state.controller.load_and_restart(&path)),
        IpcCommand::Reload => report(state, state.controller.reload()),
        IpcCommand::ClearHistory => {
            state.controller.clear_history();
            send_history(state);
        }
        IpcCommand::History => send_history(state),
        IpcCommand::CreateShortcut { name } => handle_create_shortcut(state, &name),
        IpcCommand::RemoveShortcut { name } => {
            if state.shortcuts_mut(|shortcuts| shortcuts.remove(&name)).is_none() {
                send_error(state, format!("Unknown shortcut: {name}"));
            } else {
                state.save_shortcuts();
                send_shortcuts(state);
            }
        }
        IpcCommand::RunShortcut { name } => match state.shortcut(&name) {
            Some(path) => report(state, state.controller.load_and_restart(&path)),
            None => send_error(state, format!("Unknown shortcut: {name}")),
        },
        IpcCommand::Shortcuts => send_shortcuts(state),
        IpcCommand::Status => send_status(state),
        IpcCommand::Quit => return Flow::Exit,
    }
    Flow::Continue
}

fn handle_submit(state: &IpcState, text: String) {
    tracing::debug!(text = %loggable_content(&state.config, &text), "submit");
    match state.controller.submit(text) {
        Ok(Submission::Queued(index)) => state.send(&IpcEvent::Queued { index }),
        Ok(Submission::PromptAnswered) => state.send(&IpcEvent::PromptAnswered),
        Err(SubmitError::Busy) => send_error(state, "Session is busy; interrupt first".to_string()),
        Err(err) => state.send(&IpcEvent::Error {
            message: err.to_string(),
            recoverable: false,
        }),
    }
}

fn handle_create_shortcut(state: &IpcState, name: &str) {
    let Some(reference) = state
        .controller
        .current_source()
        .and_then(|document| document.reference)
    else {
        send_error(state, "Load a script file before creating a shortcut".to_string());
        return;
    };
    match state.shortcuts_mut(|shortcuts| shortcuts.create(name, reference)) {
        Ok(_) => {
            state.save_shortcuts();
            send_shortcuts(state);
        }
        Err(err) => send_error(state, err.to_string()),
    }
}

/// Load failures already reached clients as `source_load_error` events.
fn report(state: &IpcState, result: Result<(), SessionError>) {
    match result {
        Ok(()) | Err(SessionError::Source(_)) => {}
        Err(err) => state.send(&IpcEvent::Error {
            message: err.to_string(),
            recoverable: !matches!(err, SessionError::Killed | SessionError::Runtime(_)),
        }),
    }
}

fn send_error(state: &IpcState, message: String) {
    state.send(&IpcEvent::Error {
        message,
        recoverable: true,
    });
}

fn send_history(state: &IpcState) {
    state.send(&IpcEvent::History {
        entries: state.controller.command_history(),
    });
}

fn send_shortcuts(state: &IpcState) {
    state.send(&IpcEvent::Shortcuts {
        names: state.shortcut_names(),
    });
}

fn send_status(state: &IpcState) {
    let session_state = state.controller.state();
    state.send(&IpcEvent::Status {
        state: session_state.map_or("stopped", |s| s.label()).to_string(),
        busy: state.controller.is_busy(),
        source: state
            .controller
            .current_source()
            .map(|document| document.name),
    });
}
