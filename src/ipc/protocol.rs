//! JSON-lines protocol spoken by the bridge.
//!
//! Messages are newline-delimited JSON objects: events carry an `"event"` tag,
//! commands a `"cmd"` tag.

use crate::channel::SessionEvent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// IPC Events (Rust → client)
// ============================================================================

/// Events written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum IpcEvent {
    /// Sent once on startup
    #[serde(rename = "capabilities")]
    Capabilities {
        version: String,
        runtime: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        script: Option<String>,
        shortcuts: Vec<String>,
    },

    #[serde(rename = "initialized")]
    Initialized,

    #[serde(rename = "print")]
    Print { text: String },

    #[serde(rename = "print_line")]
    PrintLine { text: String },

    /// A script is waiting for a value; answer with `submit`
    #[serde(rename = "prompt")]
    Prompt { message: String },

    #[serde(rename = "clear_console")]
    ClearConsole,

    #[serde(rename = "result")]
    Result { text: String },

    #[serde(rename = "evaluate_error")]
    EvaluateError { message: String },

    #[serde(rename = "source_run_start")]
    SourceRunStart,

    #[serde(rename = "source_run_end")]
    SourceRunEnd,

    #[serde(rename = "interrupted")]
    Interrupted,

    #[serde(rename = "source_load_error")]
    SourceLoadError { message: String },

    /// A submitted line was queued
    #[serde(rename = "queued")]
    Queued { index: usize },

    /// A submitted line answered the pending prompt
    #[serde(rename = "prompt_answered")]
    PromptAnswered,

    #[serde(rename = "history")]
    History { entries: Vec<String> },

    #[serde(rename = "shortcuts")]
    Shortcuts { names: Vec<String> },

    #[serde(rename = "status")]
    Status {
        state: String,
        busy: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    /// Error (recoverable or fatal)
    #[serde(rename = "error")]
    Error { message: String, recoverable: bool },
}

impl From<&SessionEvent> for IpcEvent {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::Initialized => IpcEvent::Initialized,
            SessionEvent::Print(text) => IpcEvent::Print { text: text.clone() },
            SessionEvent::PrintLine(text) => IpcEvent::PrintLine { text: text.clone() },
            SessionEvent::Prompt(message) => IpcEvent::Prompt {
                message: message.clone(),
            },
            SessionEvent::ClearConsole => IpcEvent::ClearConsole,
            SessionEvent::Result(text) => IpcEvent::Result { text: text.clone() },
            SessionEvent::EvaluateError(message) => IpcEvent::EvaluateError {
                message: message.clone(),
            },
            SessionEvent::SourceRunStart => IpcEvent::SourceRunStart,
            SessionEvent::SourceRunEnd => IpcEvent::SourceRunEnd,
            SessionEvent::Interrupted => IpcEvent::Interrupted,
            SessionEvent::SourceLoadError(message) => IpcEvent::SourceLoadError {
                message: message.clone(),
            },
        }
    }
}

// ============================================================================
// IPC Commands (client → Rust)
// ============================================================================

/// Commands read from stdin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd")]
pub enum IpcCommand {
    /// Run a line, or answer the pending prompt
    #[serde(rename = "submit")]
    Submit { text: String },

    #[serde(rename = "interrupt")]
    Interrupt,

    /// Fresh session, optionally seeded with source text
    #[serde(rename = "restart")]
    Restart {
        #[serde(default)]
        source: Option<String>,
    },

    /// Load a script as the current document and restart with it
    #[serde(rename = "load")]
    Load { path: PathBuf },

    #[serde(rename = "reload")]
    Reload,

    #[serde(rename = "clear_history")]
    ClearHistory,

    #[serde(rename = "history")]
    History,

    /// Save the current document under `name`
    #[serde(rename = "create_shortcut")]
    CreateShortcut { name: String },

    #[serde(rename = "remove_shortcut")]
    RemoveShortcut { name: String },

    #[serde(rename = "run_shortcut")]
    RunShortcut { name: String },

    #[serde(rename = "shortcuts")]
    Shortcuts,

    #[serde(rename = "status")]
    Status,

    #[serde(rename = "quit")]
    Quit,
}
