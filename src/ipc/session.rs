use crate::channel::EventSubscription;
use crate::config::AppConfig;
use crate::lock_or_recover;
use crate::runtime::lua_factory;
use crate::session::{SessionController, SessionState};
use crate::shortcuts::ShortcutRegistry;
use anyhow::{Context, Result};
use crossbeam_channel::{never, select, Receiver, Sender};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::protocol::{IpcCommand, IpcEvent};
use super::router::{handle_command, Flow};

/// How often the loop re-checks whether it may exit after stdin closed.
const IDLE_TICK: Duration = Duration::from_millis(25);
const SETTLE_GRACE: Duration = Duration::from_millis(100);

// ============================================================================
// State
// ============================================================================

/// Where events go: stdout in production, a shared buffer in tests.
#[derive(Clone)]
pub(super) enum IpcSink {
    Stdout,
    #[cfg_attr(not(test), allow(dead_code))]
    Capture(Arc<Mutex<Vec<IpcEvent>>>),
}

pub(super) struct IpcState {
    pub(super) config: AppConfig,
    pub(super) controller: SessionController,
    shortcuts: Mutex<ShortcutRegistry>,
    pub(super) sink: IpcSink,
}

impl IpcState {
    pub(super) fn new(config: AppConfig, sink: IpcSink) -> Result<Self> {
        let controller = SessionController::new(
            config.session_config(),
            lua_factory(config.lua_options()),
            Arc::new(config.source_loader()),
        );
        if let Some(script) = &config.script {
            controller
                .select_document(script)
                .with_context(|| format!("failed to load script '{}'", script.display()))?;
        }
        let shortcuts = match &config.shortcuts_file {
            Some(path) => ShortcutRegistry::load_from(path)
                .with_context(|| format!("failed to read shortcuts '{}'", path.display()))?,
            None => ShortcutRegistry::new(),
        };
        Ok(Self {
            config,
            controller,
            shortcuts: Mutex::new(shortcuts),
            sink,
        })
    }

    pub(super) fn send(&self, event: &IpcEvent) {
        send_event(&self.sink, event);
    }

    pub(super) fn emit_capabilities(&self) {
        self.send(&IpcEvent::Capabilities {
            version: env!("CARGO_PKG_VERSION").to_string(),
            runtime: "lua".to_string(),
            script: self
                .controller
                .current_source()
                .map(|document| document.name),
            shortcuts: self.shortcut_names(),
        });
    }

    pub(super) fn shortcuts_mut<R>(&self, update: impl FnOnce(&mut ShortcutRegistry) -> R) -> R {
        update(&mut lock_or_recover(&self.shortcuts, "bridge shortcuts"))
    }

    pub(super) fn shortcut(&self, name: &str) -> Option<PathBuf> {
        lock_or_recover(&self.shortcuts, "bridge shortcuts")
            .get(name)
            .map(PathBuf::from)
    }

    pub(super) fn shortcut_names(&self) -> Vec<String> {
        lock_or_recover(&self.shortcuts, "bridge shortcuts")
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub(super) fn save_shortcuts(&self) {
        let Some(path) = &self.config.shortcuts_file else {
            return;
        };
        let saved = lock_or_recover(&self.shortcuts, "bridge shortcuts").save_to(path);
        if let Err(err) = saved {
            self.send(&IpcEvent::Error {
                message: err.to_string(),
                recoverable: true,
            });
        }
    }
}

// ============================================================================
// Event Sending
// ============================================================================

pub(super) fn send_event(sink: &IpcSink, event: &IpcEvent) {
    match sink {
        IpcSink::Stdout => {
            if let Ok(json) = serde_json::to_string(event) {
                let mut stdout = io::stdout().lock();
                let _ = writeln!(stdout, "{json}");
                let _ = stdout.flush();
            }
        }
        IpcSink::Capture(events) => {
            if let Ok(mut events) = events.lock() {
                events.push(event.clone());
            }
        }
    }
}

// ============================================================================
// Stdin Reader Thread
// ============================================================================

fn spawn_stdin_reader(tx: Sender<IpcCommand>, sink: IpcSink) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<IpcCommand>(trimmed) {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break; // Main thread has exited
                    }
                }
                Err(e) => {
                    send_event(
                        &sink,
                        &IpcEvent::Error {
                            message: format!("Invalid command: {e}"),
                            recoverable: true,
                        },
                    );
                }
            }
        }
        tracing::debug!("stdin reader exiting");
    })
}

// ============================================================================
// Main Loop
// ============================================================================

pub fn run_ipc_mode(config: AppConfig) -> Result<()> {
    tracing::info!("starting JSON bridge");
    let state = IpcState::new(config, IpcSink::Stdout)?;
    let events = state.controller.subscribe();
    state.emit_capabilities();
    state
        .controller
        .start()
        .context("failed to start script session")?;

    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let _stdin_handle = spawn_stdin_reader(cmd_tx, IpcSink::Stdout);
    run_ipc_loop(&state, cmd_rx, &events);
    state.controller.kill();
    Ok(())
}

/// Route commands and forward session events until `quit`, or until stdin closes
/// and the session has nothing left to report.
pub(super) fn run_ipc_loop(
    state: &IpcState,
    mut cmd_rx: Receiver<IpcCommand>,
    events: &EventSubscription,
) {
    let mut input_closed = false;
    loop {
        let mut flow = Flow::Continue;
        let mut closed_now = false;
        select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(cmd) => flow = handle_command(state, cmd),
                Err(_) => closed_now = true,
            },
            recv(events.receiver()) -> event => {
                if let Ok(event) = event {
                    state.send(&IpcEvent::from(&event));
                }
            },
            default(IDLE_TICK) => {}
        }
        if flow == Flow::Exit {
            break;
        }
        if closed_now {
            tracing::debug!("command channel closed");
            input_closed = true;
            cmd_rx = never();
        }

        if input_closed && events.receiver().is_empty() {
            match state.controller.state() {
                Some(SessionState::Waiting) => {
                    // Nobody is left to answer.
                    state.controller.interrupt();
                }
                Some(SessionState::Ready) | None => {
                    // The session settles just before it publishes the last outcome.
                    while let Some(event) = events.recv_timeout(SETTLE_GRACE) {
                        state.send(&IpcEvent::from(&event));
                    }
                    break;
                }
                Some(_) => {}
            }
        }
    }
    tracing::info!("JSON bridge exiting");
}
