use anyhow::{Context, Result};
use crossbeam_channel::{never, select, Receiver, Sender};
use scriptline::config::AppConfig;
use scriptline::runtime::lua_factory;
use scriptline::shortcuts::ShortcutRegistry;
use scriptline::telemetry::loggable_content;
use scriptline::{SessionController, SessionError, SessionState, SubmitError};
use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::meta::{parse_line, ConsoleInput, MetaCommand, HELP};
use crate::render::render_event;

const IDLE_TICK: Duration = Duration::from_millis(25);
const SETTLE_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

struct Console {
    config: AppConfig,
    controller: SessionController,
    shortcuts: ShortcutRegistry,
    /// Script lines waiting for the session to accept input.
    pending: VecDeque<String>,
}

pub(crate) fn run_console(config: AppConfig) -> Result<()> {
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

    let events = controller.subscribe();
    controller
        .start()
        .context("failed to start script session")?;
    tracing::info!("console started");

    let (line_tx, line_rx) = crossbeam_channel::unbounded();
    let _reader = spawn_line_reader(line_tx);
    let mut console = Console {
        config,
        controller,
        shortcuts,
        pending: VecDeque::new(),
    };
    console.run(line_rx, events.receiver());
    console.controller.kill();
    Ok(())
}

fn spawn_line_reader(tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
        tracing::debug!("stdin reader exiting");
    })
}

impl Console {
    fn run(&mut self, mut lines: Receiver<String>, events: &Receiver<scriptline::SessionEvent>) {
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        let mut input_closed = false;
        loop {
            let mut flow = Flow::Continue;
            let mut closed_now = false;
            select! {
                recv(lines) -> line => match line {
                    Ok(line) => flow = self.accept(line),
                    Err(_) => closed_now = true,
                },
                recv(events) -> event => {
                    if let Ok(event) = event {
                        let _ = render_event(&event, &mut stdout, &mut stderr);
                    }
                },
                default(IDLE_TICK) => {}
            }
            if closed_now {
                input_closed = true;
                lines = never();
            }
            if flow == Flow::Exit || self.dispatch_pending() == Flow::Exit {
                break;
            }

            if input_closed && self.pending.is_empty() && events.is_empty() {
                match self.controller.state() {
                    Some(SessionState::Waiting) => {
                        self.controller.interrupt();
                    }
                    Some(SessionState::Ready) | None => {
                        while let Ok(event) = events.recv_timeout(SETTLE_GRACE) {
                            let _ = render_event(&event, &mut stdout, &mut stderr);
                        }
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Queue a line; `:interrupt` typed with nothing queued acts at once.
    fn accept(&mut self, line: String) -> Flow {
        let interrupt = ConsoleInput::Meta(MetaCommand::Interrupt);
        if self.pending.is_empty() && parse_line(&line) == interrupt {
            return self.handle_meta(MetaCommand::Interrupt);
        }
        self.pending.push_back(line);
        Flow::Continue
    }

    fn dispatch_pending(&mut self) -> Flow {
        while let Some(line) = self.pending.front().cloned() {
            match parse_line(&line) {
                ConsoleInput::Script(text) => {
                    if text.trim().is_empty() && self.controller.state() != Some(SessionState::Waiting)
                    {
                        self.pending.pop_front();
                        continue;
                    }
                    match self.controller.submit(text.clone()) {
                        Ok(_) => {
                            tracing::debug!(text = %loggable_content(&self.config, &text), "submitted");
                        }
                        Err(SubmitError::Busy) => return Flow::Continue,
                        Err(err) => eprintln!("error: {err}"),
                    }
                    self.pending.pop_front();
                }
                ConsoleInput::Meta(meta) => {
                    if needs_idle(&meta) && !self.accepting_input() {
                        return Flow::Continue;
                    }
                    self.pending.pop_front();
                    if self.handle_meta(meta) == Flow::Exit {
                        return Flow::Exit;
                    }
                }
                ConsoleInput::Unknown(text) => {
                    self.pending.pop_front();
                    eprintln!("unknown command: {text} (try :help)");
                }
            }
        }
        Flow::Continue
    }

    /// Idle, or blocked in a prompt that the next line will answer.
    fn accepting_input(&self) -> bool {
        matches!(
            self.controller.state(),
            Some(SessionState::Ready | SessionState::Waiting) | None
        )
    }

    fn handle_meta(&mut self, meta: MetaCommand) -> Flow {
        match meta {
            MetaCommand::Interrupt => {
                if !self.controller.interrupt() {
                    eprintln!("nothing to interrupt");
                }
            }
            MetaCommand::Restart(None) => report(self.controller.restart(None)),
            MetaCommand::Restart(Some(path)) => report(self.controller.load_and_restart(&path)),
            MetaCommand::Reload => report(self.controller.reload()),
            MetaCommand::History => {
                for (index, entry) in self.controller.command_history().iter().enumerate() {
                    println!("{index:>4}  {entry}");
                }
            }
            MetaCommand::ClearHistory => self.controller.clear_history(),
            MetaCommand::Status => {
                let state = self
                    .controller
                    .state()
                    .map_or("stopped", |state| state.label());
                match self.controller.current_source() {
                    Some(document) => println!("{state} ({})", document.name),
                    None => println!("{state}"),
                }
            }
            MetaCommand::Shortcuts => {
                for name in self.shortcuts.names() {
                    let target = self
                        .shortcuts
                        .get(name)
                        .map(|path| path.display().to_string())
                        .unwrap_or_default();
                    println!("{name}  {target}");
                }
            }
            MetaCommand::CreateShortcut(name) => self.create_shortcut(&name),
            MetaCommand::RemoveShortcut(name) => {
                if self.shortcuts.remove(&name).is_some() {
                    self.save_shortcuts();
                } else {
                    eprintln!("unknown shortcut: {name}");
                }
            }
            MetaCommand::RunShortcut(name) => match self.shortcuts.get(&name) {
                Some(path) => {
                    let path = path.to_path_buf();
                    report(self.controller.load_and_restart(&path));
                }
                None => eprintln!("unknown shortcut: {name}"),
            },
            MetaCommand::Help => println!("{HELP}"),
            MetaCommand::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    fn create_shortcut(&mut self, name: &str) {
        let Some(reference) = self
            .controller
            .current_source()
            .and_then(|document| document.reference)
        else {
            eprintln!("load a script file before creating a shortcut");
            return;
        };
        match self.shortcuts.create(name, reference) {
            Ok(_) => self.save_shortcuts(),
            Err(err) => eprintln!("error: {err}"),
        }
    }

    fn save_shortcuts(&self) {
        let Some(path) = self.config.shortcuts_file.as_deref() else {
            return;
        };
        if let Err(err) = self.shortcuts.save_to(path) {
            eprintln!("error: {err}");
        }
    }
}

/// Console commands wait for the running command to finish so piped input keeps
/// its order.
fn needs_idle(meta: &MetaCommand) -> bool {
    !matches!(meta, MetaCommand::Interrupt | MetaCommand::Help)
}

/// Load failures were already rendered from the session's event stream.
fn report(result: Result<(), SessionError>) {
    match result {
        Ok(()) | Err(SessionError::Source(_)) => {}
        Err(err) => eprintln!("error: {err}"),
    }
}
