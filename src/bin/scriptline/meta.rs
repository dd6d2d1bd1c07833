//! Console line classification.
//!
//! A line starting with a single `:` is a console command. Lua goto labels
//! (`::name::`) start with two colons and stay script text.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MetaCommand {
    Interrupt,
    Restart(Option<PathBuf>),
    Reload,
    History,
    ClearHistory,
    Status,
    Shortcuts,
    CreateShortcut(String),
    RemoveShortcut(String),
    RunShortcut(String),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleInput {
    Meta(MetaCommand),
    Unknown(String),
    Script(String),
}

pub(crate) fn parse_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(':').filter(|rest| !rest.starts_with(':')) else {
        return ConsoleInput::Script(line.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

    let meta = match (cmd.as_str(), arg) {
        ("interrupt" | "i", None) => MetaCommand::Interrupt,
        ("restart", path) => MetaCommand::Restart(path.map(PathBuf::from)),
        ("reload", None) => MetaCommand::Reload,
        ("history", None) => MetaCommand::History,
        ("clear-history", None) => MetaCommand::ClearHistory,
        ("status", None) => MetaCommand::Status,
        ("shortcuts", None) => MetaCommand::Shortcuts,
        ("shortcut", Some(name)) => MetaCommand::CreateShortcut(name.to_string()),
        ("unshortcut", Some(name)) => MetaCommand::RemoveShortcut(name.to_string()),
        ("run", Some(name)) => MetaCommand::RunShortcut(name.to_string()),
        ("help" | "h", None) => MetaCommand::Help,
        ("quit" | "q" | "exit", None) => MetaCommand::Quit,
        _ => return ConsoleInput::Unknown(trimmed.to_string()),
    };
    ConsoleInput::Meta(meta)
}

pub(crate) const HELP: &str = "\
:interrupt          abort the running command
:restart [path]     fresh session, optionally running a script file
:reload             re-run the current script in a fresh session
:history            list submitted commands
:clear-history      forget submitted commands
:status             show the session state
:shortcuts          list shortcuts
:shortcut <name>    save the current script as a shortcut
:unshortcut <name>  remove a shortcut
:run <name>         restart with a shortcut's script
:quit               leave";
