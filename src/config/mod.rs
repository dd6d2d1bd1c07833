//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_HOOK_INSTRUCTIONS, DEFAULT_MAX_SLEEP_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SOURCE_EXTENSION, MAX_HOOK_INSTRUCTIONS, MAX_POLL_INTERVAL_MS, MAX_SLEEP_LIMIT_MS,
    MIN_HOOK_INSTRUCTIONS, MIN_POLL_INTERVAL_MS,
};

/// CLI options for the scriptline console.
#[derive(Debug, Parser, Clone)]
#[command(about = "Interactive Lua scripting console", author, version)]
pub struct AppConfig {
    /// Directory of preload sources, run in file-name order (repeatable)
    #[arg(long = "source-dir", action = ArgAction::Append, value_name = "DIR")]
    pub source_dirs: Vec<PathBuf>,

    /// Preload source file, run after directory sources (repeatable)
    #[arg(long = "source", action = ArgAction::Append, value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    /// File extension picked up from --source-dir
    #[arg(long = "source-ext", env = "SCRIPTLINE_SOURCE_EXT", default_value = DEFAULT_SOURCE_EXTENSION)]
    pub source_ext: String,

    /// Script loaded as the current document at start
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Upper bound on one worker queue wait (milliseconds)
    #[arg(long = "poll-interval-ms", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// VM instructions between interrupt checks
    #[arg(long = "hook-instructions", default_value_t = DEFAULT_HOOK_INSTRUCTIONS)]
    pub hook_instructions: u32,

    /// Longest pause a script may request with sleep() (milliseconds)
    #[arg(long = "max-sleep-ms", default_value_t = DEFAULT_MAX_SLEEP_MS)]
    pub max_sleep_ms: u64,

    /// Run as a JSON-lines bridge for external front-ends
    #[arg(long)]
    pub json: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SCRIPTLINE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SCRIPTLINE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging submitted script text (debug log only)
    #[arg(
        long = "log-content",
        env = "SCRIPTLINE_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Shortcut registry file
    #[arg(long = "shortcuts", env = "SCRIPTLINE_SHORTCUTS", value_name = "FILE")]
    pub shortcuts_file: Option<PathBuf>,
}
