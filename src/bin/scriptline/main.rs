//! scriptline console entrypoint.
//!
//! Runs an interactive Lua session fed from stdin. By default lines are rendered for
//! a terminal; `--json` switches to the JSON-lines bridge used by external
//! front-ends.
//!
//! # Architecture
//!
//! - Input thread: reads stdin lines
//! - Session worker: owns the Lua runtime and runs one command at a time
//! - Main loop: dispatches input and renders session events as they arrive

mod console;
mod meta;
mod render;

use anyhow::Result;
use scriptline::config::AppConfig;
use scriptline::ipc::run_ipc_mode;
use scriptline::telemetry::{init_tracing, tracing_log_path};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);
    tracing::info!(log = %tracing_log_path().display(), json = config.json, "scriptline started");

    if config.json {
        run_ipc_mode(config)
    } else {
        console::run_console(config)
    }
}
