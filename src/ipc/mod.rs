//! JSON-lines bridge for external front-ends.
//!
//! Architecture:
//! - Stdin reader thread: parses JSON commands and hands them to the main loop
//! - Main loop: routes commands to the session controller and forwards session
//!   events as they arrive
//!
//! Protocol:
//! - Each line is a JSON object
//! - Events (Rust → client): {"event": "...", ...}
//! - Commands (client → Rust): {"cmd": "...", ...}

mod protocol;
mod router;
mod session;


pub use protocol::{IpcCommand, IpcEvent};
pub use session::run_ipc_mode;
