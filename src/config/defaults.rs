pub const DEFAULT_SOURCE_EXTENSION: &str = "lua";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const MIN_POLL_INTERVAL_MS: u64 = 5;
pub const MAX_POLL_INTERVAL_MS: u64 = 1_000;

pub const DEFAULT_HOOK_INSTRUCTIONS: u32 = 1_000;
pub const MIN_HOOK_INSTRUCTIONS: u32 = 100;
pub const MAX_HOOK_INSTRUCTIONS: u32 = 1_000_000;

pub const DEFAULT_MAX_SLEEP_MS: u64 = 60_000;
pub const MAX_SLEEP_LIMIT_MS: u64 = 3_600_000;

/// Grace period for a worker to exit on kill or restart.
pub(super) const SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
