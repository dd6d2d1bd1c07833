use super::defaults::SHUTDOWN_TIMEOUT_MS;
use super::{AppConfig, DEFAULT_HOOK_INSTRUCTIONS, DEFAULT_POLL_INTERVAL_MS};
use crate::source::SourceLoader;
use clap::Parser;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn defaults_validate() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(cfg.hook_instructions, DEFAULT_HOOK_INSTRUCTIONS);
    assert_eq!(cfg.source_ext, "lua");
    assert!(!cfg.json);
}

#[test]
fn rejects_poll_interval_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--poll-interval-ms", "4"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--poll-interval-ms", "1001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_poll_interval_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--poll-interval-ms", "5"]);
    assert!(cfg.validate().is_ok());

    let mut cfg = AppConfig::parse_from(["test-app", "--poll-interval-ms", "1000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_hook_instructions_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--hook-instructions", "99"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--hook-instructions", "1000001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_max_sleep_above_limit() {
    let mut cfg = AppConfig::parse_from(["test-app", "--max-sleep-ms", "3600001"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--max-sleep-ms", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn normalizes_source_extension() {
    let mut cfg = AppConfig::parse_from(["test-app", "--source-ext", ".LUA"]);
    cfg.validate().unwrap();
    assert_eq!(cfg.source_ext, "lua");

    let mut cfg = AppConfig::parse_from(["test-app", "--source-ext", "l/a"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_missing_source_paths() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.lua");
    let missing = missing.to_str().unwrap();

    let mut cfg = AppConfig::parse_from(["test-app", "--source", missing]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--script", missing]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--source-dir", missing]);
    assert!(cfg.validate().is_err());
}

#[test]
fn session_config_reflects_flags() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--poll-interval-ms",
        "20",
        "--max-sleep-ms",
        "1500",
        "--hook-instructions",
        "500",
    ]);
    cfg.validate().unwrap();
    let session = cfg.session_config();
    assert_eq!(session.poll_interval, Duration::from_millis(20));
    assert_eq!(session.max_sleep, Duration::from_millis(1500));
    assert_eq!(session.shutdown_timeout, Duration::from_millis(SHUTDOWN_TIMEOUT_MS));
    assert!(session.flush_after_interrupt);
    assert_eq!(cfg.lua_options().hook_instructions, 500);
}

#[test]
fn source_loader_orders_dirs_before_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lib.lua"), "lib = 1").unwrap();
    let extra = dir.path().join("extra.txt");
    fs::write(&extra, "extra = 2").unwrap();

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--source",
        extra.to_str().unwrap(),
        "--source-dir",
        dir.path().to_str().unwrap(),
    ]);
    cfg.validate().unwrap();
    let names: Vec<String> = cfg
        .source_loader()
        .preload_sources()
        .into_iter()
        .map(|doc| doc.unwrap().name)
        .collect();
    assert_eq!(names, vec!["lib.lua", "extra.txt"]);
}
