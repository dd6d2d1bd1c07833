use super::defaults::{
    MAX_HOOK_INSTRUCTIONS, MAX_POLL_INTERVAL_MS, MAX_SLEEP_LIMIT_MS, MIN_HOOK_INSTRUCTIONS,
    MIN_POLL_INTERVAL_MS, SHUTDOWN_TIMEOUT_MS,
};
use super::AppConfig;
use crate::runtime::LuaOptions;
use crate::session::SessionConfig;
use crate::source::FsSourceLoader;
use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the source extension.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            bail!(
                "--poll-interval-ms must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            );
        }
        if !(MIN_HOOK_INSTRUCTIONS..=MAX_HOOK_INSTRUCTIONS).contains(&self.hook_instructions) {
            bail!(
                "--hook-instructions must be between {MIN_HOOK_INSTRUCTIONS} and {MAX_HOOK_INSTRUCTIONS}, got {}",
                self.hook_instructions
            );
        }
        if self.max_sleep_ms > MAX_SLEEP_LIMIT_MS {
            bail!(
                "--max-sleep-ms must be at most {MAX_SLEEP_LIMIT_MS}, got {}",
                self.max_sleep_ms
            );
        }

        let ext = self.source_ext.trim().trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("--source-ext must be alphanumeric, got '{}'", self.source_ext);
        }
        self.source_ext = ext.to_ascii_lowercase();

        for dir in &self.source_dirs {
            if !dir.is_dir() {
                bail!("--source-dir '{}' is not a directory", dir.display());
            }
        }
        for file in self.sources.iter().chain(self.script.iter()) {
            ensure_file(file)?;
        }
        Ok(())
    }

    /// Engine settings for every session this process creates.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_sleep: Duration::from_millis(self.max_sleep_ms),
            flush_after_interrupt: true,
            shutdown_timeout: Duration::from_millis(SHUTDOWN_TIMEOUT_MS),
        }
    }

    pub fn lua_options(&self) -> LuaOptions {
        LuaOptions {
            hook_instructions: self.hook_instructions,
        }
    }

    /// Loader for the configured preload directories and files.
    pub fn source_loader(&self) -> FsSourceLoader {
        let loader = self
            .source_dirs
            .iter()
            .fold(FsSourceLoader::new(self.source_ext.clone()), |loader, dir| {
                loader.with_dir(dir)
            });
        self.sources
            .iter()
            .fold(loader, |loader, file| loader.with_file(file))
    }
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("source file '{}' does not exist", path.display());
    }
    Ok(())
}
