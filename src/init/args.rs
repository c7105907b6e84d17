// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::tail::config::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINE_SIZE};
use crate::tail::{StartAt, TailConfig, WatchMode, WatcherConfig};

#[derive(Debug, Args, Clone)]
pub struct TailArgs {
    /// File watcher backend
    #[arg(value_enum, long, env = "LOGSENDER_WATCH_MODE", default_value = "auto")]
    pub watch_mode: WatchModeArg,

    /// Poll interval in milliseconds, also bounds how long shutdown waits on the watcher
    #[arg(long, env = "LOGSENDER_POLL_INTERVAL_MS", default_value = "250")]
    pub poll_interval_ms: u64,

    /// Bytes read from a file per chunk
    #[arg(long, env = "LOGSENDER_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Longest line kept in memory, longer lines are truncated
    #[arg(long, env = "LOGSENDER_MAX_LINE_SIZE", default_value_t = DEFAULT_MAX_LINE_SIZE)]
    pub max_line_size: usize,

    /// Where to start reading files present at startup
    #[arg(value_enum, long, env = "LOGSENDER_START_AT", default_value = "beginning")]
    pub start_at: StartAtArg,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum WatchModeArg {
    Auto,
    Native,
    Poll,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum StartAtArg {
    Beginning,
    End,
}

impl From<WatchModeArg> for WatchMode {
    fn from(value: WatchModeArg) -> Self {
        match value {
            WatchModeArg::Auto => WatchMode::Auto,
            WatchModeArg::Native => WatchMode::Native,
            WatchModeArg::Poll => WatchMode::Poll,
        }
    }
}

impl From<StartAtArg> for StartAt {
    fn from(value: StartAtArg) -> Self {
        match value {
            StartAtArg::Beginning => StartAt::Beginning,
            StartAtArg::End => StartAt::End,
        }
    }
}

impl TailArgs {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tail_config(&self) -> Result<TailConfig, String> {
        let config = TailConfig {
            chunk_size: self.chunk_size,
            max_line_size: self.max_line_size,
            start_at: self.start_at.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn watcher_config(&self) -> Result<WatcherConfig, String> {
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be at least 1ms, got 0".to_string());
        }
        Ok(WatcherConfig {
            mode: self.watch_mode.into(),
            poll_interval: self.poll_interval(),
        })
    }
}
