// SPDX-License-Identifier: Apache-2.0

//! File system watcher abstractions for the tail engine.
//!
//! This module provides two watching strategies:
//! - **Native watching**: Uses OS-level file system notifications (inotify on Linux,
//!   FSEvents on macOS, ReadDirectoryChangesW on Windows) for immediate event detection.
//! - **Poll watching**: Falls back to periodic file system polling for environments
//!   where native watching isn't available or reliable (e.g., NFS, network shares).

#[cfg(test)]
mod mock;
mod native;
mod poll;
mod traits;

#[cfg(test)]
pub use mock::MockWatcher;
pub use native::NativeWatcher;
pub use poll::PollWatcher;
pub use traits::{FileEvent, FileEventKind, FileWatcher, WatcherError};

use std::time::Duration;

/// Watch mode configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    /// Tries native watching first, falls back to polling on failure.
    #[default]
    Auto,
    /// Force native file system watching (inotify/kqueue/FSEvents).
    Native,
    /// Force polling mode.
    Poll,
}

impl std::str::FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(WatchMode::Auto),
            "native" => Ok(WatchMode::Native),
            "poll" | "polling" => Ok(WatchMode::Poll),
            _ => Err(format!(
                "Invalid watch mode '{}'. Valid options: auto, native, poll",
                s
            )),
        }
    }
}

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Watch mode: auto, native, or poll
    pub mode: WatchMode,
    /// Poll interval when using poll mode
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            mode: WatchMode::Auto,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Create a watcher based on the configuration.
pub fn create_watcher(
    config: &WatcherConfig,
) -> Result<Box<dyn FileWatcher + Send>, WatcherError> {
    match config.mode {
        WatchMode::Native => {
            let watcher = NativeWatcher::new()?;
            Ok(Box::new(watcher))
        }
        WatchMode::Poll => Ok(Box::new(PollWatcher::new(config.poll_interval))),
        WatchMode::Auto => match NativeWatcher::new() {
            Ok(watcher) => {
                tracing::info!("Using native file system watcher");
                Ok(Box::new(watcher))
            }
            Err(e) => {
                tracing::warn!(
                    "Native file watching unavailable ({}), falling back to polling",
                    e
                );
                Ok(Box::new(PollWatcher::new(config.poll_interval)))
            }
        },
    }
}
