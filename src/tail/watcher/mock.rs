// SPDX-License-Identifier: Apache-2.0

//! Scripted watcher for unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::traits::{FileEvent, FileWatcher, WatcherError};

/// Watcher that records subscriptions and replays queued events.
///
/// Paths that do not exist on disk are rejected with `NotFound`, like the
/// real backends.
#[derive(Default)]
pub struct MockWatcher {
    /// Every successful `watch` call, in order
    pub watched: Vec<PathBuf>,
    /// Batches handed out by `recv_timeout`
    pub queued: VecDeque<Vec<FileEvent>>,
    /// Report a disconnected channel once the queue is empty
    pub disconnect_when_empty: bool,
}

impl MockWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, events: Vec<FileEvent>) {
        self.queued.push_back(events);
    }

    pub fn watch_count(&self, path: &Path) -> usize {
        self.watched.iter().filter(|p| p.as_path() == path).count()
    }
}

impl FileWatcher for MockWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        if !path.exists() {
            return Err(WatcherError::NotFound(path.to_path_buf()));
        }
        self.watched.push(path.to_path_buf());
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        match self.queued.pop_front() {
            Some(events) => Ok(events),
            None if self.disconnect_when_empty => {
                Err(WatcherError::Channel("watcher channel disconnected".into()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        self.try_recv()
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}
