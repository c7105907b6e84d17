// SPDX-License-Identifier: Apache-2.0

//! Native file system watcher using the `notify` crate.
//!
//! Uses OS-level file system notifications:
//! - Linux: inotify
//! - macOS: FSEvents
//! - Windows: ReadDirectoryChangesW

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError, channel};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::traits::{FileEvent, FileEventKind, FileWatcher, WatcherError};

/// Native file system watcher using OS-level notifications.
pub struct NativeWatcher {
    watcher: RecommendedWatcher,
    receiver: Receiver<Result<Event, notify::Error>>,
}

impl NativeWatcher {
    /// Create a new native watcher.
    pub fn new() -> Result<Self, WatcherError> {
        let (tx, rx) = channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| WatcherError::Init(e.to_string()))?;

        Ok(Self {
            watcher,
            receiver: rx,
        })
    }

    /// Convert a notify event into one FileEvent per affected path
    fn convert_event(event: Event) -> Vec<FileEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => FileEventKind::Create,
            EventKind::Modify(ModifyKind::Name(_)) => FileEventKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => FileEventKind::Other,
            EventKind::Modify(_) => FileEventKind::Write,
            EventKind::Remove(_) => FileEventKind::Remove,
            EventKind::Access(_) => return Vec::new(),
            EventKind::Other | EventKind::Any => FileEventKind::Other,
        };

        event
            .paths
            .into_iter()
            .map(|path| FileEvent::new(kind, path))
            .collect()
    }

    fn handle(events: &mut Vec<FileEvent>, res: Result<Event, notify::Error>) {
        match res {
            Ok(event) => events.extend(Self::convert_event(event)),
            Err(e) => tracing::warn!("File watcher error: {}", e),
        }
    }
}

impl FileWatcher for NativeWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| match e.kind {
                notify::ErrorKind::PathNotFound => WatcherError::NotFound(path.to_path_buf()),
                notify::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                    WatcherError::NotFound(path.to_path_buf())
                }
                _ => WatcherError::Watch(e.to_string()),
            })
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        let mut events = Vec::new();

        loop {
            match self.receiver.try_recv() {
                Ok(res) => Self::handle(&mut events, res),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(WatcherError::Channel("watcher channel disconnected".into()));
                }
            }
        }

        Ok(events)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        let mut events = Vec::new();

        // First wait for at least one event with timeout
        match self.receiver.recv_timeout(timeout) {
            Ok(res) => Self::handle(&mut events, res),
            Err(RecvTimeoutError::Timeout) => return Ok(events),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WatcherError::Channel("watcher channel disconnected".into()));
            }
        }

        // Then drain any additional pending events
        events.extend(self.try_recv()?);

        Ok(events)
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "linux")]
        {
            "inotify"
        }
        #[cfg(target_os = "macos")]
        {
            "FSEvents"
        }
        #[cfg(target_os = "windows")]
        {
            "ReadDirectoryChangesW"
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            "native"
        }
    }
}
