// SPDX-License-Identifier: Apache-2.0

//! Traits and types for file system watchers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for watcher operations
#[derive(Debug)]
pub enum WatcherError {
    /// Failed to initialize the watcher
    Init(String),
    /// The path to watch does not exist
    NotFound(PathBuf),
    /// Failed to watch a path
    Watch(String),
    /// IO error
    Io(std::io::Error),
    /// Channel error
    Channel(String),
}

impl fmt::Display for WatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherError::Init(msg) => write!(f, "watcher initialization failed: {}", msg),
            WatcherError::NotFound(path) => write!(f, "path not found: {}", path.display()),
            WatcherError::Watch(msg) => write!(f, "watch failed: {}", msg),
            WatcherError::Io(e) => write!(f, "IO error: {}", e),
            WatcherError::Channel(msg) => write!(f, "channel error: {}", msg),
        }
    }
}

impl std::error::Error for WatcherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatcherError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WatcherError {
    fn from(e: std::io::Error) -> Self {
        WatcherError::Io(e)
    }
}

/// Kind of file event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created
    Create,
    /// File content was written
    Write,
    /// File was removed/deleted
    Remove,
    /// File was renamed away or into place
    Rename,
    /// Catch-all for other events
    Other,
}

/// A file system event for a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The kind of event
    pub kind: FileEventKind,
    /// The path affected by the event
    pub path: PathBuf,
}

impl FileEvent {
    /// Create a new file event
    pub fn new(kind: FileEventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    /// Create a create event
    pub fn create(path: PathBuf) -> Self {
        Self::new(FileEventKind::Create, path)
    }

    /// Create a write event
    pub fn write(path: PathBuf) -> Self {
        Self::new(FileEventKind::Write, path)
    }

    /// Create a remove event
    pub fn remove(path: PathBuf) -> Self {
        Self::new(FileEventKind::Remove, path)
    }
}

/// Trait for file system watchers.
///
/// Implementations can use native OS file system notifications or polling.
pub trait FileWatcher {
    /// Subscribe to events for a path.
    ///
    /// Watching a path that is already watched is a no-op. Returns
    /// [`WatcherError::NotFound`] when the path does not exist.
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError>;

    /// Try to receive the next batch of events.
    ///
    /// This method should return immediately with any available events,
    /// or return an empty vector if no events are pending.
    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError>;

    /// Receive events with a timeout.
    ///
    /// Blocks until events are available or the timeout expires.
    /// Returns an empty vector if the timeout expires with no events.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError>;

    /// Get the name of the watcher backend for logging.
    fn backend_name(&self) -> &'static str;
}

impl<W: FileWatcher + ?Sized> FileWatcher for Box<W> {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        (**self).watch(path)
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        (**self).try_recv()
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        (**self).recv_timeout(timeout)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
