// SPDX-License-Identifier: Apache-2.0

//! Polling-based file watcher as a fallback for systems where native
//! file system notifications are unavailable or unreliable (e.g., NFS).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::traits::{FileEvent, FileWatcher, WatcherError};

/// File metadata for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    /// Last modification time
    modified: SystemTime,
    /// File size in bytes
    size: u64,
    /// Inode number, zero where unavailable
    ino: u64,
}

impl FileState {
    fn from_metadata(metadata: &fs::Metadata) -> Option<Self> {
        #[cfg(unix)]
        let ino = {
            use std::os::unix::fs::MetadataExt;
            metadata.ino()
        };
        #[cfg(not(unix))]
        let ino = 0;

        Some(Self {
            modified: metadata.modified().ok()?,
            size: metadata.len(),
            ino,
        })
    }
}

/// Polling-based file watcher.
///
/// Periodically stats watched files and the children of watched directories,
/// synthesizing create, write and remove events from the differences.
pub struct PollWatcher {
    /// Individual files being watched
    watched_files: HashSet<PathBuf>,
    /// Directories being watched
    watched_dirs: HashSet<PathBuf>,
    /// Known file states from last poll
    file_states: HashMap<PathBuf, FileState>,
    /// Poll interval
    poll_interval: Duration,
    /// Last poll time
    last_poll: Instant,
    /// Pending events from last poll
    pending_events: Vec<FileEvent>,
}

impl PollWatcher {
    /// Create a new poll watcher.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            watched_files: HashSet::new(),
            watched_dirs: HashSet::new(),
            file_states: HashMap::new(),
            poll_interval,
            last_poll: Instant::now(),
            pending_events: Vec::new(),
        }
    }

    /// Scan everything watched for changes
    fn scan_all(&mut self) {
        let mut events = Vec::new();
        let mut current: HashMap<PathBuf, FileState> = HashMap::new();

        for path in &self.watched_files {
            if let Ok(metadata) = fs::metadata(path) {
                if let Some(state) = metadata
                    .is_file()
                    .then(|| FileState::from_metadata(&metadata))
                    .flatten()
                {
                    current.insert(path.clone(), state);
                }
            }
        }

        for dir in &self.watched_dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Error scanning directory {:?}: {}", dir, e);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let metadata = match entry.metadata() {
                    Ok(m) if m.is_file() => m,
                    _ => continue,
                };
                if let Some(state) = FileState::from_metadata(&metadata) {
                    current.insert(entry.path(), state);
                }
            }
        }

        for (path, state) in &current {
            match self.file_states.get(path) {
                None => events.push(FileEvent::create(path.clone())),
                Some(old) if old.ino != state.ino => {
                    events.push(FileEvent::remove(path.clone()));
                    events.push(FileEvent::create(path.clone()));
                }
                Some(old) if old != state => events.push(FileEvent::write(path.clone())),
                Some(_) => {}
            }
        }

        for path in self.file_states.keys() {
            if !current.contains_key(path) {
                events.push(FileEvent::remove(path.clone()));
            }
        }

        self.file_states = current;
        self.pending_events.extend(events);
        self.last_poll = Instant::now();
    }

    /// Record the current state of a path without emitting events for it
    fn baseline(&mut self, path: &Path, metadata: &fs::Metadata) {
        if metadata.is_file() {
            if let Some(state) = FileState::from_metadata(metadata) {
                self.file_states.insert(path.to_path_buf(), state);
            }
        } else if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                if let Ok(m) = entry.metadata() {
                    if m.is_file() {
                        if let Some(state) = FileState::from_metadata(&m) {
                            self.file_states.entry(entry.path()).or_insert(state);
                        }
                    }
                }
            }
        }
    }

    fn take_pending(&mut self) -> Vec<FileEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

impl FileWatcher for PollWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatcherError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let newly_watched = if metadata.is_dir() {
            self.watched_dirs.insert(path.to_path_buf())
        } else {
            self.watched_files.insert(path.to_path_buf())
        };

        if newly_watched {
            self.baseline(path, &metadata);
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        if self.last_poll.elapsed() >= self.poll_interval {
            self.scan_all();
        }
        Ok(self.take_pending())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        let deadline = Instant::now() + timeout;

        loop {
            let events = self.try_recv()?;
            if !events.is_empty() {
                return Ok(events);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            let next_poll = self.last_poll + self.poll_interval;
            let wake = next_poll.min(deadline);
            std::thread::sleep(wake.saturating_duration_since(now));
        }
    }

    fn backend_name(&self) -> &'static str {
        "poll"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::watcher::FileEventKind;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use tempfile::TempDir;

    fn poll_now(watcher: &mut PollWatcher) -> Vec<FileEvent> {
        watcher.scan_all();
        watcher.take_pending()
    }

    #[test]
    fn test_poll_watcher_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = PollWatcher::new(Duration::from_millis(10));

        let missing = temp_dir.path().join("missing.log");
        assert!(matches!(
            watcher.watch(&missing),
            Err(WatcherError::NotFound(_))
        ));
    }

    #[test]
    fn test_poll_watcher_no_events_for_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("app.log");
        File::create(&file_path).unwrap();

        let mut watcher = PollWatcher::new(Duration::from_millis(10));
        watcher.watch(&file_path).unwrap();
        watcher.watch(temp_dir.path()).unwrap();

        assert!(poll_now(&mut watcher).is_empty());
    }

    #[test]
    fn test_poll_watcher_detects_create_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = PollWatcher::new(Duration::from_millis(10));
        watcher.watch(temp_dir.path()).unwrap();

        let file_path = temp_dir.path().join("new.log");
        File::create(&file_path).unwrap();

        let events = poll_now(&mut watcher);
        assert_eq!(events, vec![FileEvent::create(file_path)]);
    }

    #[test]
    fn test_poll_watcher_detects_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("app.log");
        File::create(&file_path).unwrap();

        let mut watcher = PollWatcher::new(Duration::from_millis(10));
        watcher.watch(&file_path).unwrap();

        let mut file = OpenOptions::new().append(true).open(&file_path).unwrap();
        file.write_all(b"hello\n").unwrap();
        drop(file);

        let events = poll_now(&mut watcher);
        assert_eq!(events, vec![FileEvent::write(file_path)]);
    }

    #[test]
    fn test_poll_watcher_detects_remove() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("app.log");
        File::create(&file_path).unwrap();

        let mut watcher = PollWatcher::new(Duration::from_millis(10));
        watcher.watch(&file_path).unwrap();

        fs::remove_file(&file_path).unwrap();

        let events = poll_now(&mut watcher);
        assert_eq!(events, vec![FileEvent::remove(file_path)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_poll_watcher_detects_recreation() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("app.log");
        let rotated = temp_dir.path().join("app.log.1");
        File::create(&file_path).unwrap();

        let mut watcher = PollWatcher::new(Duration::from_millis(10));
        watcher.watch(&file_path).unwrap();

        // Rename away and recreate between two polls; the rotated file keeps
        // the inode so the new one must differ
        fs::rename(&file_path, &rotated).unwrap();
        File::create(&file_path).unwrap();

        let kinds: Vec<FileEventKind> = poll_now(&mut watcher).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![FileEventKind::Remove, FileEventKind::Create]);
    }

    #[test]
    fn test_poll_watcher_recv_timeout_expires() {
        let mut watcher = PollWatcher::new(Duration::from_millis(5));
        let events = watcher.recv_timeout(Duration::from_millis(20)).unwrap();
        assert!(events.is_empty());
        assert_eq!(watcher.backend_name(), "poll");
    }
}
