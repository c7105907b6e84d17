// SPDX-License-Identifier: Apache-2.0

//! Watch registry: maps each monitored path to its tail state and keeps the
//! notification subscriptions needed to follow the file through deletion and
//! recreation.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::tail::config::{MonitorSpec, StartAt, TailConfig};
use crate::tail::error::Result;
use crate::tail::file_id::FileId;
use crate::tail::handler::{DefaultHandlers, HandlerFactory};
use crate::tail::state::TailState;
use crate::tail::watcher::{FileEvent, FileEventKind, FileWatcher, WatcherError};

/// Path of the directory containing `path`: everything before the last `/`,
/// or an empty string when there is none past the first byte.
pub fn parent_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) if i > 0 => &path[..i],
        _ => "",
    }
}

/// Directory to subscribe to so that creation of `path` is observable
fn watch_dir_for(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    };
    match parent_directory(s) {
        "" if s.starts_with('/') => PathBuf::from("/"),
        "" => PathBuf::from("."),
        dir => PathBuf::from(dir),
    }
}

/// Registry of tailed files.
///
/// Holds at most one descriptor per path. A path whose file is missing is
/// kept as pending until a create event for it arrives.
pub struct WatchRegistry<W: FileWatcher, F: HandlerFactory = DefaultHandlers> {
    watcher: W,
    factory: F,
    config: TailConfig,
    tails: HashMap<PathBuf, TailState>,
    pending: HashMap<PathBuf, MonitorSpec>,
}

impl<W: FileWatcher> WatchRegistry<W, DefaultHandlers> {
    pub fn new(watcher: W, config: TailConfig) -> Self {
        Self::with_factory(watcher, DefaultHandlers, config)
    }
}

impl<W: FileWatcher, F: HandlerFactory> WatchRegistry<W, F> {
    pub fn with_factory(watcher: W, factory: F, config: TailConfig) -> Self {
        Self {
            watcher,
            factory,
            config,
            tails: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn watcher_mut(&mut self) -> &mut W {
        &mut self.watcher
    }

    pub fn tail_state(&self, path: &Path) -> Option<&TailState> {
        self.tails.get(path)
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    /// Number of paths with a bound tail state
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }

    /// Register every monitor. Per-path failures are logged and skipped.
    /// Returns the number of files opened for tailing.
    pub fn register_all(&mut self, specs: &[MonitorSpec]) -> usize {
        for spec in specs {
            if let Err(e) = self.register(spec) {
                warn!(path = %spec.path.display(), "Failed to register file: {}", e);
            }
        }
        self.tails.values().filter(|t| t.is_open()).count()
    }

    /// Subscribe to `spec.path` and open it for tailing.
    ///
    /// A missing file is not an error: its parent directory is watched instead
    /// and any stale descriptor for the path is closed.
    pub fn register(&mut self, spec: &MonitorSpec) -> Result<()> {
        self.register_at(spec, self.config.start_at)
    }

    fn register_at(&mut self, spec: &MonitorSpec, start_at: StartAt) -> Result<()> {
        let path = &spec.path;
        self.subscribe(path);

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "File does not exist, watching its directory");
                self.watch_parent(path);
                match self.tails.get_mut(path) {
                    Some(state) => state.close(),
                    None => {
                        self.pending.insert(path.clone(), spec.clone());
                    }
                }
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(state) = self.tails.get_mut(path) {
            if state
                .descriptor()
                .is_some_and(|current| FileId::same_file(current, &file))
            {
                debug!(path = %path.display(), "File unchanged, keeping descriptor");
                return Ok(());
            }
            info!(path = %path.display(), "File recreated, reopening");
            // Lines appended to the old file before it was moved away
            if let Err(e) = state.read_and_dispatch() {
                warn!(path = %path.display(), "Failed to drain previous file: {}", e);
            }
            state.replace_descriptor(file);
            return Ok(());
        }

        let line_handler = self.factory.line_handler(spec)?;
        let send_handler = self.factory.send_handler(spec)?;
        let config = TailConfig {
            start_at,
            ..self.config.clone()
        };
        let state = TailState::new(spec.clone(), file, &config, line_handler, send_handler)?;

        info!(
            path = %path.display(),
            line_handler = ?spec.line_handler,
            send_handler = ?spec.send_handler,
            offset = state.offset(),
            "Tailing file"
        );
        self.pending.remove(path);
        self.tails.insert(path.clone(), state);
        Ok(())
    }

    /// Route one notification to the tail state of its path.
    pub fn handle_event(&mut self, event: &FileEvent) {
        let path = event.path.as_path();
        let tracked = self.tails.contains_key(path);
        if !tracked && !self.pending.contains_key(path) {
            return;
        }

        match event.kind {
            FileEventKind::Write if tracked => self.tail(path),
            // A write to a pending path means its create was missed
            FileEventKind::Create | FileEventKind::Write => {
                let spec = self
                    .tails
                    .get(path)
                    .map(|t| t.spec().clone())
                    .or_else(|| self.pending.get(path).cloned());
                if let Some(spec) = spec {
                    if let Err(e) = self.register_at(&spec, StartAt::Beginning) {
                        warn!(path = %path.display(), "Failed to reopen file: {}", e);
                    }
                }
                self.tail(path);
            }
            FileEventKind::Remove | FileEventKind::Rename => {
                debug!(path = %path.display(), kind = ?event.kind, "File moved away");
                self.watch_parent(path);
                return;
            }
            FileEventKind::Other => return,
        }

        // Some backends drop the watch once the inode changes
        self.subscribe(path);
    }

    /// Run one read pass over every open file.
    pub fn catch_up(&mut self) {
        let paths: Vec<PathBuf> = self.tails.keys().cloned().collect();
        for path in paths {
            self.tail(&path);
        }
    }

    fn tail(&mut self, path: &Path) {
        let Some(state) = self.tails.get_mut(path) else {
            return;
        };
        match state.read_and_dispatch() {
            Ok(0) => {}
            Ok(lines) => debug!(
                path = %path.display(),
                lines,
                offset = state.offset(),
                "Dispatched lines"
            ),
            Err(e) => warn!(
                path = %path.display(),
                "Read failed, retrying on next event: {}", e
            ),
        }
    }

    fn subscribe(&mut self, path: &Path) {
        match self.watcher.watch(path) {
            Ok(()) => {}
            Err(WatcherError::NotFound(_)) => self.watch_parent(path),
            Err(e) => warn!(path = %path.display(), "Failed to watch file: {}", e),
        }
    }

    fn watch_parent(&mut self, path: &Path) {
        let dir = watch_dir_for(path);
        match self.watcher.watch(&dir) {
            Ok(()) => debug!(dir = %dir.display(), "Watching directory"),
            Err(e) => warn!(dir = %dir.display(), "Failed to watch directory: {}", e),
        }
    }
}
