// SPDX-License-Identifier: Apache-2.0

//! Single-threaded event loop feeding watcher notifications to the registry.
//!
//! The wait for the next batch of events is the only blocking point; reads,
//! transforms and publishes for one event run to completion before the next
//! event is taken.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tail::error::{Error, Result};
use crate::tail::handler::HandlerFactory;
use crate::tail::registry::WatchRegistry;
use crate::tail::watcher::{FileWatcher, WatcherError};

/// Pause after a transient watcher error before waiting again
const WATCHER_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct EventLoop<W: FileWatcher, F: HandlerFactory> {
    registry: WatchRegistry<W, F>,
    /// Longest wait for events before checking for cancellation
    wait_interval: Duration,
}

impl<W: FileWatcher, F: HandlerFactory> EventLoop<W, F> {
    pub fn new(registry: WatchRegistry<W, F>, wait_interval: Duration) -> Self {
        Self {
            registry,
            wait_interval,
        }
    }

    pub fn registry(&self) -> &WatchRegistry<W, F> {
        &self.registry
    }

    /// Wait up to `timeout` for one batch of events and handle it.
    /// Returns the number of events handled.
    pub fn turn(&mut self, timeout: Duration) -> Result<usize> {
        let events = self.registry.watcher_mut().recv_timeout(timeout)?;
        for event in &events {
            debug!(path = %event.path.display(), kind = ?event.kind, "File event");
            self.registry.handle_event(event);
        }
        Ok(events.len())
    }

    /// Catch up on every open file, then handle events until cancelled.
    ///
    /// Returns an error only when the watcher can no longer deliver events.
    pub fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            backend = self.registry.watcher().backend_name(),
            files = self.registry.len(),
            "Event loop started"
        );
        self.registry.catch_up();

        loop {
            if cancel.is_cancelled() {
                info!("Event loop cancelled");
                return Ok(());
            }

            match self.turn(self.wait_interval) {
                Ok(_) => {}
                Err(Error::Watcher(WatcherError::Channel(msg))) => {
                    return Err(Error::Watcher(WatcherError::Channel(msg)));
                }
                Err(e) => {
                    warn!("Watcher error: {}", e);
                    std::thread::sleep(WATCHER_ERROR_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::config::{MonitorSpec, TailConfig};
    use crate::tail::handler::{LineHandler, SendHandler};
    use crate::tail::state::tests::{Lines, RecordingLine, RecordingSend, spec};
    use crate::tail::watcher::{FileEvent, MockWatcher};
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Recorder(Lines);

    impl HandlerFactory for Recorder {
        fn line_handler(&self, _spec: &MonitorSpec) -> Result<Box<dyn LineHandler + Send>> {
            Ok(Box::new(RecordingLine(self.0.clone())))
        }

        fn send_handler(&self, _spec: &MonitorSpec) -> Result<Box<dyn SendHandler + Send>> {
            Ok(Box::new(RecordingSend(Lines::default())))
        }
    }

    #[test]
    fn test_run_catches_up_then_handles_events_until_disconnect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"existing\n").unwrap();

        let recorder = Recorder::default();
        let mut watcher = MockWatcher::new();
        watcher.disconnect_when_empty = true;

        let mut registry =
            WatchRegistry::with_factory(watcher, recorder.clone(), TailConfig::default());
        registry.register(&spec(path.clone())).unwrap();

        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"appended\n").unwrap();
        drop(f);

        // Event arrives after catch-up already read the appended line
        registry
            .watcher_mut()
            .push(vec![FileEvent::write(path.clone())]);

        let mut event_loop = EventLoop::new(registry, Duration::from_millis(10));
        let result = event_loop.run(CancellationToken::new());

        assert!(matches!(
            result,
            Err(Error::Watcher(WatcherError::Channel(_)))
        ));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["existing", "appended"]);
    }

    #[test]
    fn test_run_returns_when_cancelled() {
        let recorder = Recorder::default();
        let registry =
            WatchRegistry::with_factory(MockWatcher::new(), recorder, TailConfig::default());
        let mut event_loop = EventLoop::new(registry, Duration::from_millis(10));

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(event_loop.run(cancel).is_ok());
    }

    #[test]
    fn test_turn_handles_one_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"").unwrap();

        let recorder = Recorder::default();
        let mut registry =
            WatchRegistry::with_factory(MockWatcher::new(), recorder.clone(), TailConfig::default());
        registry.register(&spec(path.clone())).unwrap();
        let mut event_loop = EventLoop::new(registry, Duration::from_millis(10));

        fs::write(&path, b"one\ntwo\n").unwrap();
        event_loop
            .registry
            .watcher_mut()
            .push(vec![FileEvent::write(path.clone()), FileEvent::write(path.clone())]);

        assert_eq!(event_loop.turn(Duration::from_millis(10)).unwrap(), 2);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(event_loop.turn(Duration::from_millis(10)).unwrap(), 0);
    }
}
