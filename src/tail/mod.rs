// SPDX-License-Identifier: Apache-2.0

//! Tail-and-dispatch engine.
//!
//! Follows a fixed set of log files through notification events, extracts
//! complete lines from what is appended, and routes each line once through
//! the line and send handlers bound to its file.
//!
//! Features:
//! - Recovery from deletion and recreation (log rotation) of a tailed file
//! - Directory watches for files that do not exist yet
//! - Native (inotify/FSEvents) or polling notification backends

pub mod config;
pub mod error;
pub mod event_loop;
pub mod file_id;
pub mod handler;
pub mod registry;
pub mod state;
pub mod watcher;

pub use config::{LineHandlerKind, MonitorSpec, SendHandlerKind, SinkConfig, StartAt, TailConfig};
pub use error::{Error, Result};
pub use event_loop::EventLoop;
pub use handler::{DefaultHandlers, HandlerFactory, LineHandler, SendHandler};
pub use registry::{WatchRegistry, parent_directory};
pub use state::TailState;
pub use watcher::{FileEvent, FileEventKind, FileWatcher, WatchMode, WatcherConfig, create_watcher};
