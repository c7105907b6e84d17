// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::tail::watcher::WatcherError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Unknown line handler: {0}")]
    UnknownLineHandler(String),

    #[error("Unknown send handler: {0}")]
    UnknownSendHandler(String),

    #[error("Malformed line: {0}")]
    MalformedLine(String),

    #[error("Publish error: {0}")]
    Publish(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error comes from an unrecognized handler identifier.
    pub fn is_unknown_handler(&self) -> bool {
        matches!(
            self,
            Error::UnknownLineHandler(_) | Error::UnknownSendHandler(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
