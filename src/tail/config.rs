// SPDX-License-Identifier: Apache-2.0

//! Configuration types for the tail engine.

use std::path::PathBuf;
use std::str::FromStr;

use crate::tail::error::Error;

/// Default number of bytes read from a descriptor per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default maximum length of a single line in bytes
pub const DEFAULT_MAX_LINE_SIZE: usize = 65536;

/// Default redis port used when the sink address carries none
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Line handler selected for a monitored file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHandlerKind {
    /// Pass lines through unchanged, echoing them to stdout
    Raw,
    /// Summarize nginx access log lines into time and status code
    NginxAccessLog,
}

impl FromStr for LineHandlerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(LineHandlerKind::Raw),
            "nginx" => Ok(LineHandlerKind::NginxAccessLog),
            other => Err(Error::UnknownLineHandler(other.to_string())),
        }
    }
}

/// Send handler selected for a monitored file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendHandlerKind {
    /// Publish each line on a redis pub/sub channel
    PubSubPublish,
}

impl FromStr for SendHandlerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redis" => Ok(SendHandlerKind::PubSubPublish),
            other => Err(Error::UnknownSendHandler(other.to_string())),
        }
    }
}

/// Connection settings of the pub/sub sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkConfig {
    /// `host:port` of the sink
    pub address: String,
    /// Password, empty for none
    pub credential: String,
    /// Logical database index
    pub namespace_index: i64,
    /// Channel every line of the file is published on
    pub channel: String,
}

impl SinkConfig {
    /// Split the address into host and port, defaulting the port.
    pub fn host_port(&self) -> Result<(String, u16), Error> {
        match self.address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::Config(format!("invalid port in sink address '{}'", self.address))
                })?;
                let host = if host.is_empty() { "127.0.0.1" } else { host };
                Ok((host.to_string(), port))
            }
            None if self.address.is_empty() => Err(Error::Config(
                "sink address must not be empty".to_string(),
            )),
            None => Ok((self.address.clone(), DEFAULT_REDIS_PORT)),
        }
    }
}

/// Description of one file to tail and the handlers bound to it.
///
/// Handler identifiers are already resolved, so an unknown identifier can
/// never reach the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSpec {
    pub path: PathBuf,
    pub line_handler: LineHandlerKind,
    pub send_handler: SendHandlerKind,
    pub sink: SinkConfig,
}

/// Where the first descriptor opened for a path starts reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartAt {
    /// Read the existing content of the file
    #[default]
    Beginning,
    /// Skip the existing content, only tail new lines
    End,
}

/// Tunables of the tail engine
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Bytes read per chunk
    pub chunk_size: usize,
    /// Longest line kept in memory; longer lines are truncated
    pub max_line_size: usize,
    /// Starting position for files that are present at registration
    pub start_at: StartAt,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_line_size: DEFAULT_MAX_LINE_SIZE,
            start_at: StartAt::Beginning,
        }
    }
}

impl TailConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("Chunk size must be at least 1, got 0".to_string());
        }
        if self.max_line_size == 0 {
            return Err("Max line size must be at least 1, got 0".to_string());
        }
        Ok(())
    }
}
