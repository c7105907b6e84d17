// SPDX-License-Identifier: Apache-2.0

//! Redis pub/sub send handler.

use std::time::Duration;

use redis::{Commands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::{debug, warn};

use super::SendHandler;
use crate::tail::config::SinkConfig;
use crate::tail::error::{Error, Result};

/// Default timeout for establishing a connection to the sink
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Publishes every message on a fixed redis channel.
///
/// Delivery is fire-and-forget: nothing is retried or buffered. A failed
/// publish drops the connection, and the next send reconnects.
pub struct RedisPublisher {
    client: redis::Client,
    connection: Option<redis::Connection>,
    channel: String,
    connect_timeout: Duration,
}

impl RedisPublisher {
    pub fn new(sink: &SinkConfig) -> Result<Self> {
        let (host, port) = sink.host_port()?;
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: sink.namespace_index,
                password: (!sink.credential.is_empty()).then(|| sink.credential.clone()),
                ..Default::default()
            },
        };

        Ok(Self {
            client: redis::Client::open(info)
                .map_err(|e| Error::Config(format!("invalid redis sink: {}", e)))?,
            connection: None,
            channel: sink.channel.clone(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Establish the connection now; failure is logged and retried on send.
    pub fn try_connect(&mut self) {
        if self.connection.is_some() {
            return;
        }
        match self.client.get_connection_with_timeout(self.connect_timeout) {
            Ok(conn) => {
                debug!(channel = self.channel.as_str(), "Connected to redis");
                self.connection = Some(conn);
            }
            Err(e) => warn!(
                channel = self.channel.as_str(),
                "Redis unavailable, will reconnect on next send: {}", e
            ),
        }
    }
}

impl SendHandler for RedisPublisher {
    fn send(&mut self, message: &str) -> Result<()> {
        let mut conn = match self.connection.take() {
            Some(conn) => conn,
            None => self.client.get_connection_with_timeout(self.connect_timeout)?,
        };

        let _receivers: i64 = conn.publish(self.channel.as_str(), message)?;
        self.connection = Some(conn);
        Ok(())
    }
}
