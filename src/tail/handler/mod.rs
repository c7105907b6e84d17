// SPDX-License-Identifier: Apache-2.0

//! Line and send handlers bound to each tailed file.
//!
//! The handler for a file is selected from a closed set by the identifiers in
//! its [`MonitorSpec`], and invoked through the [`LineHandler`] and
//! [`SendHandler`] capabilities.

mod line;
mod send;

pub use line::{NGINX_MIN_FIELDS, NginxAccessLineHandler, RawLineHandler};
pub use send::{DEFAULT_CONNECT_TIMEOUT, RedisPublisher};

use crate::tail::config::{LineHandlerKind, MonitorSpec, SendHandlerKind};
use crate::tail::error::Result;

/// Transforms a raw line before it is sent.
pub trait LineHandler {
    fn transform(&mut self, line: &str) -> Result<String>;
}

/// Delivers a transformed line to a sink.
pub trait SendHandler {
    fn send(&mut self, message: &str) -> Result<()>;
}

/// Builds the handlers of a newly registered file.
pub trait HandlerFactory {
    fn line_handler(&self, spec: &MonitorSpec) -> Result<Box<dyn LineHandler + Send>>;

    fn send_handler(&self, spec: &MonitorSpec) -> Result<Box<dyn SendHandler + Send>>;
}

/// Production handlers: stdout echo, nginx summary and redis publishing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandlers;

impl HandlerFactory for DefaultHandlers {
    fn line_handler(&self, spec: &MonitorSpec) -> Result<Box<dyn LineHandler + Send>> {
        Ok(match spec.line_handler {
            LineHandlerKind::Raw => Box::new(RawLineHandler::stdout()),
            LineHandlerKind::NginxAccessLog => Box::new(NginxAccessLineHandler::new()),
        })
    }

    fn send_handler(&self, spec: &MonitorSpec) -> Result<Box<dyn SendHandler + Send>> {
        match spec.send_handler {
            SendHandlerKind::PubSubPublish => {
                let mut publisher = RedisPublisher::new(&spec.sink)?;
                publisher.try_connect();
                Ok(Box::new(publisher))
            }
        }
    }
}
