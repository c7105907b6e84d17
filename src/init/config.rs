// SPDX-License-Identifier: Apache-2.0

//! JSON configuration document listing the files to monitor.
//!
//! ```json
//! { "Monitor": [
//!   { "File": "/var/log/nginx/access.log", "Linehandler": "nginx", "Sendhandler": "redis",
//!     "Redis": { "Addr": "127.0.0.1:6379", "Password": "", "Db": 0, "Channel": "nginx" } }
//! ] }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::tail::{self, LineHandlerKind, MonitorSpec, SendHandlerKind, SinkConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to open config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(rename = "Monitor", alias = "monitor", default)]
    pub monitor: Vec<MonitorConfig>,
}

/// One monitored file as written in the document
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MonitorConfig {
    #[serde(rename = "File", alias = "file")]
    pub file: String,
    #[serde(rename = "Linehandler", alias = "linehandler")]
    pub line_handler: String,
    #[serde(rename = "Sendhandler", alias = "sendhandler")]
    pub send_handler: String,
    #[serde(rename = "Redis", alias = "redis", default)]
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedisConfig {
    #[serde(rename = "Addr", alias = "addr")]
    pub addr: String,
    #[serde(rename = "Password", alias = "password")]
    pub password: String,
    #[serde(rename = "Db", alias = "db")]
    pub db: i64,
    #[serde(rename = "Channel", alias = "channel")]
    pub channel: String,
}

/// Read and parse the configuration document at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

impl Config {
    /// Resolve every monitor, failing on the first unknown handler identifier.
    pub fn monitor_specs(&self) -> tail::Result<Vec<MonitorSpec>> {
        self.monitor.iter().map(MonitorConfig::build_spec).collect()
    }

    /// Log the resolved configuration, one record per monitor.
    pub fn log_run_config(&self) {
        info!(monitors = self.monitor.len(), "Using configuration");
        for m in &self.monitor {
            let password = if m.redis.password.is_empty() {
                ""
            } else {
                "<redacted>"
            };
            info!(
                file = m.file.as_str(),
                line_handler = m.line_handler.as_str(),
                send_handler = m.send_handler.as_str(),
                redis_addr = m.redis.addr.as_str(),
                redis_password = password,
                redis_db = m.redis.db,
                redis_channel = m.redis.channel.as_str(),
                "Monitor"
            );
        }
    }
}

impl MonitorConfig {
    pub fn build_spec(&self) -> tail::Result<MonitorSpec> {
        let line_handler: LineHandlerKind = self.line_handler.parse()?;
        let send_handler: SendHandlerKind = self.send_handler.parse()?;

        if self.file.is_empty() {
            return Err(tail::Error::Config(
                "monitor entry has an empty File".to_string(),
            ));
        }

        Ok(MonitorSpec {
            path: std::path::absolute(&self.file)?,
            line_handler,
            send_handler,
            sink: SinkConfig {
                address: self.redis.addr.clone(),
                credential: self.redis.password.clone(),
                namespace_index: self.redis.db,
                channel: self.redis.channel.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOCUMENT: &str = r#"{
        "Monitor": [
            {
                "File": "/var/log/nginx/access.log",
                "Linehandler": "nginx",
                "Sendhandler": "redis",
                "Redis": { "Addr": "127.0.0.1:6379", "Password": "secret", "Db": 2, "Channel": "nginx" }
            },
            {
                "File": "/var/log/app.log",
                "Linehandler": "raw",
                "Sendhandler": "redis",
                "Redis": { "Addr": "10.0.0.5:6380", "Channel": "app" }
            }
        ]
    }"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = write_config(DOCUMENT);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.monitor.len(), 2);
        let first = &config.monitor[0];
        assert_eq!(first.file, "/var/log/nginx/access.log");
        assert_eq!(first.line_handler, "nginx");
        assert_eq!(first.redis.password, "secret");
        assert_eq!(first.redis.db, 2);

        // Missing redis fields fall back to defaults
        let second = &config.monitor[1];
        assert_eq!(second.redis.password, "");
        assert_eq!(second.redis.db, 0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_config_invalid_json() {
        let file = write_config("{ \"Monitor\": [ { \"File\": 3 } ] }");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_monitor_specs() {
        let config: Config = serde_json::from_str(DOCUMENT).unwrap();
        let specs = config.monitor_specs().unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].path, PathBuf::from("/var/log/nginx/access.log"));
        assert_eq!(specs[0].line_handler, LineHandlerKind::NginxAccessLog);
        assert_eq!(specs[0].send_handler, SendHandlerKind::PubSubPublish);
        assert_eq!(specs[0].sink.namespace_index, 2);
        assert_eq!(specs[1].line_handler, LineHandlerKind::Raw);
        assert_eq!(specs[1].sink.channel, "app");
    }

    #[test]
    fn test_monitor_specs_unknown_handler() {
        let mut config: Config = serde_json::from_str(DOCUMENT).unwrap();
        config.monitor[1].send_handler = "kafka".to_string();

        let err = config.monitor_specs().unwrap_err();
        assert!(err.is_unknown_handler());
        assert!(matches!(err, tail::Error::UnknownSendHandler(ref id) if id == "kafka"));
    }

    #[test]
    fn test_relative_paths_are_made_absolute() {
        let monitor = MonitorConfig {
            file: "logs/app.log".to_string(),
            line_handler: "raw".to_string(),
            send_handler: "redis".to_string(),
            redis: RedisConfig::default(),
        };
        let spec = monitor.build_spec().unwrap();
        assert!(spec.path.is_absolute());
        assert!(spec.path.ends_with("logs/app.log"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let monitor = MonitorConfig {
            file: String::new(),
            line_handler: "raw".to_string(),
            send_handler: "redis".to_string(),
            redis: RedisConfig::default(),
        };
        assert!(matches!(monitor.build_spec(), Err(tail::Error::Config(_))));
    }
}
