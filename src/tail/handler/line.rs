// SPDX-License-Identifier: Apache-2.0

//! Line handlers applied to every complete line before it is sent.

use std::io::{self, Write};

use super::LineHandler;
use crate::tail::error::{Error, Result};

/// Minimum number of space-separated fields in an nginx access log line
pub const NGINX_MIN_FIELDS: usize = 9;

/// Field index of `[$time_local`
const NGINX_TIME_FIELD: usize = 3;

/// Field index of `$status`
const NGINX_STATUS_FIELD: usize = 8;

/// Identity transform that also echoes each line to a diagnostic writer.
pub struct RawLineHandler {
    echo: Box<dyn Write + Send>,
}

impl RawLineHandler {
    /// Echo lines to stdout.
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Echo lines to the given writer.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            echo: Box::new(writer),
        }
    }
}

impl LineHandler for RawLineHandler {
    fn transform(&mut self, line: &str) -> Result<String> {
        if let Err(e) = writeln!(self.echo, "{}", line) {
            tracing::debug!("Failed to echo raw line: {}", e);
        }
        Ok(line.to_string())
    }
}

/// Reduces an nginx access log line to its timestamp and status code.
///
/// Fields are located by position after splitting on single spaces, so the
/// layout must be the default combined format:
/// ```text
/// $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent ...
/// ```
/// Only the leading `[` of the time field is stripped.
#[derive(Debug, Default)]
pub struct NginxAccessLineHandler;

impl NginxAccessLineHandler {
    pub fn new() -> Self {
        Self
    }
}

impl LineHandler for NginxAccessLineHandler {
    fn transform(&mut self, line: &str) -> Result<String> {
        let fields: Vec<&str> = line.split(' ').collect();
        if fields.len() < NGINX_MIN_FIELDS {
            return Err(Error::MalformedLine(format!(
                "expected at least {} space-separated fields, got {}",
                NGINX_MIN_FIELDS,
                fields.len()
            )));
        }

        let time = fields[NGINX_TIME_FIELD].trim_start_matches('[');
        let code = fields[NGINX_STATUS_FIELD];
        Ok(format!("time = {}, code = {}\n", time, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that appends into a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_raw_is_identity_and_echoes_once() {
        let buf = SharedBuf::default();
        let mut handler = RawLineHandler::with_writer(buf.clone());

        assert_eq!(handler.transform("hello").unwrap(), "hello");
        assert_eq!(buf.0.lock().unwrap().as_slice(), b"hello\n");
    }

    #[test]
    fn test_nginx_combined_format() {
        let mut handler = NginxAccessLineHandler::new();
        let line = r#"192.168.1.1 - - [17/Dec/2025:10:15:32 +0000] "GET /api/users HTTP/1.1" 200 1234 "https://example.com" "Mozilla/5.0""#;

        assert_eq!(
            handler.transform(line).unwrap(),
            "time = 17/Dec/2025:10:15:32, code = 200\n"
        );
    }

    #[test]
    fn test_nginx_status_is_field_eight() {
        // Without a zone in the time field the request shifts one position
        // left, so field 8 is the body size; the trailing bracket stays
        let mut handler = NginxAccessLineHandler::new();
        let line = r#"1.2.3.4 - - [10/Oct/2021:10:00:00] "GET / HTTP/1.1" 200 512"#;

        assert_eq!(
            handler.transform(line).unwrap(),
            "time = 10/Oct/2021:10:00:00], code = 512\n"
        );
    }

    #[test]
    fn test_nginx_malformed_line() {
        let mut handler = NginxAccessLineHandler::new();

        let err = handler.transform("not an access log").unwrap_err();
        assert!(matches!(err, Error::MalformedLine(_)));

        assert!(handler.transform("").is_err());
    }

    #[test]
    fn test_nginx_exactly_min_fields() {
        let mut handler = NginxAccessLineHandler::new();
        let result = handler.transform("a b c [t d e f g 404").unwrap();
        assert_eq!(result, "time = t, code = 404\n");
    }
}
