// SPDX-License-Identifier: Apache-2.0

//! Per-file tail state: the open descriptor, the consumed offset and the
//! handlers every complete line is routed through.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::tail::config::{MonitorSpec, StartAt, TailConfig};
use crate::tail::error::{Error, Result};
use crate::tail::handler::{LineHandler, SendHandler};

/// Line separator byte
pub const LINE_SEP: u8 = b'\n';

/// Tail state of a single monitored path.
///
/// `offset` only ever covers complete lines. Bytes of a trailing incomplete
/// line are kept in `partial` and are not re-read from disk; once its
/// separator arrives the whole line is dispatched and `offset` advances past it.
pub struct TailState {
    spec: MonitorSpec,
    file: Option<File>,
    /// Bytes of complete lines consumed from the current descriptor
    offset: u64,
    /// Bytes read from the current descriptor
    position: u64,
    /// Incomplete trailing line, capped at `max_line_size`
    partial: Vec<u8>,
    /// Length of the incomplete line including bytes dropped past the cap
    pending_len: u64,
    chunk_size: usize,
    max_line_size: usize,
    line_handler: Box<dyn LineHandler + Send>,
    send_handler: Box<dyn SendHandler + Send>,
}

impl TailState {
    pub fn new(
        spec: MonitorSpec,
        mut file: File,
        config: &TailConfig,
        line_handler: Box<dyn LineHandler + Send>,
        send_handler: Box<dyn SendHandler + Send>,
    ) -> Result<Self> {
        let offset = match config.start_at {
            StartAt::Beginning => 0,
            StartAt::End => file.seek(SeekFrom::End(0))?,
        };

        Ok(Self {
            spec,
            file: Some(file),
            offset,
            position: offset,
            partial: Vec::new(),
            pending_len: 0,
            chunk_size: config.chunk_size.max(1),
            max_line_size: config.max_line_size.max(1),
            line_handler,
            send_handler,
        })
    }

    pub fn path(&self) -> &Path {
        &self.spec.path
    }

    pub fn spec(&self) -> &MonitorSpec {
        &self.spec
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn descriptor(&self) -> Option<&File> {
        self.file.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Swap in the descriptor of a recreated file; reading restarts at 0.
    pub fn replace_descriptor(&mut self, file: File) {
        self.file = Some(file);
        self.reset();
    }

    /// Close the descriptor, keeping the handlers.
    pub fn close(&mut self) {
        self.file = None;
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.position = 0;
        self.partial.clear();
        self.pending_len = 0;
    }

    /// Read everything appended since the last pass and dispatch each complete
    /// line, in order. Returns the number of complete lines consumed.
    ///
    /// Reaching the current end of the file ends the pass. Any other read
    /// failure is returned; the descriptor stays open for the next pass.
    pub fn read_and_dispatch(&mut self) -> Result<usize> {
        let Some(mut file) = self.file.take() else {
            return Ok(0);
        };
        let result = self.drain(&mut file);
        self.file = Some(file);
        result
    }

    fn drain(&mut self, file: &mut File) -> Result<usize> {
        self.check_truncation(file)?;

        let mut chunk = vec![0u8; self.chunk_size];
        let mut lines = 0;

        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            self.position += n as u64;

            let mut begin = 0;
            for (i, &byte) in chunk[..n].iter().enumerate() {
                if byte == LINE_SEP {
                    self.append_partial(&chunk[begin..i]);
                    self.complete_line();
                    lines += 1;
                    begin = i + 1;
                }
            }
            self.append_partial(&chunk[begin..n]);
        }

        Ok(lines)
    }

    /// Detect copy-truncate rotation: the file shrank below what was read.
    fn check_truncation(&mut self, file: &mut File) -> Result<()> {
        let len = file.metadata()?.len();
        if len < self.position {
            warn!(
                path = %self.path().display(),
                previous_offset = self.offset,
                file_len = len,
                "File truncated, restarting from the beginning"
            );
            file.seek(SeekFrom::Start(0))?;
            self.reset();
        }
        Ok(())
    }

    fn append_partial(&mut self, bytes: &[u8]) {
        self.pending_len += bytes.len() as u64;
        let room = self.max_line_size.saturating_sub(self.partial.len());
        let take = bytes.len().min(room);
        self.partial.extend_from_slice(&bytes[..take]);
    }

    fn complete_line(&mut self) {
        let consumed = self.pending_len + 1;
        if self.pending_len > self.partial.len() as u64 {
            warn!(
                path = %self.path().display(),
                line_len = self.pending_len,
                max_line_size = self.max_line_size,
                "Line exceeds maximum size, truncating"
            );
        }

        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        self.pending_len = 0;
        self.offset += consumed;

        self.dispatch(&line);
    }

    /// Route one line through the line and send handlers. Failures are
    /// contained to this line.
    fn dispatch(&mut self, line: &str) {
        let message = match self.line_handler.transform(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    path = %self.path().display(),
                    "Skipping line: {}", e
                );
                return;
            }
        };

        if let Err(e) = self.send_handler.send(&message) {
            warn!(
                path = %self.path().display(),
                channel = self.spec.sink.channel.as_str(),
                "Dropped message: {}", e
            );
            return;
        }
        debug!(path = %self.path().display(), offset = self.offset, "Line sent");
    }
}
