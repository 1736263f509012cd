//! Incremental `text/event-stream` decoder.
//!
//! The push channel is a Server-Sent Events stream. Network reads arrive in
//! arbitrary chunks, so lines are buffered until complete and events are only
//! emitted at the blank line that terminates them. Only `data` fields matter
//! to this protocol; `event`, `id` and `retry` fields and comment lines are
//! skipped.
//!
//! A line or an event payload longer than the decoder's limit is discarded
//! together with the event it belongs to, so a misbehaving server cannot make
//! the buffers grow without bound.

use bytes::{Buf, BytesMut};

/// Default cap on one line and on one event's joined `data`.
pub const MAX_EVENT_BYTES: usize = 64 * 1024;

/// Buffers raw stream bytes and yields complete event payloads.
#[derive(Debug)]
pub struct SseDecoder {
    buf: BytesMut,
    data: Option<String>,
    /// Previous chunk ended in `\r`; a leading `\n` in the next one belongs to
    /// the same line terminator.
    pending_cr: bool,
    limit: usize,
    /// Rest of an oversized line is still arriving.
    skip_line: bool,
    /// Current event lost data; drop it at the blank line.
    poisoned: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_EVENT_BYTES)
    }
}

impl SseDecoder {
    /// Create an empty decoder with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty decoder that drops lines and events over `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            data: None,
            pending_cr: false,
            limit,
            skip_line: false,
            poisoned: false,
        }
    }

    /// Feed a chunk, returning the `data` payloads of every event completed by
    /// it. Multi-line data is joined with `\n`.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<String> {
        if self.pending_cr && !chunk.is_empty() {
            self.pending_cr = false;
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
        }
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let line = self.buf.split_to(pos);
            let terminator = self.buf[0];
            self.buf.advance(1);

            if terminator == b'\r' {
                match self.buf.first() {
                    Some(b'\n') => self.buf.advance(1),
                    None => self.pending_cr = true,
                    Some(_) => {},
                }
            }

            if std::mem::take(&mut self.skip_line) {
                continue;
            }
            if line.len() > self.limit {
                self.poison(line.len());
                continue;
            }
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        if self.buf.len() > self.limit {
            if !self.skip_line {
                self.poison(self.buf.len());
            }
            self.buf.clear();
            self.skip_line = true;
        }
        events
    }

    /// Bytes held back waiting for a line terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn poison(&mut self, len: usize) {
        tracing::warn!(len, limit = self.limit, "dropping oversized push event");
        self.data = None;
        self.poisoned = true;
    }

    fn process_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            let data = self.data.take();
            return if std::mem::take(&mut self.poisoned) { None } else { data };
        }
        if line[0] == b':' || self.poisoned {
            return None;
        }

        let line = String::from_utf8_lossy(line);
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };

        if field == "data" {
            let joined = self.data.as_ref().map_or(0, |data| data.len() + 1) + value.len();
            if joined > self.limit {
                self.poison(joined);
                return None;
            }
            match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                },
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}
