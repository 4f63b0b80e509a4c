/*!
 * Incremental decoder for newline-delimited JSON envelopes.
 *
 * Chunks may end in the middle of a line or of a UTF-8 sequence. Lines that
 * do not parse yet are kept and joined with the following ones, since a
 * service may break a long object over several lines.
 */

use bytes::Bytes;
use log::{debug, warn};
use serde_json::Value;

use super::StreamEnvelope;

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    /// Bytes after the last newline
    buffer: Vec<u8>,

    /// Lines that did not parse on their own yet
    pending: String,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the envelopes it completes
    pub fn push(&mut self, chunk: &Bytes) -> Vec<StreamEnvelope> {
        self.buffer.extend_from_slice(chunk);

        let mut envelopes = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(envelope) = self.feed_line(line.trim()) {
                envelopes.push(envelope);
            }
        }
        envelopes
    }

    /// Flush whatever is left once the stream ends
    pub fn finish(&mut self) -> Vec<StreamEnvelope> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let envelope = self.feed_line(rest.trim());
        if !self.pending.is_empty() {
            warn!("Stream ended inside an incomplete line ({} bytes dropped)", self.pending.len());
            self.pending.clear();
        }
        envelope.into_iter().collect()
    }

    fn feed_line(&mut self, line: &str) -> Option<StreamEnvelope> {
        if line.is_empty() {
            return None;
        }

        if !self.pending.is_empty() {
            let joined = format!("{}\n{}", self.pending, line);
            if let Ok(value) = serde_json::from_str::<Value>(&joined) {
                self.pending.clear();
                return to_envelope(value);
            }
            if let Ok(value) = serde_json::from_str::<Value>(line) {
                warn!("Dropping unparseable stream data: {}", self.pending);
                self.pending.clear();
                return to_envelope(value);
            }
            self.pending = joined;
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => to_envelope(value),
            Err(e) => {
                debug!("Incomplete stream line, waiting for more ({})", e);
                self.pending = line.to_string();
                None
            }
        }
    }
}

fn to_envelope(value: Value) -> Option<StreamEnvelope> {
    match serde_json::from_value::<StreamEnvelope>(value) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!("Ignoring unknown stream envelope: {}", e);
            None
        }
    }
}
