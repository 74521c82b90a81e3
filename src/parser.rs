//! Streaming response reconstruction
//!
//! Rebuilds an assistant reply from the concatenated JSON objects streamed
//! by the chat web application. Three stages run on every chunk:
//! splitter (object boundaries), decoder (event kind) and accumulator
//! (reply state).
//!
//! The reconstructor is synchronous and does no I/O. One instance serves
//! exactly one response stream.

pub mod accumulator;
pub mod decoder;
mod error;
pub mod splitter;
mod types;

#[cfg(test)]
mod proptests;

pub use accumulator::{Accumulator, Delta, StreamState};
pub use error::{ParseError, SplitErrorKind, UnexpectedReason};
pub use splitter::{ChunkSplitter, Split};
pub use types::*;

use serde::Serialize;

/// Final result of one reconstruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconstruction {
    pub response: ReconstructedResponse,
    /// Non-fatal diagnostics, in the order they were hit
    pub errors: Vec<ParseError>,
}

impl Reconstruction {
    /// Completed with no diagnostics at all
    pub fn is_clean(&self) -> bool {
        self.response.is_complete && self.errors.is_empty()
    }
}

/// Rebuilds one assistant reply from raw chunks delivered in arrival order
#[derive(Debug, Default)]
pub struct StreamingResponseReconstructor {
    splitter: ChunkSplitter,
    accumulator: Accumulator,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last byte chunk
    utf8_carry: Vec<u8>,
    errors: Vec<ParseError>,
    chunks: usize,
}

impl StreamingResponseReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the text appended by it
    pub fn push(&mut self, chunk: impl Into<RawChunk>) -> Vec<Delta> {
        match chunk.into() {
            RawChunk::Text(text) => self.push_str(&text),
            RawChunk::Bytes(bytes) => self.push_bytes(&bytes),
        }
    }

    pub fn push_str(&mut self, text: &str) -> Vec<Delta> {
        let mut deltas = self.flush_utf8_carry();
        deltas.extend(self.feed(text));
        deltas
    }

    /// Feed raw bytes. A UTF-8 sequence cut by the chunk boundary is held
    /// back until the next chunk; invalid sequences become U+FFFD.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Delta> {
        let mut pending = std::mem::take(&mut self.utf8_carry);
        pending.extend_from_slice(bytes);
        let text = take_utf8_prefix(&mut pending);
        self.utf8_carry = pending;
        self.feed(&text)
    }

    pub fn is_closed(&self) -> bool {
        !self.accumulator.is_open()
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        self.accumulator.text()
    }

    pub fn metadata(&self) -> &Metadata {
        self.accumulator.metadata()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Input received but not yet part of a complete object
    pub fn remainder(&self) -> &str {
        self.splitter.remainder()
    }

    /// The source signalled end of stream
    pub fn finish(mut self) -> Reconstruction {
        self.drain_pending();
        self.accumulator.end_of_input();
        self.into_reconstruction()
    }

    /// The source failed or was cancelled. Whatever was parsed is kept.
    pub fn interrupt(mut self, reason: impl Into<String>) -> Reconstruction {
        self.drain_pending();
        self.accumulator.interrupt(reason);
        self.into_reconstruction()
    }

    fn into_reconstruction(self) -> Reconstruction {
        let response = self.accumulator.into_response();
        tracing::debug!(
            chunks = self.chunks,
            tokens = response.token_count,
            complete = response.is_complete,
            errors = self.errors.len(),
            "Reconstruction finished"
        );
        Reconstruction {
            response,
            errors: self.errors,
        }
    }

    fn feed(&mut self, text: &str) -> Vec<Delta> {
        self.chunks += 1;
        tracing::trace!(chunk = self.chunks, bytes = text.len(), "Chunk received");

        self.splitter.push(text);
        let mut deltas = Vec::new();
        while let Some(split) = self.splitter.next_split() {
            if let Some(delta) = self.handle_split(split) {
                deltas.push(delta);
            }
        }
        deltas
    }

    fn drain_pending(&mut self) {
        self.flush_utf8_carry();
        for split in self.splitter.finish() {
            self.handle_split(split);
        }
    }

    /// An incomplete UTF-8 sequence that is never completed decodes to U+FFFD
    fn flush_utf8_carry(&mut self) -> Vec<Delta> {
        if self.utf8_carry.is_empty() {
            return Vec::new();
        }
        let carry = std::mem::take(&mut self.utf8_carry);
        let text = String::from_utf8_lossy(&carry).into_owned();
        self.feed(&text)
    }

    fn handle_split(&mut self, split: Split) -> Option<Delta> {
        let object = match split {
            Split::Object(object) => object,
            Split::Invalid(err) => {
                self.record(err);
                return None;
            }
        };

        let event = match decoder::decode(&object) {
            Ok(event) => event,
            Err(err) => {
                self.record(err);
                return None;
            }
        };

        let (delta, diagnostic) = self.accumulator.apply(event);
        if let Some(err) = diagnostic {
            self.record(err);
        }
        delta
    }

    fn record(&mut self, err: ParseError) {
        match &err {
            ParseError::UnexpectedEvent { .. } => {
                tracing::debug!(category = err.category(), error = %err, "Event ignored");
            }
            _ => {
                tracing::warn!(category = err.category(), error = %err, "Non-fatal parse error");
            }
        }
        self.errors.push(err);
    }
}

/// Decode the longest valid UTF-8 prefix of `buf`, leaving an incomplete
/// trailing sequence in place.
fn take_utf8_prefix(buf: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(buf) {
            Ok(text) => {
                out.push_str(text);
                buf.clear();
                return out;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buf[..valid]));
                match err.error_len() {
                    Some(invalid) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        buf.drain(..valid + invalid);
                    }
                    None => {
                        buf.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

/// Reconstruct from an in-memory sequence of chunks
pub fn reconstruct_chunks<I, C>(chunks: I) -> Reconstruction
where
    I: IntoIterator<Item = C>,
    C: Into<RawChunk>,
{
    let mut reconstructor = StreamingResponseReconstructor::new();
    for chunk in chunks {
        reconstructor.push(chunk);
    }
    reconstructor.finish()
}

/// Reconstruct from a complete captured response body
pub fn parse_transcript(transcript: &str) -> Reconstruction {
    let mut reconstructor = StreamingResponseReconstructor::new();
    reconstructor.push_str(transcript);
    reconstructor.finish()
}
