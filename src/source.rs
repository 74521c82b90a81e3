//! Transcript sources
//!
//! A transcript source is whatever captures the web application's response
//! bodies (browser network interception, a saved file, a test script) and
//! hands them over chunk by chunk. The driver in this module owns all
//! waiting: it pulls chunks, honours cancellation and the idle timeout, and
//! finalizes the reconstruction on every exit path.

mod file;
#[cfg(test)]
pub(crate) mod testing;

pub use file::FileSource;

use crate::config::StreamConfig;
use crate::parser::{Delta, RawChunk, Reconstruction, StreamingResponseReconstructor};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transcript source failed: {0}")]
    Failed(String),

    #[error("failed to read transcript: {0}")]
    Io(#[from] std::io::Error),
}

/// Producer of raw chunks in arrival order
#[async_trait]
pub trait TranscriptSource: Send {
    /// Next chunk, or `Ok(None)` once the stream has ended
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError>;
}

#[async_trait]
impl<T: TranscriptSource + ?Sized> TranscriptSource for Box<T> {
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        (**self).next_chunk().await
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// Chunks already in memory
#[derive(Debug, Default)]
pub struct VecSource {
    chunks: VecDeque<RawChunk>,
}

impl VecSource {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<RawChunk>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TranscriptSource for VecSource {
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        Ok(self.chunks.pop_front())
    }
}

/// Receiving end of a chunk channel. Dropping every sender ends the stream.
pub type ChannelSource = StreamSource<ReceiverStream<Result<RawChunk, SourceError>>>;

/// Bounded channel whose receiver is a transcript source
pub fn channel(capacity: usize) -> (mpsc::Sender<Result<RawChunk, SourceError>>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, StreamSource::new(ReceiverStream::new(rx)))
}

/// Any stream of chunk results
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = Result<RawChunk, SourceError>> + Send + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> TranscriptSource for StreamSource<S>
where
    S: Stream<Item = Result<RawChunk, SourceError>> + Send + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        self.inner.next().await.transpose()
    }
}

/// Logging wrapper for transcript sources
pub struct LoggingSource<S> {
    inner: S,
    label: String,
    chunks: usize,
    bytes: usize,
    started: Instant,
}

impl<S: TranscriptSource> LoggingSource<S> {
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            chunks: 0,
            bytes: 0,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl<S: TranscriptSource> TranscriptSource for LoggingSource<S> {
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        let result = self.inner.next_chunk().await;
        let elapsed = self.started.elapsed();

        match &result {
            Ok(Some(chunk)) => {
                self.chunks += 1;
                self.bytes += chunk.len();
                tracing::trace!(
                    source = %self.label,
                    chunk = self.chunks,
                    bytes = chunk.len(),
                    "Chunk delivered"
                );
            }
            Ok(None) => {
                tracing::info!(
                    source = %self.label,
                    chunks = self.chunks,
                    bytes = self.bytes,
                    duration_ms = %elapsed.as_millis(),
                    "Transcript source ended"
                );
            }
            Err(e) => {
                tracing::error!(
                    source = %self.label,
                    chunks = self.chunks,
                    duration_ms = %elapsed.as_millis(),
                    error = %e,
                    "Transcript source failed"
                );
            }
        }

        result
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Pull chunks from `source` until the reply completes, the source ends,
/// fails, goes idle past `config.idle_timeout`, or `cancel` fires. A partial
/// reply is returned on every path.
pub async fn reconstruct<S>(
    source: &mut S,
    config: &StreamConfig,
    cancel: &CancellationToken,
) -> Reconstruction
where
    S: TranscriptSource + ?Sized,
{
    reconstruct_with(source, config, cancel, |_| {}).await
}

/// Like [`reconstruct`], calling `on_delta` with each fragment as it is appended
pub async fn reconstruct_with<S, F>(
    source: &mut S,
    config: &StreamConfig,
    cancel: &CancellationToken,
    mut on_delta: F,
) -> Reconstruction
where
    S: TranscriptSource + ?Sized,
    F: FnMut(&Delta),
{
    let mut reconstructor = StreamingResponseReconstructor::new();

    loop {
        let next = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::info!("Reconstruction cancelled");
                return reconstructor.interrupt("cancelled");
            }

            next = next_chunk_within(source, config) => next,
        };

        match next {
            Ok(Some(chunk)) => {
                for delta in reconstructor.push(chunk) {
                    on_delta(&delta);
                }
                if reconstructor.is_closed() {
                    return reconstructor.finish();
                }
            }
            Ok(None) => return reconstructor.finish(),
            Err(Pull::Idle) => {
                let reason = config.idle_timeout.map_or_else(
                    || "idle".to_string(),
                    |timeout| format!("no data for {}s", timeout.as_secs()),
                );
                tracing::warn!(%reason, bytes = reconstructor.text().len(), "Transcript source went idle");
                return reconstructor.interrupt(reason);
            }
            Err(Pull::Failed(err)) => {
                tracing::warn!(error = %err, "Transcript source failed");
                return reconstructor.interrupt(err.to_string());
            }
        }
    }
}

enum Pull {
    Idle,
    Failed(SourceError),
}

async fn next_chunk_within<S>(
    source: &mut S,
    config: &StreamConfig,
) -> Result<Option<RawChunk>, Pull>
where
    S: TranscriptSource + ?Sized,
{
    let next = match config.idle_timeout {
        Some(timeout) => tokio::time::timeout(timeout, source.next_chunk())
            .await
            .map_err(|_| Pull::Idle)?,
        None => source.next_chunk().await,
    };
    next.map_err(Pull::Failed)
}
