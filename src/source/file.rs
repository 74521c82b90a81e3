//! Replay of captured response bodies from disk

use super::{SourceError, TranscriptSource};
use crate::parser::RawChunk;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Reads a saved response body in fixed-size byte chunks, so replays go
/// through the same boundary handling as live traffic.
pub struct FileSource {
    path: PathBuf,
    file: File,
    chunk_size: usize,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        tracing::debug!(path = %path.display(), chunk_size, "Opened transcript file");
        Ok(Self {
            path,
            file,
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptSource for FileSource {
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        let mut buf = vec![0u8; self.chunk_size];
        let read = self.file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some(RawChunk::Bytes(buf)))
    }
}
