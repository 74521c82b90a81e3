//! Scripted transcript source for tests

use super::{SourceError, TranscriptSource};
use crate::parser::RawChunk;
use async_trait::async_trait;
use std::collections::VecDeque;

enum Step {
    Chunk(RawChunk),
    Fail(String),
    Stall,
}

/// Replays a fixed script of chunks, failures and stalls
#[derive(Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk(mut self, chunk: impl Into<RawChunk>) -> Self {
        self.steps.push_back(Step::Chunk(chunk.into()));
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.steps.push_back(Step::Fail(message.into()));
        self
    }

    /// Never yield again
    pub fn stall(mut self) -> Self {
        self.steps.push_back(Step::Stall);
        self
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

#[async_trait]
impl TranscriptSource for ScriptedSource {
    async fn next_chunk(&mut self) -> Result<Option<RawChunk>, SourceError> {
        match self.steps.pop_front() {
            Some(Step::Chunk(chunk)) => Ok(Some(chunk)),
            Some(Step::Fail(message)) => Err(SourceError::Failed(message)),
            Some(Step::Stall) => std::future::pending().await,
            None => Ok(None),
        }
    }
}
