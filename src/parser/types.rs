//! Common types for stream reconstruction

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata fields, keyed by their name on the wire
pub type Metadata = BTreeMap<String, Value>;

/// Raw chunk handed over by a transcript source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawChunk {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawChunk {
    pub fn len(&self) -> usize {
        match self {
            RawChunk::Text(text) => text.len(),
            RawChunk::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for RawChunk {
    fn from(text: String) -> Self {
        RawChunk::Text(text)
    }
}

impl From<&str> for RawChunk {
    fn from(text: &str) -> Self {
        RawChunk::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RawChunk {
    fn from(bytes: Vec<u8>) -> Self {
        RawChunk::Bytes(bytes)
    }
}

/// One decoded object from the stream
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Incremental reply text
    Token {
        fragment: String,
        /// Reasoning output rather than the answer proper
        thinking: bool,
        /// Fields carried alongside the token (e.g. `responseId`)
        metadata: Metadata,
    },
    Metadata(Metadata),
    /// End of the reply, optionally carrying its last fragment
    Completion {
        fragment: Option<String>,
        /// Whether `fragment` is reasoning output
        thinking: bool,
        metadata: Metadata,
    },
    /// Unrecognized or irrelevant object. `kind` is set when the object
    /// carried a type tag we know about but do not act on.
    Unknown { kind: Option<String> },
}

impl ParsedEvent {
    pub fn token(fragment: impl Into<String>) -> Self {
        ParsedEvent::Token {
            fragment: fragment.into(),
            thinking: false,
            metadata: Metadata::new(),
        }
    }

    pub fn completion() -> Self {
        ParsedEvent::Completion {
            fragment: None,
            thinking: false,
            metadata: Metadata::new(),
        }
    }

    /// Event kind name used in logs and diagnostics
    pub fn kind(&self) -> &str {
        match self {
            ParsedEvent::Token { .. } => "token",
            ParsedEvent::Metadata(_) => "metadata",
            ParsedEvent::Completion { .. } => "completion",
            ParsedEvent::Unknown { kind: Some(kind) } => kind.as_str(),
            ParsedEvent::Unknown { kind: None } => "unknown",
        }
    }
}

/// How a reconstruction ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Termination {
    /// A completion event arrived
    Completed,
    /// The source ran dry without a completion event; possibly truncated
    EndOfStream,
    /// The source failed, was cancelled or went idle
    Interrupted { reason: String },
}

/// Accumulated reply. Immutable once handed out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedResponse {
    pub text: String,
    pub is_complete: bool,
    pub metadata: Metadata,
    /// Portion of `text` that came from thinking tokens
    pub thinking_text: String,
    pub token_count: usize,
    pub termination: Termination,
}

impl ReconstructedResponse {
    pub fn response_id(&self) -> Option<&str> {
        self.metadata.get("responseId").and_then(Value::as_str)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.metadata.get("conversationId").and_then(Value::as_str)
    }
}
