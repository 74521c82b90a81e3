//! Non-fatal parse diagnostics
//!
//! Nothing in here aborts a reconstruction. Errors are collected next to the
//! partial response so callers can surface them.

use serde::Serialize;
use thiserror::Error;

/// Maximum bytes of offending input kept inside a diagnostic.
const MAX_FRAGMENT_BYTES: usize = 512;

/// Diagnostic produced while splitting, decoding or accumulating a stream
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ParseError {
    #[error("split error ({kind}): {fragment}")]
    Split {
        kind: SplitErrorKind,
        fragment: String,
    },

    #[error("invalid JSON object: {message}")]
    Decode { object: String, message: String },

    #[error("unexpected {kind} event ({reason})")]
    UnexpectedEvent {
        kind: String,
        reason: UnexpectedReason,
    },
}

impl ParseError {
    pub fn unterminated(fragment: &str) -> Self {
        Self::Split {
            kind: SplitErrorKind::Unterminated,
            fragment: truncate_fragment(fragment),
        }
    }

    pub fn stray_input(fragment: &str) -> Self {
        Self::Split {
            kind: SplitErrorKind::StrayInput,
            fragment: truncate_fragment(fragment),
        }
    }

    pub fn decode(object: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            object: truncate_fragment(object),
            message: err.to_string(),
        }
    }

    pub fn late_event(kind: impl Into<String>) -> Self {
        Self::UnexpectedEvent {
            kind: kind.into(),
            reason: UnexpectedReason::LateEvent,
        }
    }

    pub fn unhandled_event(kind: impl Into<String>) -> Self {
        Self::UnexpectedEvent {
            kind: kind.into(),
            reason: UnexpectedReason::Unhandled,
        }
    }

    /// Short classification used as a structured log field
    pub fn category(&self) -> &'static str {
        match self {
            Self::Split { .. } => "split",
            Self::Decode { .. } => "decode",
            Self::UnexpectedEvent { .. } => "unexpected_event",
        }
    }
}

/// Why the splitter could not produce an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitErrorKind {
    /// An object was opened but never closed before end of transcript
    Unterminated,
    /// Non-whitespace input found outside any object
    StrayInput,
}

impl std::fmt::Display for SplitErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unterminated => f.write_str("unterminated object"),
            Self::StrayInput => f.write_str("stray input"),
        }
    }
}

/// Why an event was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnexpectedReason {
    /// Arrived after the response was closed
    LateEvent,
    /// Recognized shape that the accumulator does not act on
    Unhandled,
}

impl std::fmt::Display for UnexpectedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LateEvent => f.write_str("after close"),
            Self::Unhandled => f.write_str("unhandled"),
        }
    }
}

/// Truncate at a UTF-8 boundary, appending `…` when shortened.
fn truncate_fragment(s: &str) -> String {
    if s.len() <= MAX_FRAGMENT_BYTES {
        return s.to_string();
    }
    let kept: String = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= MAX_FRAGMENT_BYTES)
        .map(|(_, c)| c)
        .collect();
    format!("{kept}…")
}
