//! Response accumulator
//!
//! Two states: `Open` while events are accepted, `Closed` once the reply is
//! final. Transitions are computed by a pure function; `Accumulator` only
//! applies the result to the collected text and metadata.

use super::error::ParseError;
use super::types::{Metadata, ParsedEvent, ReconstructedResponse, Termination};
use serde::Serialize;

/// Accumulator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Closed(Termination),
}

impl StreamState {
    pub fn is_open(&self) -> bool {
        matches!(self, StreamState::Open)
    }
}

/// Text appended by one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub text: String,
    pub thinking: bool,
}

/// What a single event does to the accumulator
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub append: Option<Delta>,
    pub merge: Metadata,
    pub close: Option<Termination>,
    pub diagnostic: Option<ParseError>,
}

impl Transition {
    fn append(mut self, text: String, thinking: bool) -> Self {
        self.append = Some(Delta { text, thinking });
        self
    }

    fn merge(mut self, metadata: Metadata) -> Self {
        self.merge = metadata;
        self
    }

    fn close(mut self, termination: Termination) -> Self {
        self.close = Some(termination);
        self
    }

    fn diagnostic(mut self, error: ParseError) -> Self {
        self.diagnostic = Some(error);
        self
    }
}

/// Pure transition function: no I/O, same inputs give the same output
pub fn transition(state: &StreamState, event: ParsedEvent) -> Transition {
    match (state, event) {
        (StreamState::Closed(_), event) => {
            Transition::default().diagnostic(ParseError::late_event(event.kind()))
        }

        (
            StreamState::Open,
            ParsedEvent::Token {
                fragment,
                thinking,
                metadata,
            },
        ) => Transition::default()
            .append(fragment, thinking)
            .merge(metadata),

        (StreamState::Open, ParsedEvent::Metadata(metadata)) => {
            Transition::default().merge(metadata)
        }

        (
            StreamState::Open,
            ParsedEvent::Completion {
                fragment,
                thinking,
                metadata,
            },
        ) => {
            let transition = Transition::default()
                .merge(metadata)
                .close(Termination::Completed);
            match fragment {
                Some(text) => transition.append(text, thinking),
                None => transition,
            }
        }

        (StreamState::Open, ParsedEvent::Unknown { kind: Some(kind) }) => {
            Transition::default().diagnostic(ParseError::unhandled_event(kind))
        }

        (StreamState::Open, ParsedEvent::Unknown { kind: None }) => Transition::default(),
    }
}

/// Collected reply state for one request
#[derive(Debug)]
pub struct Accumulator {
    state: StreamState,
    text: String,
    thinking_text: String,
    metadata: Metadata,
    token_count: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            state: StreamState::Open,
            text: String::new(),
            thinking_text: String::new(),
            metadata: Metadata::new(),
            token_count: 0,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Apply one event, returning the appended text (if any) and a
    /// diagnostic for events that were ignored.
    pub fn apply(&mut self, event: ParsedEvent) -> (Option<Delta>, Option<ParseError>) {
        let kind = event.kind().to_string();
        let Transition {
            append,
            merge,
            close,
            diagnostic,
        } = transition(&self.state, event);

        if let Some(delta) = &append {
            self.text.push_str(&delta.text);
            if delta.thinking {
                self.thinking_text.push_str(&delta.text);
            }
            self.token_count += 1;
        }
        self.metadata.extend(merge);

        if let Some(termination) = close {
            tracing::debug!(
                kind = %kind,
                tokens = self.token_count,
                bytes = self.text.len(),
                "Response completed"
            );
            self.state = StreamState::Closed(termination);
        }

        (append, diagnostic)
    }

    /// The source has no more chunks. No-op once closed.
    pub fn end_of_input(&mut self) {
        if self.is_open() {
            tracing::debug!(
                tokens = self.token_count,
                "Input ended without a completion event"
            );
            self.state = StreamState::Closed(Termination::EndOfStream);
        }
    }

    /// The source failed or was cancelled. No-op once closed.
    pub fn interrupt(&mut self, reason: impl Into<String>) {
        if self.is_open() {
            let reason = reason.into();
            tracing::debug!(tokens = self.token_count, %reason, "Response interrupted");
            self.state = StreamState::Closed(Termination::Interrupted { reason });
        }
    }

    /// Finalize into an immutable response. Still-open input counts as end of stream.
    pub fn into_response(mut self) -> ReconstructedResponse {
        self.end_of_input();
        let termination = match self.state {
            StreamState::Closed(termination) => termination,
            StreamState::Open => Termination::EndOfStream,
        };
        ReconstructedResponse {
            is_complete: termination == Termination::Completed,
            text: self.text,
            metadata: self.metadata,
            thinking_text: self.thinking_text,
            token_count: self.token_count,
            termination,
        }
    }
}
