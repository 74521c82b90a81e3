//! Event decoder
//!
//! The upstream stream format is undocumented and changes without notice,
//! so classification is a fixed-order table of known shapes with an
//! explicit `Unknown` fallback. Update the tables below when the live
//! stream changes; nothing else should need to move.

use super::error::ParseError;
use super::types::{Metadata, ParsedEvent};
use serde_json::{Map, Value};

type Object = Map<String, Value>;
type ShapeMatcher = fn(&Object) -> Option<ParsedEvent>;

/// Recognized shapes, tried in order. First match wins.
const SHAPES: &[(&str, ShapeMatcher)] = &[
    ("typed_completion", typed_completion),
    ("typed_token", typed_token),
    ("typed_metadata", typed_metadata),
    ("result_envelope", result_envelope),
    ("standard_response", standard_response),
    ("new_conversation", new_conversation),
    ("error_envelope", error_envelope),
];

/// `type` tag values that end a reply
pub const COMPLETION_TYPES: &[&str] = &["completion", "done", "finish"];

/// Fields carrying reply text on typed token objects
const TEXT_FIELDS: &[&str] = &["text", "token"];

/// Field names kept as metadata wherever they appear on a known shape
pub const METADATA_KEYS: &[&str] = &[
    "responseId",
    "conversationId",
    "parentResponseId",
    "title",
    "model",
    "modelName",
    "modelId",
    "createTime",
    "usage",
    "inputTokens",
    "outputTokens",
    "totalTokens",
    "webSearchResults",
    "xposts",
    "xpostIds",
    "steps",
    "fileAttachments",
    "imageAttachments",
    "generatedImageUrls",
    "followUpSuggestions",
];

/// Objects inside a reply payload that hold the final assistant message
const FINAL_MESSAGE_KEYS: &[&str] = &["modelResponse", "message"];

/// Flags inside a Grok `result` that mark the last token
const STOP_FLAGS: &[&str] = &["isSoftStop", "isComplete"];

/// Decode one brace-balanced object into an event
pub fn decode(object: &str) -> Result<ParsedEvent, ParseError> {
    let value: Value = serde_json::from_str(object).map_err(|e| ParseError::decode(object, &e))?;
    match value {
        Value::Object(map) => Ok(classify(&map)),
        _ => Ok(ParsedEvent::Unknown { kind: None }),
    }
}

/// Assign an event kind by walking the shape table
pub fn classify(object: &Object) -> ParsedEvent {
    for (shape, matcher) in SHAPES {
        if let Some(event) = matcher(object) {
            tracing::trace!(shape = *shape, kind = event.kind(), "Classified stream object");
            return event;
        }
    }

    let kind = type_tag(object).map(String::from);
    tracing::trace!(kind = ?kind, "Unrecognized stream object");
    ParsedEvent::Unknown { kind }
}

// ============================================================================
// Typed shapes: {"type": "...", ...}
// ============================================================================

fn typed_completion(object: &Object) -> Option<ParsedEvent> {
    let tag = type_tag(object)?;
    if !COMPLETION_TYPES.contains(&tag) {
        return None;
    }
    Some(ParsedEvent::Completion {
        fragment: text_field(object).map(String::from),
        thinking: thinking_flag(object),
        metadata: known_metadata(object),
    })
}

fn typed_token(object: &Object) -> Option<ParsedEvent> {
    if type_tag(object)? != "token" {
        return None;
    }
    let fragment = text_field(object)?;
    Some(ParsedEvent::Token {
        fragment: fragment.to_string(),
        thinking: thinking_flag(object),
        metadata: known_metadata(object),
    })
}

fn typed_metadata(object: &Object) -> Option<ParsedEvent> {
    if type_tag(object)? != "metadata" {
        return None;
    }
    let mut metadata = Metadata::new();
    for (key, value) in object {
        match (key.as_str(), value) {
            ("type", _) => {}
            ("metadata" | "data", Value::Object(inner)) => {
                metadata.extend(inner.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            _ => {
                metadata.insert(key.clone(), value.clone());
            }
        }
    }
    Some(ParsedEvent::Metadata(metadata))
}

// ============================================================================
// Grok envelopes: {"result": {...}}, {"response": {...}}, {"conversationId": ...},
// {"error": ...}
// ============================================================================

fn result_envelope(object: &Object) -> Option<ParsedEvent> {
    let result = object.get("result")?.as_object()?;

    let mut metadata = known_metadata(result);
    if let Some(user) = result.get("userResponse").and_then(Value::as_object) {
        if let Some(id) = user.get("responseId") {
            metadata.insert("userResponseId".to_string(), id.clone());
        }
    }
    if let Some(conversation) = result.get("conversation").and_then(Value::as_object) {
        metadata.extend(known_metadata(conversation));
    }

    // New-conversation streams nest the reply payload one level down
    let payload = result
        .get("response")
        .and_then(Value::as_object)
        .unwrap_or(result);
    Some(reply_event(payload, metadata))
}

/// Single-object reply: `{"response": {"responseId", "message": {...}, "isSoftStop"}}`
fn standard_response(object: &Object) -> Option<ParsedEvent> {
    let response = object.get("response")?.as_object()?;
    Some(reply_event(response, known_metadata(object)))
}

/// Event for a reply payload: a token, a final message, a bare stop flag or
/// plain metadata
fn reply_event(payload: &Object, mut metadata: Metadata) -> ParsedEvent {
    metadata.extend(known_metadata(payload));
    let stop = STOP_FLAGS.iter().any(|name| flag(payload, name));
    let thinking = flag(payload, "isThinking");

    if let Some(token) = payload.get("token").and_then(Value::as_str) {
        return if stop {
            ParsedEvent::Completion {
                fragment: Some(token.to_string()),
                thinking,
                metadata,
            }
        } else {
            ParsedEvent::Token {
                fragment: token.to_string(),
                thinking,
                metadata,
            }
        };
    }

    let final_message = FINAL_MESSAGE_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_object));
    if let Some(message) = final_message {
        metadata.extend(final_message_metadata(message));
        return ParsedEvent::Completion {
            fragment: None,
            thinking: false,
            metadata,
        };
    }

    if stop {
        return ParsedEvent::Completion {
            fragment: None,
            thinking: false,
            metadata,
        };
    }

    if metadata.is_empty() {
        ParsedEvent::Unknown { kind: None }
    } else {
        ParsedEvent::Metadata(metadata)
    }
}

fn new_conversation(object: &Object) -> Option<ParsedEvent> {
    object.get("conversationId")?.as_str()?;
    Some(ParsedEvent::Metadata(known_metadata(object)))
}

fn error_envelope(object: &Object) -> Option<ParsedEvent> {
    let error = object.get("error")?;
    let message = match error {
        Value::String(s) => s.as_str(),
        Value::Object(inner) => inner.get("message").and_then(Value::as_str).unwrap_or(""),
        _ => "",
    };
    tracing::warn!(upstream_error = message, "Error object in response stream");
    Some(ParsedEvent::Unknown {
        kind: Some("error".to_string()),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn type_tag(object: &Object) -> Option<&str> {
    object.get("type").and_then(Value::as_str)
}

fn text_field(object: &Object) -> Option<&str> {
    TEXT_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_str))
}

fn flag(object: &Object, name: &str) -> bool {
    object.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn thinking_flag(object: &Object) -> bool {
    flag(object, "thinking") || flag(object, "isThinking")
}

fn known_metadata(object: &Object) -> Metadata {
    METADATA_KEYS
        .iter()
        .filter_map(|key| object.get(*key).map(|v| ((*key).to_string(), v.clone())))
        .collect()
}

/// Metadata from a final message object. The full reply text, when the
/// upstream sends one, is kept under `message`; it never replaces the
/// token-built text.
fn final_message_metadata(message: &Object) -> Metadata {
    let mut metadata = known_metadata(message);
    if let Some(content) = message.get("content") {
        metadata.insert("message".to_string(), content.clone());
    }
    match message.get("message") {
        Some(Value::String(text)) => {
            metadata.insert("message".to_string(), Value::String(text.clone()));
        }
        Some(Value::Object(inner)) => {
            metadata.extend(known_metadata(inner));
            if let Some(content) = inner.get("content") {
                metadata.insert("message".to_string(), content.clone());
            }
        }
        _ => {}
    }
    metadata
}
