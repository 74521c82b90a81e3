//! Property-based tests for stream reconstruction
//!
//! These verify that chunk boundaries never change the result:
//! - Any re-chunking of a transcript yields the same reconstruction
//! - Byte-level delivery (splitting UTF-8 sequences) matches text delivery
//! - Text only ever grows while chunks arrive

use super::*;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

/// Token text including braces, quotes, escapes and multi-byte characters
fn arb_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-zA-Z0-9 ,.!?]{0,12}",
        1 => "[{}\\[\\]\"\\\\]{1,4}",
        1 => "[éñü🌍日本]{1,3}",
    ]
}

/// One stream object, serialized
fn arb_object() -> impl Strategy<Value = String> {
    prop_oneof![
        5 => arb_fragment().prop_map(|text| json!({"type": "token", "text": text}).to_string()),
        2 => arb_fragment().prop_map(|token| json!({"result": {"token": token, "isSoftStop": false}}).to_string()),
        1 => ("[a-z]{1,6}", "[a-z0-9-]{1,10}")
            .prop_map(|(model, id)| json!({"type": "metadata", "model": model, "responseId": id}).to_string()),
        1 => Just(r#"{"heartbeat":true}"#.to_string()),
    ]
}

/// Transcript body with optional whitespace between objects and an optional trailer
fn arb_transcript() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec((arb_object(), prop_oneof![Just(""), Just(" "), Just("\n")]), 0..12),
        prop_oneof![
            Just(String::new()),
            Just(r#"{"type":"completion"}"#.to_string()),
            Just(r#"{"type":"token","text":"cut"#.to_string()),
            Just(r#"{"type":"token","text":}"#.to_string()),
        ],
    )
        .prop_map(|(objects, trailer)| {
            let mut body: String = objects
                .into_iter()
                .map(|(object, sep)| format!("{object}{sep}"))
                .collect();
            body.push_str(&trailer);
            body
        })
}

/// Cut `bytes` at the given (sorted, deduplicated) positions
fn cut_bytes(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.retain(|&c| c > 0 && c < bytes.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        pieces.push(bytes[start..cut].to_vec());
        start = cut;
    }
    pieces.push(bytes[start..].to_vec());
    pieces
}

/// Cut `text` at char boundaries nearest to the given positions
fn cut_text(text: &str, cuts: Vec<usize>) -> Vec<String> {
    let boundaries: Vec<usize> = cuts
        .into_iter()
        .filter_map(|c| (c..=text.len()).find(|&i| text.is_char_boundary(i)))
        .collect();
    cut_bytes(text.as_bytes(), boundaries)
        .into_iter()
        .map(|piece| String::from_utf8(piece).expect("cut on char boundaries"))
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Re-chunking on char boundaries never changes the reconstruction
    #[test]
    fn prop_rechunking_is_transparent(
        transcript in arb_transcript(),
        cuts in proptest::collection::vec(0usize..400, 0..16),
    ) {
        let whole = parse_transcript(&transcript);
        let chunked = reconstruct_chunks(cut_text(&transcript, cuts));
        prop_assert_eq!(whole, chunked);
    }

    /// Cutting through UTF-8 sequences in byte chunks matches text delivery
    #[test]
    fn prop_byte_chunking_is_transparent(
        transcript in arb_transcript(),
        cuts in proptest::collection::vec(0usize..400, 0..16),
    ) {
        let whole = parse_transcript(&transcript);
        let chunked = reconstruct_chunks(cut_bytes(transcript.as_bytes(), cuts));
        prop_assert_eq!(whole, chunked);
    }

    /// One byte at a time is the most extreme re-chunking
    #[test]
    fn prop_single_byte_delivery(transcript in arb_transcript()) {
        let whole = parse_transcript(&transcript);
        let chunked = reconstruct_chunks(transcript.bytes().map(|b| vec![b]));
        prop_assert_eq!(whole, chunked);
    }

    /// Text only grows, and always extends what was there before
    #[test]
    fn prop_text_is_monotonic(
        transcript in arb_transcript(),
        cuts in proptest::collection::vec(0usize..400, 0..16),
    ) {
        let mut reconstructor = StreamingResponseReconstructor::new();
        let mut previous = String::new();
        for chunk in cut_text(&transcript, cuts) {
            let deltas = reconstructor.push_str(&chunk);
            let appended: String = deltas.iter().map(|d| d.text.as_str()).collect();
            prop_assert_eq!(reconstructor.text(), format!("{previous}{appended}"));
            previous = reconstructor.text().to_string();
        }
    }

    /// Token texts survive exactly, whatever characters they contain
    #[test]
    fn prop_token_text_preserved(fragments in proptest::collection::vec(arb_fragment(), 1..10)) {
        let mut transcript: String = fragments
            .iter()
            .map(|text| json!({"type": "token", "text": text}).to_string())
            .collect();
        transcript.push_str(r#"{"type":"completion"}"#);

        let result = parse_transcript(&transcript);
        prop_assert!(result.is_clean());
        prop_assert_eq!(result.response.text, fragments.concat());
        prop_assert_eq!(result.response.token_count, fragments.len());
    }

    /// Arbitrary input never panics and never claims completion without a marker
    #[test]
    fn prop_garbage_never_panics(input in "[{}\"\\\\a-z :,]{0,64}") {
        let result = parse_transcript(&input);
        prop_assert!(!result.response.is_complete);
    }
}
