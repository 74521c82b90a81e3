//! grok_stream - reply reconstruction for a browser-driven chat web UI
//!
//! The chat application streams its replies as concatenated JSON objects.
//! This crate turns those raw chunks back into a complete reply: text,
//! completion state and metadata, plus the diagnostics collected on the way.
//!
//! - [`parser`]: the synchronous reconstructor (splitter, decoder, accumulator)
//! - [`source`]: the transcript-source boundary and the async driver
//! - [`endpoint`]: which captured URLs carry reply streams
//! - [`config`]: explicit runtime configuration

pub mod config;
pub mod endpoint;
pub mod parser;
pub mod source;

pub use config::{ConfigError, StreamConfig};
pub use endpoint::Endpoint;
pub use parser::{
    parse_transcript, reconstruct_chunks, Delta, ParseError, ParsedEvent, RawChunk,
    Reconstruction, ReconstructedResponse, StreamingResponseReconstructor, Termination,
};
pub use source::{reconstruct, reconstruct_with, SourceError, TranscriptSource};
