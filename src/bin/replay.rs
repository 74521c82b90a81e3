//! grok-replay - replay captured response bodies through the reconstructor
//!
//! Usage: `grok-replay <file>...`
//!
//! Prints one JSON reconstruction per file to stdout. Configuration comes
//! from `GROK_IDLE_TIMEOUT_SECS`, `GROK_READ_CHUNK_SIZE` and `GROK_LOG`
//! (`RUST_LOG` overrides the log filter).

use grok_stream::source::{reconstruct, FileSource, LoggingSource};
use grok_stream::StreamConfig;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StreamConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        return Err("usage: grok-replay <file>...".into());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    for path in &paths {
        let file = FileSource::open(path, config.read_chunk_size).await?;
        let mut source = LoggingSource::new(file, path.as_str());
        let result = reconstruct(&mut source, &config, &cancel).await;

        tracing::info!(
            path = %path,
            complete = result.response.is_complete,
            tokens = result.response.token_count,
            errors = result.errors.len(),
            "Replayed transcript"
        );
        println!("{}", json!({ "path": path, "reconstruction": result }));
    }

    Ok(())
}
