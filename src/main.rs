//! Replay captured call content through the dispatcher
//!
//! Usage: `subtitles [CONFIG.toml] [CAPTURE.ndjson]`
//!
//! Reads one JSON envelope per line (from the capture file, or stdin when no
//! file is given) and logs every dispatched event.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use subtitles::{LoggingHandler, MessageDispatcher, SubtitlesConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let capture_path = args.next();

    let config = match &config_path {
        Some(path) => SubtitlesConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => SubtitlesConfig::default(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting subtitles replay");

    let dispatcher = MessageDispatcher::new(config);
    dispatcher.register(Arc::new(LoggingHandler));

    let reader: Box<dyn BufRead> = match &capture_path {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let started = chrono::Utc::now();
    let mut summary = Summary::default();
    for line in reader.lines() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let report = dispatcher.handle_content(line);
        summary.lines += 1;
        if !report.is_decoded() {
            summary.raw_forwarded += 1;
        }
        summary.diagnostics += report.diagnostics.len();
        summary.failures += report.failures.len();
    }

    let elapsed = chrono::Utc::now().signed_duration_since(started);
    info!(
        "Replayed {} lines in {} ms: {} raw, {} diagnostics, {} listener failures",
        summary.lines,
        elapsed.num_milliseconds(),
        summary.raw_forwarded,
        summary.diagnostics,
        summary.failures
    );
    info!(
        "Final session state {}, {} transcript lines ({} unfinished)",
        dispatcher.session_state(),
        dispatcher.transcripts().len(),
        dispatcher.streaming_count()
    );

    Ok(())
}

#[derive(Default)]
struct Summary {
    lines: usize,
    raw_forwarded: usize,
    diagnostics: usize,
    failures: usize,
}
