//! Submit a URL and poll the job's progress until it finishes.
//!
//! Usage: cargo run --example poll -- https://example.com/video

use std::sync::Arc;
use std::time::Duration;

use skriba::{JobOptions, JobRegistry, WhisperTranscriber, YtDlpFetcher};

#[tokio::main]
async fn main() -> skriba::Result<()> {
    let url = std::env::args().nth(1).expect("usage: poll <url>");

    let options = JobOptions::new();
    let transcriber = WhisperTranscriber::new(&options);
    let registry = JobRegistry::new(Arc::new(YtDlpFetcher), Arc::new(transcriber), options);

    let handle = registry.submit(&url, None).await?;

    let mut last_phase = None;
    loop {
        let progress = handle.signal.snapshot().await;
        if progress.phase != last_phase {
            if let Some(phase) = &progress.phase {
                eprintln!("{phase}");
            }
            last_phase = progress.phase.clone();
        }
        if progress.finished || progress.error.is_some() {
            match progress.transcript {
                Some(text) => print!("{text}"),
                None => eprintln!("error: {}", progress.error.unwrap_or_default()),
            }
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    Ok(())
}
