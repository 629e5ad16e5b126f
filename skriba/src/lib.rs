//! Transcription job pipeline — media URL in, polled progress and transcript out.
//!
//! **skriba** runs the full pipeline in a background job: fetching the media
//! (via yt-dlp + ffmpeg), splitting the audio into fixed-length WAV chunks,
//! and transcribing chunk by chunk (via whisper.cpp). Every job writes a
//! progress signal that any number of pollers can snapshot while it runs.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use skriba::{JobOptions, JobRegistry, WhisperTranscriber, YtDlpFetcher};
//!
//! # #[tokio::main]
//! # async fn main() -> skriba::Result<()> {
//! let options = JobOptions::new();
//! let transcriber = WhisperTranscriber::new(&options);
//! let registry = JobRegistry::new(Arc::new(YtDlpFetcher), Arc::new(transcriber), options);
//!
//! let handle = registry.submit("https://example.com/talk", None).await?;
//! let mut last_phase = None;
//! loop {
//!     let progress = handle.signal.snapshot().await;
//!     if progress.phase != last_phase {
//!         if let Some(phase) = &progress.phase {
//!             println!("{phase}");
//!         }
//!         last_phase = progress.phase.clone();
//!     }
//!     if progress.finished || progress.error.is_some() {
//!         match progress.transcript {
//!             Some(text) => print!("{text}"),
//!             None => eprintln!("{}", progress.error.unwrap_or_default()),
//!         }
//!         break;
//!     }
//!     tokio::time::sleep(Duration::from_millis(250)).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! See the [README](https://github.com/claymore666/skriba) for the HTTP
//! server, feature flags, and model selection.

pub mod config;
pub mod error;
pub(crate) mod fetch;
pub(crate) mod job;
pub mod model;
pub(crate) mod registry;
pub(crate) mod segment;
pub(crate) mod signal;
pub(crate) mod transcribe;

pub use config::{JobOptions, ModelSize};
pub use error::{Error, Result};
#[cfg(feature = "fetch")]
pub use fetch::YtDlpFetcher;
pub use fetch::{AudioFetcher, SOURCE_WAV};
pub use job::JobId;
pub use registry::{JobHandle, JobRegistry};
pub use segment::{split_audio, DEFAULT_CHUNK_MS};
pub use signal::{Phase, ProgressSignal, SignalHandle};
pub use transcribe::{Transcriber, WhisperTranscriber};
