use std::path::PathBuf;

/// All errors that can occur in skriba.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[cfg(feature = "fetch")]
    #[error("yt-dlp not found — install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("audio decoding error: {0}")]
    Decode(String),

    #[error("audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("transcription error: {0}")]
    Transcribe(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("model download failed: {0}")]
    ModelDownload(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("{0}")]
    Validation(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("whisper error: {0}")]
    Whisper(#[from] whisper_rs::WhisperError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
