use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
#[cfg(feature = "fetch")]
use crate::error::Error;
#[cfg(feature = "fetch")]
use tracing::{debug, info, warn};

/// Fixed name of the normalized audio artifact inside a job's work directory.
pub const SOURCE_WAV: &str = "source.wav";

/// Acquires the audio behind a source reference into a job's work directory.
///
/// Implementations must leave exactly one decodable 16 kHz mono 16-bit WAV
/// at the returned path (conventionally `dest_dir/source.wav`) or fail. They
/// may create intermediate files inside `dest_dir` but should remove them
/// before returning.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Fetches remote media with yt-dlp, then normalizes it to 16 kHz mono WAV
/// with ffmpeg.
///
/// # Security
/// - References must start with http:// or https://
/// - yt-dlp arguments go through `.arg()`, never a shell
/// - `--no-exec` keeps yt-dlp from spawning post-processing commands
/// - The path yt-dlp reports is checked to stay inside `dest_dir`
#[cfg(feature = "fetch")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YtDlpFetcher;

#[cfg(feature = "fetch")]
#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf> {
        validate_url(reference)?;

        info!(reference = %reference.trim(), "downloading audio");

        // Check for yt-dlp before creating any scratch files.
        if tokio::process::Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await
            .is_err()
        {
            return Err(Error::YtDlpNotFound);
        }

        tokio::fs::create_dir_all(dest_dir).await?;

        let output_template = dest_dir
            .join("%(id)s.%(ext)s")
            .to_str()
            .ok_or_else(|| Error::Fetch("work directory path contains invalid UTF-8".into()))?
            .to_string();

        // Extract audio straight to WAV; the segmenter only reads WAV.
        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--extract-audio",
                "--audio-format",
                "wav",
                "--audio-quality",
                "0",
                "--no-playlist",
                "--no-exec",
                "--output",
                &output_template,
                "--print",
                "after_move:filepath",
            ])
            .arg(reference.trim())
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Fetch(format!(
                "yt-dlp failed: {}",
                stderr_excerpt(&output)
            )));
        }

        // --print after_move:filepath reports where the audio landed.
        let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let downloaded = if reported.is_empty() {
            find_audio_file(dest_dir)?
        } else {
            let candidate = PathBuf::from(&reported);
            validate_path_in_dir(&candidate, dest_dir)?;
            candidate
        };

        if !downloaded.exists() {
            return Err(Error::Fetch(format!(
                "downloaded file not found at {}",
                downloaded.display()
            )));
        }

        debug!(path = %downloaded.display(), "audio downloaded");

        // The transcriber wants 16 kHz mono; re-encode to the fixed name the
        // rest of the pipeline looks for.
        let source = dest_dir.join(SOURCE_WAV);
        normalize_wav(&downloaded, &source).await?;

        if let Err(e) = tokio::fs::remove_file(&downloaded).await {
            warn!(path = %downloaded.display(), error = %e, "failed to remove intermediate download");
        }

        info!(path = %source.display(), "audio ready");
        Ok(source)
    }
}

/// Re-encode any audio file to 16 kHz mono 16-bit WAV via ffmpeg subprocess.
#[cfg(feature = "fetch")]
async fn normalize_wav(input: &Path, output: &Path) -> Result<()> {
    let result = tokio::process::Command::new("ffmpeg")
        .args(["-nostdin", "-y", "-threads", "0", "-i"])
        .arg(input)
        .args(["-ac", "1", "-ar", "16000", "-acodec", "pcm_s16le"])
        .arg(output)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Fetch("ffmpeg not found — install with: apt install ffmpeg".into())
            } else {
                Error::Fetch(format!("failed to run ffmpeg: {e}"))
            }
        })?;

    if !result.status.success() {
        return Err(Error::Fetch(format!(
            "ffmpeg failed: {}",
            stderr_excerpt(&result)
        )));
    }

    Ok(())
}

/// First 1000 chars of a subprocess's stderr; both tools can dump megabytes.
#[cfg(feature = "fetch")]
fn stderr_excerpt(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .chars()
        .take(1000)
        .collect()
}

/// Rejects any reference that is not an http:// or https:// URL.
#[cfg(feature = "fetch")]
fn validate_url(reference: &str) -> Result<()> {
    let trimmed = reference.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(Error::Fetch(format!(
            "invalid URL (must start with http:// or https://): {trimmed}"
        )));
    }
    Ok(())
}

/// Lexically resolve `.` and `..` without touching the filesystem.
#[cfg(feature = "fetch")]
fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut stack = Vec::new();
    for part in path.components() {
        match part {
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir => {}
            keep => stack.push(keep),
        }
    }
    stack.iter().collect()
}

/// Reject paths that escape the job work directory.
#[cfg(feature = "fetch")]
fn validate_path_in_dir(path: &Path, dir: &Path) -> Result<()> {
    // Canonicalize where the paths exist, fall back to lexical resolution.
    let resolved = path.canonicalize().unwrap_or_else(|_| normalize_path(path));
    let root = dir.canonicalize().unwrap_or_else(|_| normalize_path(dir));

    if resolved.starts_with(&root) {
        return Ok(());
    }
    warn!(
        path = %path.display(),
        dir = %dir.display(),
        "downloaded file path outside work directory"
    );
    Err(Error::Fetch(
        "downloaded file path is outside the job work directory".into(),
    ))
}

/// Newest audio file in a directory, for when yt-dlp does not report a path.
#[cfg(feature = "fetch")]
fn find_audio_file(dir: &Path) -> Result<PathBuf> {
    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_audio = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| matches!(ext, "wav" | "mp3" | "ogg" | "m4a" | "opus" | "flac"));
        if !is_audio {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(_, t)| modified > *t) {
            newest = Some((path, modified));
        }
    }

    newest
        .map(|(p, _)| p)
        .ok_or_else(|| Error::Fetch("no audio file found after download".into()))
}
