use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default chunk length handed to the transcriber.
pub const DEFAULT_CHUNK_MS: u32 = 30_000;

/// Maximum source duration in seconds (8 hours).
/// Prevents unbounded memory allocation from very long audio files.
const MAX_AUDIO_DURATION_SECS: f64 = 8.0 * 3600.0;

/// Split a WAV file into fixed-length chunks, each written as its own WAV
/// file so it can be handed to the transcriber in isolation.
///
/// Chunks span `chunk_ms` each except the last, which holds whatever
/// remains. They are written as `chunk_000.wav`, `chunk_001.wav`, ... into
/// `out_dir` and returned in that order. An empty source yields no chunks.
///
/// The whole source is decoded before the first chunk file is written, so a
/// decode failure leaves no partial chunk artifacts behind.
pub fn split_audio(source: &Path, out_dir: &Path, chunk_ms: u32) -> Result<Vec<PathBuf>> {
    if chunk_ms == 0 {
        return Err(Error::InvalidOption("chunk length must be non-zero".into()));
    }
    if !source.exists() {
        return Err(Error::AudioNotFound {
            path: source.to_path_buf(),
        });
    }

    info!(path = %source.display(), chunk_ms, "splitting audio");

    let mut reader = hound::WavReader::open(source).map_err(|e| {
        Error::Decode(format!("failed to open {}: {e}", source.display()))
    })?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Decode(format!(
            "expected 16-bit PCM, got {}-bit {:?} — normalize the source first",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let channels = spec.channels as usize;
    let frames_per_chunk = (spec.sample_rate as u64 * chunk_ms as u64 / 1000) as usize;
    if frames_per_chunk == 0 {
        return Err(Error::InvalidOption(format!(
            "chunk length of {chunk_ms} ms is shorter than one frame at {} Hz",
            spec.sample_rate
        )));
    }

    // Decode everything up front; chunk boundaries are frame-aligned.
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Decode(format!("failed to decode {}: {e}", source.display())))?;

    let total_frames = samples.len() / channels;
    let duration_secs = total_frames as f64 / spec.sample_rate as f64;
    if duration_secs > MAX_AUDIO_DURATION_SECS {
        return Err(Error::Decode(format!(
            "audio too long ({duration_secs:.0}s) — maximum supported duration is {MAX_AUDIO_DURATION_SECS:.0}s"
        )));
    }

    debug!(
        frames = total_frames,
        duration_secs = format!("{duration_secs:.1}"),
        "decoded source"
    );

    std::fs::create_dir_all(out_dir)?;

    let samples_per_chunk = frames_per_chunk * channels;
    let mut chunks = Vec::with_capacity(total_frames.div_ceil(frames_per_chunk));

    for (i, window) in samples.chunks(samples_per_chunk).enumerate() {
        let path = out_dir.join(format!("chunk_{i:03}.wav"));
        let mut writer = hound::WavWriter::create(&path, spec).map_err(|e| {
            Error::Decode(format!("failed to create chunk {}: {e}", path.display()))
        })?;
        for &sample in window {
            writer.write_sample(sample).map_err(|e| {
                Error::Decode(format!("failed to write chunk {}: {e}", path.display()))
            })?;
        }
        writer.finalize().map_err(|e| {
            Error::Decode(format!("failed to finalize chunk {}: {e}", path.display()))
        })?;
        chunks.push(path);
    }

    info!(chunks = chunks.len(), "audio split");
    Ok(chunks)
}
