use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::ModelSize;
use crate::error::{Error, Result};

const MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Anything under this is an error page, not a ggml model.
const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Resolve the on-disk path of a model, downloading it into the cache on
/// first use.
pub async fn ensure_model(model: &ModelSize, cache_dir: &Path) -> Result<PathBuf> {
    let target = cache_dir.join(model.filename());
    if target.exists() {
        info!(path = %target.display(), "model already cached");
        return Ok(target);
    }

    tokio::fs::create_dir_all(cache_dir).await.map_err(|e| {
        Error::Model(format!(
            "failed to create cache dir {}: {e}",
            cache_dir.display()
        ))
    })?;

    let url = format!("{MODEL_BASE_URL}/{}", model.filename());
    info!(model = model.name(), %url, "downloading model");
    download_model(&url, &target).await?;
    Ok(target)
}

async fn download_model(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| Error::ModelDownload(format!("HTTP error: {e}")))?;
    let expected = response.content_length().unwrap_or(0);

    // Stream into a .part file; rename only once the size checks out.
    let part = dest.with_extension("bin.part");
    let bar = download_bar(expected, dest);
    let written = stream_to_file(response, &part, &bar).await?;

    if written < MIN_MODEL_BYTES {
        tokio::fs::remove_file(&part).await.ok();
        return Err(Error::ModelDownload(format!(
            "downloaded file too small ({written} bytes), likely an error page"
        )));
    }

    tokio::fs::rename(&part, dest).await?;
    bar.finish_with_message("Download complete");

    if expected > 0 && written != expected {
        warn!(expected, written, "size mismatch, model may be corrupt");
    }
    info!(path = %dest.display(), size = written, "model saved");
    Ok(())
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    bar: &ProgressBar,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        bar.set_position(written);
    }
    file.flush().await?;

    Ok(written)
}

fn download_bar(len: u64, dest: &Path) -> ProgressBar {
    let name = dest
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    ProgressBar::new(len)
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .expect("valid template")
                .progress_chars("#>-"),
        )
        .with_message(format!("Downloading {name}"))
}

/// List the ggml model files already present in the cache.
pub fn list_cached_models(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "bin"))
        .collect()
}
