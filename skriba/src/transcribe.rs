use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::{JobOptions, ModelSize};
use crate::error::{Error, Result};
use crate::model;

/// Converts one audio chunk into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, chunk: &Path, model: &ModelSize) -> Result<String>;
}

/// whisper.cpp-backed transcriber.
///
/// Model loading dominates per-chunk cost, so each model is loaded once and
/// the context is reused across chunks and across jobs.
pub struct WhisperTranscriber {
    cache_dir: PathBuf,
    n_threads: Option<u32>,
    gpu: bool,
    gpu_device: u32,
    contexts: Mutex<HashMap<ModelSize, Arc<WhisperContext>>>,
}

impl WhisperTranscriber {
    /// Build a transcriber from pipeline options. Model files are resolved
    /// through the options' cache directory, downloading on first use.
    pub fn new(options: &JobOptions) -> Self {
        Self {
            cache_dir: options.resolve_cache_dir(),
            n_threads: options.n_threads,
            gpu: options.gpu,
            gpu_device: options.gpu_device,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    async fn context_for(&self, model: &ModelSize) -> Result<Arc<WhisperContext>> {
        // Held across the download so two jobs racing on a cold cache don't
        // fetch the same model twice.
        let mut contexts = self.contexts.lock().await;
        if let Some(ctx) = contexts.get(model) {
            return Ok(Arc::clone(ctx));
        }

        let model_path = model::ensure_model(model, &self.cache_dir).await?;
        info!(model = %model_path.display(), "loading whisper model");

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(self.gpu);
        ctx_params.gpu_device(self.gpu_device as i32);

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?,
            ctx_params,
        )?;

        let ctx = Arc::new(ctx);
        contexts.insert(model.clone(), Arc::clone(&ctx));
        Ok(ctx)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, chunk: &Path, model: &ModelSize) -> Result<String> {
        let ctx = self.context_for(model).await?;
        let samples = read_chunk_samples(chunk)?;
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut state = ctx.create_state()?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        if let Some(n) = self.n_threads {
            params.set_n_threads(n as i32);
        }

        // Disable stderr printing from whisper.cpp
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        debug!(chunk = %chunk.display(), samples = samples.len(), "running transcription");
        state.full(params, &samples)?;

        let num_segments = state.full_n_segments();
        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| Error::Transcribe(format!("segment {i} not found")))?;
            let piece = segment
                .to_str_lossy()
                .map_err(|e| Error::Transcribe(format!("segment text error: {e}")))?;
            text.push_str(&piece);
        }

        Ok(text.trim().to_string())
    }
}

/// Read a chunk WAV into f32 samples in [-1.0, 1.0] for whisper.
fn read_chunk_samples(path: &Path) -> Result<Vec<f32>> {
    if !path.exists() {
        return Err(Error::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = hound::WavReader::open(path)
        .map_err(|e| Error::Decode(format!("failed to open {}: {e}", path.display())))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Decode(format!(
            "expected 16-bit PCM chunk, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if spec.channels != 1 {
        return Err(Error::Decode(format!(
            "expected mono chunk, got {} channels",
            spec.channels
        )));
    }

    reader
        .samples::<i16>()
        .map(|s| {
            s.map(|sample| sample as f32 / 32768.0)
                .map_err(|e| Error::Decode(format!("failed to decode {}: {e}", path.display())))
        })
        .collect()
}
