use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ModelSize;
use crate::error::{Error, Result};
use crate::fetch::AudioFetcher;
use crate::segment;
use crate::signal::{Phase, SignalHandle};
use crate::transcribe::Transcriber;

/// Identifier of a submitted job, unique and increasing per registry.
pub type JobId = u64;

/// One end-to-end run of the pipeline for a single source reference.
///
/// A job owns its signal (it is the signal's only writer) and a scoped work
/// directory `<work_root>/job-<id>`, so concurrent jobs never touch each
/// other's artifacts.
pub struct TranscriptionJob {
    pub(crate) id: JobId,
    pub(crate) reference: String,
    pub(crate) model: ModelSize,
    pub(crate) chunk_ms: u32,
    pub(crate) job_dir: PathBuf,
    pub(crate) fetcher: Arc<dyn AudioFetcher>,
    pub(crate) transcriber: Arc<dyn Transcriber>,
    pub(crate) signal: SignalHandle,
    pub(crate) cancel: CancellationToken,
}

impl TranscriptionJob {
    /// Run the pipeline to completion. Every outcome is reported through
    /// the signal, so the future itself never fails and can run detached.
    pub async fn run(self) {
        info!(job = self.id, reference = %self.reference, model = %self.model, "job started");
        match self.execute().await {
            Ok(()) => {
                // Finished means the whole pipeline succeeded, cleanup
                // included. A failed job leaves the flag false and carries
                // the error instead.
                self.signal.finish().await;
                info!(job = self.id, "job finished");
            }
            Err(e) => {
                warn!(job = self.id, error = %e, "job failed");
                self.signal.fail(e.to_string()).await;
            }
        }
    }

    async fn execute(&self) -> Result<()> {
        self.checkpoint()?;
        tokio::fs::create_dir_all(&self.job_dir).await?;

        // Acquire
        self.signal.set_phase(Phase::Downloading).await;
        let source = self.fetcher.fetch(&self.reference, &self.job_dir).await?;
        self.signal.set_phase(Phase::Downloaded).await;

        self.checkpoint()?;

        // Segment
        self.signal.set_phase(Phase::Segmenting).await;
        let chunks = segment::split_audio(&source, &self.job_dir, self.chunk_ms)?;
        self.signal.set_phase(Phase::Segmented).await;
        // Acquisition plus segmentation count as the first half of the work;
        // the chunks share the rest evenly.
        self.signal.set_percent(50.0).await;

        // Transcribe chunks in ascending order. A consumed chunk is deleted
        // immediately, whatever happens to the chunks after it; a chunk that
        // fails (and everything behind it) stays on disk.
        let total = chunks.len();
        let mut transcript = String::new();
        for (index, chunk) in chunks.iter().enumerate() {
            self.checkpoint()?;
            let part = index + 1;
            self.signal
                .set_phase(Phase::Transcribing { part, total })
                .await;
            debug!(job = self.id, part, total, "transcribing chunk");

            let text = self.transcriber.transcribe(chunk, &self.model).await?;
            transcript.push_str(&text);
            transcript.push('\n');

            if let Err(e) = tokio::fs::remove_file(chunk).await {
                warn!(job = self.id, path = %chunk.display(), error = %e, "failed to remove chunk");
            }
            self.signal.add_percent(50.0 / total as f32).await;
        }

        // Aggregate. An empty source produced no chunks and the loop never
        // ran; the job still completes, with an empty transcript.
        self.signal.complete(transcript).await;

        self.cleanup(&source).await;
        Ok(())
    }

    /// Remove the fetched source and the job's work directory. Runs only
    /// after a successful pipeline; failures are logged, not reported
    /// through the signal.
    async fn cleanup(&self, source: &Path) {
        if source.exists() {
            if let Err(e) = tokio::fs::remove_file(source).await {
                warn!(job = self.id, path = %source.display(), error = %e, "failed to remove source audio");
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.job_dir).await {
            warn!(job = self.id, path = %self.job_dir.display(), error = %e, "failed to clean up job dir");
        }
    }

    /// A cancelled token stops the job at the next stage boundary. Nothing
    /// in this crate cancels the token; in particular a job replaced in the
    /// registry keeps running.
    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
