use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{JobOptions, ModelSize};
use crate::error::{Error, Result};
use crate::fetch::AudioFetcher;
use crate::job::{JobId, TranscriptionJob};
use crate::signal::SignalHandle;
use crate::transcribe::Transcriber;

/// Everything a caller keeps after submitting a job: the id, a handle for
/// polling the signal, and a token that cancels this job and nothing else.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: JobId,
    pub signal: SignalHandle,
    pub cancel: CancellationToken,
}

/// Accepts submissions and tracks the most recent one.
///
/// The registry holds a single slot: each submission replaces the previous
/// handle, so pollers that go through the registry always see the latest
/// job. A replaced job keeps running to completion with its own signal and
/// work directory; callers that kept its `JobHandle` can still poll or
/// cancel it.
pub struct JobRegistry {
    fetcher: Arc<dyn AudioFetcher>,
    transcriber: Arc<dyn Transcriber>,
    options: JobOptions,
    work_root: PathBuf,
    next_id: AtomicU64,
    slot: RwLock<Option<JobHandle>>,
}

impl JobRegistry {
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        transcriber: Arc<dyn Transcriber>,
        options: JobOptions,
    ) -> Self {
        let work_root = options.resolve_work_root();
        Self {
            fetcher,
            transcriber,
            options,
            work_root,
            next_id: AtomicU64::new(1),
            slot: RwLock::new(None),
        }
    }

    /// Validate a submission, spawn its job in the background, and park the
    /// handle in the slot. Returns the handle without waiting for the job.
    ///
    /// `model` overrides the configured default when given; an unrecognized
    /// name is rejected before anything is spawned.
    pub async fn submit(&self, reference: &str, model: Option<&str>) -> Result<JobHandle> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::Validation("missing reference".into()));
        }
        let model = match model {
            None => self.options.model.clone(),
            Some(name) => ModelSize::parse_name(name)
                .ok_or_else(|| Error::Validation(format!("unknown model: {name}")))?,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(job = id, model = %model, reference = %reference, "job submitted");

        let handle = JobHandle {
            id,
            signal: SignalHandle::new(),
            cancel: CancellationToken::new(),
        };
        let job = TranscriptionJob {
            id,
            reference: reference.to_string(),
            model,
            chunk_ms: self.options.chunk_ms,
            job_dir: self.work_root.join(format!("job-{id}")),
            fetcher: Arc::clone(&self.fetcher),
            transcriber: Arc::clone(&self.transcriber),
            signal: handle.signal.clone(),
            cancel: handle.cancel.clone(),
        };

        let previous = self.slot.write().await.replace(handle.clone());
        if let Some(previous) = previous {
            debug!(replaced = previous.id, by = id, "job handle replaced");
        }
        tokio::spawn(job.run());

        Ok(handle)
    }

    /// Signal of the most recently submitted job, if any.
    pub async fn current_signal(&self) -> Option<SignalHandle> {
        self.slot.read().await.as_ref().map(|h| h.signal.clone())
    }

    /// Handle of the most recently submitted job, if any.
    pub async fn current(&self) -> Option<JobHandle> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::fetch::SOURCE_WAV;
    use crate::signal::Phase;

    /// Writes one chunk's worth of silence, after an optional delay.
    struct SleepyFetcher {
        delay_ms: u64,
    }

    #[async_trait]
    impl AudioFetcher for SleepyFetcher {
        async fn fetch(&self, _reference: &str, dest_dir: &Path) -> Result<PathBuf> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            tokio::fs::create_dir_all(dest_dir).await?;
            let path = dest_dir.join(SOURCE_WAV);
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16_000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(&path, spec)
                .map_err(|e| Error::Fetch(e.to_string()))?;
            for _ in 0..16_000 {
                writer
                    .write_sample(0i16)
                    .map_err(|e| Error::Fetch(e.to_string()))?;
            }
            writer.finalize().map_err(|e| Error::Fetch(e.to_string()))?;
            Ok(path)
        }
    }

    /// Echoes a fixed text for every chunk.
    struct EchoTranscriber {
        text: &'static str,
    }

    #[async_trait]
    impl Transcriber for EchoTranscriber {
        async fn transcribe(&self, _chunk: &Path, _model: &ModelSize) -> Result<String> {
            Ok(self.text.to_string())
        }
    }

    fn registry(name: &str, fetch_delay_ms: u64, text: &'static str) -> JobRegistry {
        let work_root = std::env::temp_dir().join(format!("skriba_test_registry_{name}"));
        let _ = std::fs::remove_dir_all(&work_root);
        let options = JobOptions::new().work_root(work_root);
        JobRegistry::new(
            Arc::new(SleepyFetcher { delay_ms: fetch_delay_ms }),
            Arc::new(EchoTranscriber { text }),
            options,
        )
    }

    /// Poll until the job settles: finished on success, error set otherwise.
    async fn wait_settled(signal: &SignalHandle) -> crate::signal::ProgressSignal {
        for _ in 0..500 {
            let snapshot = signal.snapshot().await;
            if snapshot.finished || snapshot.error.is_some() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job did not settle in time");
    }

    #[tokio::test]
    async fn test_empty_reference_rejected() {
        let registry = registry("empty_ref", 0, "hi");
        let err = registry.submit("", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "missing reference");

        // Whitespace-only is the same as empty.
        let err = registry.submit("   \n", None).await.unwrap_err();
        assert_eq!(err.to_string(), "missing reference");

        // Nothing was spawned or parked.
        assert!(registry.current_signal().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_model_rejected() {
        let registry = registry("bad_model", 0, "hi");
        let err = registry
            .submit("https://example.com/a", Some("colossal"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "unknown model: colossal");
        assert!(registry.current_signal().await.is_none());
    }

    #[tokio::test]
    async fn test_no_signal_before_first_submission() {
        let registry = registry("no_job", 0, "hi");
        assert!(registry.current_signal().await.is_none());
        assert!(registry.current().await.is_none());
    }

    #[tokio::test]
    async fn test_ids_increase_per_submission() {
        let registry = registry("ids", 0, "hi");
        let a = registry.submit("https://example.com/a", None).await.unwrap();
        let b = registry.submit("https://example.com/b", None).await.unwrap();
        let c = registry.submit("https://example.com/c", None).await.unwrap();
        assert!(a.id < b.id && b.id < c.id);

        for handle in [a, b, c] {
            wait_settled(&handle.signal).await;
        }
    }

    #[tokio::test]
    async fn test_submission_runs_to_completion() {
        let registry = registry("complete", 0, "hello world");
        let handle = registry.submit("https://example.com/a", None).await.unwrap();

        let snapshot = wait_settled(&handle.signal).await;
        assert_eq!(snapshot.transcript.as_deref(), Some("hello world\n"));
        assert_eq!(snapshot.phase, Some(Phase::Completed));
        assert!(snapshot.error.is_none());
        assert!(snapshot.finished);
    }

    #[tokio::test]
    async fn test_replacement_does_not_cancel_previous_job() {
        let registry = registry("replace", 100, "replaced");

        let first = registry.submit("https://example.com/slow", None).await.unwrap();
        let second = registry.submit("https://example.com/next", None).await.unwrap();

        // The slot now reflects only the latest submission.
        assert_eq!(registry.current().await.map(|h| h.id), Some(second.id));

        // The first job was never cancelled: it finishes on its own signal
        // despite being replaced while still fetching.
        let first_snapshot = wait_settled(&first.signal).await;
        assert!(!first.cancel.is_cancelled());
        assert_eq!(first_snapshot.transcript.as_deref(), Some("replaced\n"));
        assert!(first_snapshot.error.is_none());

        let second_snapshot = wait_settled(&second.signal).await;
        assert_eq!(second_snapshot.transcript.as_deref(), Some("replaced\n"));
    }

    #[tokio::test]
    async fn test_cancelling_one_handle_leaves_the_other_running() {
        let registry = registry("cancel_one", 50, "kept");

        let first = registry.submit("https://example.com/a", None).await.unwrap();
        let second = registry.submit("https://example.com/b", None).await.unwrap();
        first.cancel.cancel();

        let first_snapshot = wait_settled(&first.signal).await;
        assert_eq!(first_snapshot.error.as_deref(), Some("job cancelled"));
        assert!(!first_snapshot.finished);

        let second_snapshot = wait_settled(&second.signal).await;
        assert_eq!(second_snapshot.transcript.as_deref(), Some("kept\n"));
        assert!(second_snapshot.error.is_none());
    }
}
