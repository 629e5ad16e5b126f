use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

/// Observable pipeline phases, in the order a job moves through them.
///
/// The `Display` texts are a compatibility contract with existing pollers;
/// tests assert them verbatim. A job that fails keeps the phase it failed
/// in: failure is reported through the error field, not a phase change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Downloaded,
    Segmenting,
    Segmented,
    Transcribing { part: usize, total: usize },
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Downloading => write!(f, "Starting download..."),
            Phase::Downloaded => write!(f, "Download completed!"),
            Phase::Segmenting => write!(f, "Processing audio..."),
            Phase::Segmented => write!(f, "Audio processing completed!"),
            Phase::Transcribing { part, total } => {
                write!(f, "Transcribing part {part} of {total}...")
            }
            Phase::Completed => write!(f, "Transcription completed successfully!"),
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A point-in-time copy of a job's observable state.
///
/// `phase` is `None` until the job's asynchronous run begins. `finished`
/// flips only after a fully successful run, cleanup included; a job has
/// settled once `finished` or `error` is set. `percent` is internal
/// bookkeeping (acquisition + segmentation count as the first half, each
/// chunk adds an equal share of the rest); pollers are expected to key off
/// the phase, transcript, and error fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSignal {
    pub phase: Option<Phase>,
    pub transcript: Option<String>,
    pub error: Option<String>,
    pub finished: bool,
    pub percent: f32,
}

impl Default for ProgressSignal {
    fn default() -> Self {
        Self {
            phase: None,
            transcript: None,
            error: None,
            finished: false,
            percent: 0.0,
        }
    }
}

/// Shared handle to one job's progress signal.
///
/// The owning job is the only writer; any number of pollers may hold clones
/// and take snapshots concurrently. Readers between two writes may observe
/// a mix of old and new fields (e.g. a new phase next to a stale percent);
/// each snapshot itself is internally consistent.
#[derive(Debug, Clone)]
pub struct SignalHandle {
    inner: Arc<RwLock<ProgressSignal>>,
}

impl SignalHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ProgressSignal::default())),
        }
    }

    /// Copy out the current state.
    pub async fn snapshot(&self) -> ProgressSignal {
        self.inner.read().await.clone()
    }

    pub(crate) async fn set_phase(&self, phase: Phase) {
        self.inner.write().await.phase = Some(phase);
    }

    pub(crate) async fn set_percent(&self, value: f32) {
        self.inner.write().await.percent = value;
    }

    pub(crate) async fn add_percent(&self, delta: f32) {
        let mut signal = self.inner.write().await;
        signal.percent = (signal.percent + delta).min(100.0);
    }

    /// Record the final transcript and advance to the completed phase.
    pub(crate) async fn complete(&self, transcript: String) {
        let mut signal = self.inner.write().await;
        signal.transcript = Some(transcript);
        signal.phase = Some(Phase::Completed);
        signal.percent = 100.0;
    }

    /// Record a failure. A transcript recorded earlier wins: the error is
    /// dropped so that a completed transcript and an error are never both
    /// observable on the same signal.
    pub(crate) async fn fail(&self, message: String) {
        let mut signal = self.inner.write().await;
        if signal.transcript.is_some() {
            warn!(error = %message, "ignoring failure reported after a completed transcript");
            return;
        }
        signal.error = Some(message);
    }

    /// Mark the job finished. Only a fully successful run writes this; a
    /// failed job leaves the flag false.
    pub(crate) async fn finish(&self) {
        self.inner.write().await.finished = true;
    }
}
