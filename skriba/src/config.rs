use std::fmt;
use std::path::PathBuf;

use crate::segment::DEFAULT_CHUNK_MS;

/// Whisper model sizes.
///
/// The selector a submission carries (e.g. `"base"`, `"small.en"`) parses
/// into one of these; unknown selectors are rejected at the submission
/// boundary, never mid-job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
}

impl ModelSize {
    /// Model filename as used by HuggingFace / whisper.cpp.
    pub fn filename(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::TinyEn => "ggml-tiny.en.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::BaseEn => "ggml-base.en.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::SmallEn => "ggml-small.en.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::MediumEn => "ggml-medium.en.bin",
            ModelSize::LargeV2 => "ggml-large-v2.bin",
            ModelSize::LargeV3 => "ggml-large-v3.bin",
            ModelSize::LargeV3Turbo => "ggml-large-v3-turbo.bin",
        }
    }

    /// Human-readable name, also the accepted selector spelling.
    pub fn name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::TinyEn => "tiny.en",
            ModelSize::Base => "base",
            ModelSize::BaseEn => "base.en",
            ModelSize::Small => "small",
            ModelSize::SmallEn => "small.en",
            ModelSize::Medium => "medium",
            ModelSize::MediumEn => "medium.en",
            ModelSize::LargeV2 => "large-v2",
            ModelSize::LargeV3 => "large-v3",
            ModelSize::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// Parse a selector string (e.g. a submission field or CLI argument).
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(ModelSize::Tiny),
            "tiny.en" => Some(ModelSize::TinyEn),
            "base" => Some(ModelSize::Base),
            "base.en" => Some(ModelSize::BaseEn),
            "small" => Some(ModelSize::Small),
            "small.en" => Some(ModelSize::SmallEn),
            "medium" => Some(ModelSize::Medium),
            "medium.en" => Some(ModelSize::MediumEn),
            "large-v2" => Some(ModelSize::LargeV2),
            "large-v3" => Some(ModelSize::LargeV3),
            "large-v3-turbo" => Some(ModelSize::LargeV3Turbo),
            _ => None,
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builder for job pipeline options.
///
/// These are process-level settings; the per-submission knob (the model
/// selector) can still override `model` for an individual job.
pub struct JobOptions {
    /// Model used when a submission names no selector.
    pub model: ModelSize,
    /// Chunk length handed to the segmenter, in milliseconds.
    pub chunk_ms: u32,
    /// Root under which per-job work directories are created.
    pub work_root: Option<PathBuf>,
    /// Model cache directory.
    pub cache_dir: Option<PathBuf>,
    pub n_threads: Option<u32>,
    pub gpu: bool,
    pub gpu_device: u32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            model: ModelSize::Base,
            chunk_ms: DEFAULT_CHUNK_MS,
            work_root: None,
            cache_dir: None,
            n_threads: None,
            gpu: true,
            gpu_device: 0,
        }
    }
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: ModelSize) -> Self {
        self.model = model;
        self
    }

    pub fn chunk_ms(mut self, ms: u32) -> Self {
        self.chunk_ms = ms;
        self
    }

    pub fn work_root(mut self, dir: PathBuf) -> Self {
        self.work_root = Some(dir);
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn n_threads(mut self, n: u32) -> Self {
        self.n_threads = Some(n);
        self
    }

    pub fn gpu(mut self, enabled: bool) -> Self {
        self.gpu = enabled;
        self
    }

    pub fn gpu_device(mut self, device: u32) -> Self {
        self.gpu_device = device;
        self
    }

    /// Resolve the work root. The default is unique per call (process id
    /// plus a timestamp) so concurrent servers sharing a temp dir never
    /// collide on job paths.
    pub fn resolve_work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!(
                "skriba-{}-{}",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            ))
        })
    }

    /// Resolve the cache directory, defaulting to ~/.cache/skriba/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("skriba")
                .join("models")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_known() {
        assert_eq!(ModelSize::parse_name("base"), Some(ModelSize::Base));
        assert_eq!(ModelSize::parse_name("tiny.en"), Some(ModelSize::TinyEn));
        assert_eq!(
            ModelSize::parse_name("large-v3-turbo"),
            Some(ModelSize::LargeV3Turbo)
        );
    }

    #[test]
    fn test_parse_name_unknown() {
        assert_eq!(ModelSize::parse_name("huge"), None);
        assert_eq!(ModelSize::parse_name(""), None);
        assert_eq!(ModelSize::parse_name("Base"), None);
    }

    #[test]
    fn test_name_round_trips_through_parse() {
        let all = [
            ModelSize::Tiny,
            ModelSize::TinyEn,
            ModelSize::Base,
            ModelSize::BaseEn,
            ModelSize::Small,
            ModelSize::SmallEn,
            ModelSize::Medium,
            ModelSize::MediumEn,
            ModelSize::LargeV2,
            ModelSize::LargeV3,
            ModelSize::LargeV3Turbo,
        ];
        for model in all {
            assert_eq!(ModelSize::parse_name(model.name()), Some(model));
        }
    }

    #[test]
    fn test_filename_is_ggml() {
        assert_eq!(ModelSize::Base.filename(), "ggml-base.bin");
        assert_eq!(ModelSize::LargeV3.filename(), "ggml-large-v3.bin");
    }

    #[test]
    fn test_default_options() {
        let opts = JobOptions::default();
        assert_eq!(opts.model, ModelSize::Base);
        assert_eq!(opts.chunk_ms, 30_000);
        assert!(opts.gpu);
    }

    #[test]
    fn test_builder_chain() {
        let opts = JobOptions::new()
            .model(ModelSize::Small)
            .chunk_ms(10_000)
            .gpu(false)
            .n_threads(4);
        assert_eq!(opts.model, ModelSize::Small);
        assert_eq!(opts.chunk_ms, 10_000);
        assert!(!opts.gpu);
        assert_eq!(opts.n_threads, Some(4));
    }

    #[test]
    fn test_resolve_cache_dir_default_ends_with_models() {
        let opts = JobOptions::default();
        let dir = opts.resolve_cache_dir();
        assert!(dir.ends_with("skriba/models") || dir.ends_with("models"));
    }

    #[test]
    fn test_resolve_work_root_override() {
        let opts = JobOptions::new().work_root(PathBuf::from("/var/tmp/jobs"));
        assert_eq!(opts.resolve_work_root(), PathBuf::from("/var/tmp/jobs"));
    }

    #[test]
    fn test_resolve_work_root_default_is_unique_per_process() {
        let opts = JobOptions::default();
        let root = opts.resolve_work_root();
        assert!(root.starts_with(std::env::temp_dir()));

        // Another process resolving its own default must land elsewhere,
        // so the name carries this process's id.
        let name = root.file_name().unwrap().to_string_lossy().into_owned();
        assert!(
            name.starts_with(&format!("skriba-{}-", std::process::id())),
            "unexpected work root name: {name}"
        );
    }
}
