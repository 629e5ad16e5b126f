use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use skriba::{JobOptions, JobRegistry, ModelSize, WhisperTranscriber, YtDlpFetcher};
use tracing::info;

mod error;
mod handlers;

#[derive(Parser)]
#[command(
    name = "skriba-server",
    about = "HTTP server for the skriba transcription pipeline"
)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Whisper model used when a submission names none.
    #[arg(short, long, default_value = "base")]
    model: String,

    /// Chunk length handed to the transcriber, in milliseconds.
    #[arg(long, default_value = "30000")]
    chunk_ms: u32,

    /// Directory for per-job work files (default: system temp).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Where downloaded ggml models are kept.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Run whisper on the CPU only.
    #[arg(long)]
    no_gpu: bool,

    /// GPU device index for CUDA/Vulkan builds.
    #[arg(long, default_value = "0")]
    gpu_device: u32,

    /// Whisper thread count (defaults to whisper's own choice).
    #[arg(long)]
    threads: Option<u32>,

    /// Print known and cached models, then exit.
    #[arg(long)]
    list_models: bool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skriba=info".parse().unwrap())
                .add_directive("skriba_server=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_models {
        let cache_dir = cli
            .cache_dir
            .unwrap_or_else(|| JobOptions::default().resolve_cache_dir());
        print_model_table(&cache_dir);
        return Ok(());
    }

    let model = match ModelSize::parse_name(&cli.model) {
        Some(m) => m,
        None => {
            eprintln!("unknown model: {}", cli.model);
            eprintln!("run with --list-models to see the known names");
            std::process::exit(1);
        }
    };

    let mut options = JobOptions::new()
        .model(model)
        .chunk_ms(cli.chunk_ms)
        .gpu(!cli.no_gpu)
        .gpu_device(cli.gpu_device);
    if let Some(n) = cli.threads {
        options = options.n_threads(n);
    }
    if let Some(dir) = cli.work_dir {
        options = options.work_root(dir);
    }
    if let Some(dir) = cli.cache_dir {
        options = options.cache_dir(dir);
    }

    let transcriber = WhisperTranscriber::new(&options);
    let registry = web::Data::new(JobRegistry::new(
        Arc::new(YtDlpFetcher),
        Arc::new(transcriber),
        options,
    ));

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    info!(addr = %bind_addr, "starting server");

    HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .configure(handlers::routes)
    })
    .bind(&bind_addr)?
    .run()
    .await
}

/// Every known selector and its approximate download size.
const MODEL_TABLE: [(ModelSize, &str); 11] = [
    (ModelSize::Tiny, "75 MB"),
    (ModelSize::TinyEn, "75 MB"),
    (ModelSize::Base, "142 MB"),
    (ModelSize::BaseEn, "142 MB"),
    (ModelSize::Small, "466 MB"),
    (ModelSize::SmallEn, "466 MB"),
    (ModelSize::Medium, "1.5 GB"),
    (ModelSize::MediumEn, "1.5 GB"),
    (ModelSize::LargeV2, "2.9 GB"),
    (ModelSize::LargeV3, "2.9 GB"),
    (ModelSize::LargeV3Turbo, "~1.6 GB"),
];

fn print_model_table(cache_dir: &Path) {
    println!("Available models:");
    for (model, size) in &MODEL_TABLE {
        println!("  {:<16} {size}", model.name());
    }

    let cached = skriba::model::list_cached_models(cache_dir);
    if cached.is_empty() {
        return;
    }
    println!("\nCached in {}:", cache_dir.display());
    for path in cached {
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::metadata(&path) {
            Ok(meta) => println!("  {name} ({})", format_bytes(meta.len())),
            Err(_) => println!("  {name}"),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b >= 1e9 {
        format!("{:.1} GB", b / 1e9)
    } else if b >= 1e6 {
        format!("{:.0} MB", b / 1e6)
    } else if b >= 1e3 {
        format!("{:.0} KB", b / 1e3)
    } else {
        format!("{bytes} B")
    }
}
