use anyhow::{Context, Result};
use batchscribe::audio::{base_name, check_ffmpeg, check_ffprobe};
use batchscribe::config::Config;
use batchscribe::pipeline::{print_summary, Pipeline};
use batchscribe::store::FragmentStore;
use batchscribe::transcribe::WhisperClient;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "batchscribe")]
#[command(version, about = "Batch audio transcription via the Whisper API")]
#[command(
    long_about = "Transcribe one or more audio files with OpenAI's Whisper API. Files too \
large for a single API call are split into chunks at silence boundaries and the per-chunk \
transcripts are merged back into one document. Interrupted runs resume from stored chunks \
and fragments."
)]
struct Cli {
    /// Audio files to transcribe
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format: text, verbose (JSON with segment timestamps)
    #[arg(short, long)]
    format: Option<String>,

    /// Source language code (e.g. en, ja); "auto" for detection
    #[arg(short, long)]
    language: Option<String>,

    /// Whisper model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Target chunk size in MB for oversized files
    #[arg(long)]
    target_size: Option<f64>,

    /// Keep scratch chunks and fragments from past runs for all files
    #[arg(long)]
    keep_scratch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    check_ffmpeg().context("FFmpeg is required for audio conversion")?;
    check_ffprobe().context("FFprobe is required for audio probing")?;

    // Load configuration, then apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(format) = cli.format {
        config.response_format = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(language) = cli.language {
        config.language = if language == "auto" { None } else { Some(language) };
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(target_size) = cli.target_size {
        config.target_size_mb = target_size;
    }
    config.validate().context("Configuration validation failed")?;

    let scratch_root = Config::scratch_dir();
    let chunk_dir = scratch_root.join("chunks");
    let fragment_dir = scratch_root.join("fragments");

    info!("Files:    {}", cli.inputs.len());
    info!("Model:    {}", config.model);
    info!("Format:   {}", config.response_format);
    info!(
        "Language: {}",
        config.language.as_deref().unwrap_or("auto-detect")
    );
    info!("Scratch:  {}", scratch_root.display());

    let client = WhisperClient::from_config(&config)?;
    let store = FragmentStore::new(fragment_dir);
    let pipeline = Pipeline::new(Box::new(client), store, chunk_dir).with_config(&config);

    // Startup maintenance: drop scratch state from source files outside
    // this batch, keeping everything this run could resume from.
    if !cli.keep_scratch {
        let keep_bases: Vec<String> = cli.inputs.iter().map(|p| base_name(p)).collect();
        pipeline.clean_scratch(&keep_bases)?;
    }

    let summary = pipeline.run_batch(&cli.inputs).await;
    print_summary(&summary);

    if summary.succeeded.is_empty() && !summary.failed.is_empty() {
        anyhow::bail!("No input file was transcribed successfully");
    }

    Ok(())
}
