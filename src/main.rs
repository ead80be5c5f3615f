//! # VideoHash - Main Entry Point
//!
//! Questo è il punto di ingresso della CLI `videohash`.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON + override da CLI)
//! - Hashing di ogni video con progress bar e riepilogo finale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (percorsi, hash length, frame, thread, etc.)
//! 2. Configura il logging (`RUST_LOG`, oppure DEBUG con `--verbose`)
//! 3. Carica la configurazione e la valida prima di toccare i video
//! 4. Espande le directory in elenchi di video
//! 5. Calcola l'hash di ogni video, stampa hex e durata
//! 6. Con `--compare` stampa la distanza di Hamming tra i primi due hash
//!
//! Esce con codice non-zero se anche un solo video fallisce.
//!
//! ## Esempio di utilizzo:
//! ```bash
//! videohash rocket.mkv rocket_reupload.mp4 --compare --threads 8
//! videohash /media/clips --hash-length 256 --json
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use videohash::json_output::JsonMessage;
use videohash::progress::{HashStats, ProgressManager};
use videohash::{ExtractMode, FileManager, HashConfig, VideoHash, WorkingStorage};

#[derive(Parser)]
#[command(name = "videohash")]
#[command(about = "Perceptual hashes of video files for near-duplicate detection")]
struct Args {
    /// Video files or directories (searched recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// JSON configuration file (CLI flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hash length in bits (perfect square >= 4)
    #[arg(short = 'l', long)]
    hash_length: Option<usize>,

    /// Number of frames sampled from each video
    #[arg(short = 'n', long)]
    frame_count: Option<usize>,

    /// Side in pixels of each sampled frame
    #[arg(short = 's', long)]
    frame_size: Option<u32>,

    /// Concurrent decoder processes
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Path of the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Base directory for working storage (default: system temp dir)
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Failed frames tolerated before giving up on a video
    #[arg(long)]
    max_errors: Option<usize>,

    /// Extract frames through files instead of a pipe
    #[arg(long)]
    files: bool,

    /// Keep the working storage with collage.jpg
    #[arg(long)]
    keep_collage: bool,

    /// One JSON message per line instead of text output
    #[arg(long)]
    json: bool,

    /// Print the Hamming distance between the first two hashes
    #[arg(short, long)]
    compare: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    async fn hash_config(&self) -> Result<HashConfig> {
        let mut config = match &self.config {
            Some(path) => HashConfig::from_file(path)
                .await
                .with_context(|| format!("Cannot load configuration: {}", path.display()))?,
            None => HashConfig::default(),
        };

        if let Some(hash_length) = self.hash_length {
            config.hash_length = hash_length;
        }
        if let Some(frame_count) = self.frame_count {
            config.frame_count = frame_count;
        }
        if let Some(frame_size) = self.frame_size {
            config.frame_size = frame_size;
        }
        if let Some(threads) = self.threads {
            config.ffmpeg_threads = threads;
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            config.decoder_path = ffmpeg.clone();
        }
        if let Some(storage) = &self.storage {
            config.storage_path = Some(storage.clone());
        }
        if let Some(max_errors) = self.max_errors {
            config.maxerrors = max_errors;
        }
        if self.files {
            config.extract_mode = ExtractMode::Files;
        }
        if self.keep_collage {
            config.keep_collage = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Hash one video; the storage survives only when the collage is kept
async fn hash_video(path: &Path, config: &HashConfig) -> videohash::Result<VideoHash> {
    let storage = WorkingStorage::create(config.storage_path.as_deref()).await?;
    match VideoHash::with_storage(path, config.clone(), storage.clone()).await {
        Ok(mut vh) => {
            if !config.keep_collage {
                vh.delete_storage_path().await?;
            }
            Ok(vh)
        }
        Err(e) => storage.delete_after(Err(e)).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match args.hash_config().await {
        Ok(config) => config,
        Err(e) => {
            if args.json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            }
            return Err(e);
        }
    };
    let videos = FileManager::collect_inputs(&args.paths)?;
    if videos.is_empty() {
        bail!("No video files found");
    }

    info!("Hashing {} video(s)", videos.len());
    if args.json {
        JsonMessage::start(videos.len(), &config).emit();
    }

    let started = Instant::now();
    let progress = if args.json {
        ProgressManager::hidden()
    } else {
        ProgressManager::new(videos.len() as u64)
    };
    let mut stats = HashStats::new();
    let mut hashes: Vec<VideoHash> = Vec::new();

    for video in &videos {
        let name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| video.display().to_string());
        progress.set_message(&name);

        match hash_video(video, &config).await {
            Ok(vh) => {
                stats.add_hashed(vh.duration());
                if args.json {
                    let kept = config.keep_collage.then(|| vh.storage_path().to_path_buf());
                    JsonMessage::hashed(&vh, kept).emit();
                } else {
                    progress.println(&format!(
                        "{}  {:>10.2}s  {}",
                        vh.hash_hex(),
                        vh.duration(),
                        vh.video_path().display()
                    ));
                    if config.keep_collage {
                        progress.println(&format!("    collage: {}", vh.storage().collage_path().display()));
                    }
                }
                progress.update(&format!("{}: {}", name, vh.hash_hex()));
                hashes.push(vh);
            }
            Err(e) => {
                stats.add_error();
                error!("{}: {}", video.display(), e);
                if args.json {
                    JsonMessage::failed(video.clone(), e.to_string()).emit();
                }
                progress.update(&format!("❌ {}", name));
            }
        }
    }

    progress.finish(&stats.format_summary());

    if args.compare {
        match hashes.as_slice() {
            [first, second, ..] => {
                let distance = first.hamming_distance(second)?;
                if args.json {
                    JsonMessage::compare(
                        first.video_path().to_path_buf(),
                        second.video_path().to_path_buf(),
                        distance,
                    )
                    .emit();
                } else {
                    println!(
                        "Hamming distance {} / {} bits: {} <-> {}",
                        distance,
                        first.hash().len(),
                        first.video_path().display(),
                        second.video_path().display()
                    );
                }
            }
            _ => error!("--compare needs at least two hashed videos"),
        }
    }

    if args.json {
        JsonMessage::complete(&stats, started.elapsed().as_secs_f64()).emit();
    } else {
        info!("{}", stats.format_summary());
    }

    if stats.has_errors() {
        bail!("{} of {} video(s) failed", stats.errors, stats.files_processed);
    }

    Ok(())
}
