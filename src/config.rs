//! # Configuration Management Module
//!
//! Questo modulo gestisce tutti i parametri della pipeline di hashing.
//!
//! ## Responsabilità:
//! - Definisce la struct `HashConfig` con tutti i parametri del calcolo
//! - Valida i parametri prima di qualsiasi I/O (nessun processo, nessun file)
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `hash_length`: Numero di bit dell'hash (quadrato perfetto >= 4, default: 64)
//! - `frame_count`: Frame campionati dal video (default: 16)
//! - `frame_size`: Lato in pixel di ogni frame (default: 240)
//! - `ffmpeg_threads`: Processi decoder concorrenti per batch (default: 4)
//! - `decoder_path`: Eseguibile ffmpeg (default: "ffmpeg")
//! - `storage_path`: Directory base per lo storage temporaneo (default: temp di sistema)
//! - `maxerrors`: Frame falliti tollerati prima di abortire (default: 1)
//! - `crop_samples` / `crop_sample_frames`: Campionamento del cropdetect (default: 4 / 2)
//! - `process_timeout_secs`: Timeout per singolo processo (default: 120s)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = HashConfig {
//!     hash_length: 256,
//!     ffmpeg_threads: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::{Result, VideoHashError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How sampled frames travel from the decoder back to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Each frame is piped as an encoded image on the decoder's stdout
    #[default]
    Pipe,
    /// Each frame is written to `frames/` in the working storage and read back
    Files,
}

/// Where the video duration is read from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationProbe {
    /// Parse the `Duration: HH:MM:SS.ff` banner printed by the decoder itself
    #[default]
    Banner,
    /// Ask ffprobe for the bare `format=duration` value
    Ffprobe(PathBuf),
}

/// Configuration for one video hash computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Hash length in bits (perfect square, at least 4)
    pub hash_length: usize,
    /// Number of evenly spaced frames sampled from the video
    pub frame_count: usize,
    /// Side length in pixels of every sampled frame
    pub frame_size: u32,
    /// Decoder processes per batch during frame extraction
    pub ffmpeg_threads: usize,
    /// Path or bare name of the ffmpeg executable
    pub decoder_path: PathBuf,
    /// Base directory for the working storage (None = system temp dir)
    pub storage_path: Option<PathBuf>,
    /// Frames allowed to fail before extraction aborts
    pub maxerrors: usize,
    /// Timestamps probed by crop detection
    pub crop_samples: usize,
    /// Frames analyzed per crop detection sample (at least 2)
    pub crop_sample_frames: usize,
    /// Per-process timeout for decoder invocations
    pub process_timeout_secs: Option<u64>,
    /// Frame transport between decoder and pipeline
    pub extract_mode: ExtractMode,
    /// Duration source
    pub duration_probe: DurationProbe,
    /// Write the collage to `collage/collage.jpg` in the working storage
    pub keep_collage: bool,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            hash_length: 64,
            frame_count: 16,
            frame_size: 240,
            ffmpeg_threads: 4,
            decoder_path: PathBuf::from("ffmpeg"),
            storage_path: None,
            maxerrors: 1,
            crop_samples: 4,
            crop_sample_frames: 2,
            process_timeout_secs: Some(120),
            extract_mode: ExtractMode::Pipe,
            duration_probe: DurationProbe::Banner,
            keep_collage: false,
        }
    }
}

impl HashConfig {
    /// Validate configuration parameters.
    ///
    /// Touches the filesystem only to check an explicit `storage_path`.
    pub fn validate(&self) -> Result<()> {
        if self.hash_length < 4 || !is_perfect_square(self.hash_length) {
            return Err(VideoHashError::invalid_config(format!(
                "invalid hash length '{}', must be greater than or equal to 4 and a perfect square",
                self.hash_length
            )));
        }

        if self.frame_count == 0 {
            return Err(VideoHashError::invalid_config("frame count must be greater than 0"));
        }

        if self.frame_size == 0 {
            return Err(VideoHashError::invalid_config("frame size must be greater than 0"));
        }

        if self.ffmpeg_threads == 0 {
            return Err(VideoHashError::invalid_config("ffmpeg threads must be greater than 0"));
        }

        if self.crop_samples == 0 {
            return Err(VideoHashError::invalid_config("crop samples must be greater than 0"));
        }

        if self.crop_sample_frames < 2 {
            return Err(VideoHashError::invalid_config(format!(
                "crop sample frames must be at least two (got '{}')",
                self.crop_sample_frames
            )));
        }

        if self.process_timeout_secs == Some(0) {
            return Err(VideoHashError::invalid_config("process timeout must be greater than 0"));
        }

        if let Some(ref storage_path) = self.storage_path {
            if !storage_path.is_dir() {
                return Err(VideoHashError::StoragePathDoesNotExist(storage_path.clone()));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: HashConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Integer square root (largest `r` with `r * r <= n`)
pub fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

pub fn is_perfect_square(n: usize) -> bool {
    let r = isqrt(n);
    r * r == n
}
