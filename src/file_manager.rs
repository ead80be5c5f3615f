//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei video da hashare.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file video in directory
//! - Espansione degli argomenti CLI (file singoli o directory)
//!
//! ## Formati riconosciuti:
//! - **Video**: MP4, M4V, MOV, AVI, MKV, WebM, FLV, WMV, MPG, MPEG, TS, 3GP
//!
//! I file passati esplicitamente vengono sempre accettati, anche con
//! estensioni sconosciute: sarà ffmpeg a decidere.
//!
//! ## Esempio:
//! ```rust,ignore
//! let videos = FileManager::collect_inputs(&[PathBuf::from("/media/clips")])?;
//! for video in videos {
//!     let (hex, duration) = phex(&video, config.clone()).await?;
//! }
//! ```

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "flv", "wmv", "mpg", "mpeg", "ts", "3gp",
];

/// Manages video discovery
pub struct FileManager;

impl FileManager {
    /// Find all video files below a directory, sorted by path
    pub fn find_video_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Self::is_video(path))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Expand CLI inputs: files are kept as-is, directories are walked
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                files.extend(Self::find_video_files(input)?);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                bail!("Input not found: {}", input.display());
            }
        }

        Ok(files)
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }
}
