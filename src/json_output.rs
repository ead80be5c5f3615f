//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (`--json`), una riga
//! per messaggio, per l'uso da script e altri processi.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del run con la configurazione effettiva
//! - `file_complete`: Hash (o errore) di un video
//! - `compare`: Distanza di Hamming tra i primi due hash
//! - `complete`: Fine run con statistiche finali
//! - `error`: Errore generale

use crate::config::{ExtractMode, HashConfig};
use crate::progress::HashStats;
use crate::videohash::VideoHash;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del run
    #[serde(rename = "start")]
    Start {
        total_files: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un video
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        hash: Option<String>,
        bits: Option<String>,
        duration: Option<f64>,
        storage: Option<PathBuf>,
        error: Option<String>,
    },

    /// Confronto tra due hash
    #[serde(rename = "compare")]
    Compare {
        first: PathBuf,
        second: PathBuf,
        distance: u32,
    },

    /// Run completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_hashed: usize,
        errors: usize,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub hash_length: usize,
    pub frame_count: usize,
    pub frame_size: u32,
    pub ffmpeg_threads: usize,
    pub maxerrors: usize,
    pub extract_mode: ExtractMode,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_files: usize, config: &HashConfig) -> Self {
        Self::Start {
            total_files,
            config: config.into(),
        }
    }

    /// Messaggio di successo; `storage` solo se la directory è stata conservata
    pub fn hashed(vh: &VideoHash, storage: Option<PathBuf>) -> Self {
        Self::FileComplete {
            path: vh.video_path().to_path_buf(),
            hash: Some(vh.hash_hex().to_string()),
            bits: Some(vh.hash().to_bit_string()),
            duration: Some(vh.duration()),
            storage,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, error: String) -> Self {
        Self::FileComplete {
            path,
            hash: None,
            bits: None,
            duration: None,
            storage: None,
            error: Some(error),
        }
    }

    pub fn compare(first: PathBuf, second: PathBuf, distance: u32) -> Self {
        Self::Compare {
            first,
            second,
            distance,
        }
    }

    pub fn complete(stats: &HashStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_hashed: stats.files_hashed,
            errors: stats.errors,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&HashConfig> for JsonConfig {
    fn from(config: &HashConfig) -> Self {
        Self {
            hash_length: config.hash_length,
            frame_count: config.frame_count,
            frame_size: config.frame_size,
            ffmpeg_threads: config.ffmpeg_threads,
            maxerrors: config.maxerrors,
            extract_mode: config.extract_mode,
        }
    }
}
