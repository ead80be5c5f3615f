//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della pipeline di hashing.
//!
//! ## Responsabilità:
//! - Definisce `VideoHashError` enum per categorizzare tutti gli errori possibili
//! - Ogni condizione fatale ha un variant con nome proprio (mai un errore generico)
//! - Ogni variant porta path/timestamp/valore utili per la diagnosi
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `ToolNotFound`: eseguibile del decoder mancante o non eseguibile
//! - `ToolMisbehaved`: l'eseguibile esiste ma non risponde come ffmpeg
//! - `DurationUnavailable`: durata non leggibile, nessun hash possibile
//! - `FrameExtraction`: troppi frame falliti rispetto a `maxerrors`
//! - `InvalidConfiguration`: parametri non validi, controllati prima di ogni I/O
//! - `EmptyCollage`: collage richiesto su zero frame
//! - `InvalidHash`: hash esadecimale malformato o di lunghezza diversa
//! - `Io` / `Image` / `Json`: conversioni automatiche da errori standard
//!
//! ## Esempio:
//! ```rust,ignore
//! if !is_perfect_square(hash_length) {
//!     return Err(VideoHashError::InvalidConfiguration(
//!         format!("invalid hash length {hash_length}")
//!     ));
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, VideoHashError>;

/// Custom error types for video hashing
#[derive(thiserror::Error, Debug)]
pub enum VideoHashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool not found or not executable: {tool}")]
    ToolNotFound { tool: String },

    #[error("Unexpected response from '{tool}': {output}")]
    ToolMisbehaved { tool: String, output: String },

    #[error("Cannot generate a hash without a duration for '{}': {cause}", path.display())]
    DurationUnavailable { path: PathBuf, cause: DurationCause },

    #[error(
        "Too many errors extracting frames from '{}' ({errors} failed), most recently frame #{index} at timestamp {timestamp}",
        path.display()
    )]
    FrameExtraction {
        path: PathBuf,
        index: usize,
        timestamp: f64,
        errors: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid hash value: {0}")]
    InvalidHash(String),

    #[error("Can not make a collage of zero frames")]
    EmptyCollage,

    #[error("No video found at '{}'", .0.display())]
    VideoNotFound(PathBuf),

    #[error("Storage path does not exist: {}", .0.display())]
    StoragePathDoesNotExist(PathBuf),
}

/// Why a duration could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationCause {
    /// The prober ran fine but the container carries no duration.
    NotSpecified,
    /// The prober output did not contain anything that parses as a duration.
    Unreadable(String),
}

impl fmt::Display for DurationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSpecified => write!(f, "no duration specified on the first video stream"),
            Self::Unreadable(output) => write!(f, "could not read duration from prober output:\n{}", output),
        }
    }
}

impl VideoHashError {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool misbehaved error.
    pub fn tool_misbehaved(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolMisbehaved {
            tool: tool.into(),
            output: output.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
