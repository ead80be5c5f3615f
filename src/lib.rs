//! # VideoHash Library
//!
//! Perceptual hashing of video files: visually similar videos (re-encoded,
//! rescaled, letterboxed, watermarked) get hashes at a small Hamming distance.
//!
//! ## Pipeline:
//! 1. durata del video dal banner di ffmpeg (`duration`)
//! 2. rilevamento del crop con `cropdetect` (`crop`)
//! 3. estrazione parallela di frame equidistanti (`runner`, `extract`)
//! 4. collage quadrato dei frame (`collage`)
//! 5. pHash DCT del collage (`hash`)
//!
//! ## Architettura dei moduli:
//! - `config`: Parametri della pipeline e validazione
//! - `error`: Tipi di errore della libreria
//! - `utils`: Helper per vettori di argomenti e timestamp
//! - `tool_resolver`: Risoluzione e verifica dell'eseguibile ffmpeg
//! - `runner`: Esecuzione di processi a batch con larghezza fissa
//! - `storage`: Directory di lavoro temporanea per un calcolo
//! - `videohash`: Facciata `VideoHash`, `phash` e `phex`
//! - `file_manager`, `progress`, `json_output`: supporto alla CLI
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use videohash::{phex, HashConfig};
//!
//! let (a, _) = phex("rocket.mkv", HashConfig::default()).await?;
//! let (b, _) = phex("rocket_720p.mp4", HashConfig::default()).await?;
//! println!("distance: {}", videohash::hamming_hex(&a, &b)?);
//! ```

pub mod collage;
pub mod config;
pub mod crop;
pub mod duration;
pub mod error;
pub mod extract;
pub mod file_manager;
pub mod hash;
pub mod json_output;
pub mod progress;
pub mod runner;
pub mod storage;
pub mod tool_resolver;
pub mod utils;
pub mod videohash;

pub use config::{DurationProbe, ExtractMode, HashConfig};
pub use crop::{Crop, CropRectangle};
pub use error::{DurationCause, Result, VideoHashError};
pub use file_manager::FileManager;
pub use hash::{hamming_hex, HashValue};
pub use storage::WorkingStorage;
pub use videohash::{phash, phex, Stage, VideoHash};
