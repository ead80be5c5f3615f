//! # Working Storage
//!
//! Ephemeral directory tree owned by one hash computation:
//!
//! ```text
//! <base>/vh-<uuid>/
//!     frames/    frame files (file-based extraction only)
//!     collage/   collage.jpg (when kept)
//! ```
//!
//! Nothing removes it implicitly on failure, so a failed run leaves its
//! frames behind for inspection. `delete` is idempotent.

use crate::error::{Result, VideoHashError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const FRAMES_DIR: &str = "frames";
pub const COLLAGE_DIR: &str = "collage";
pub const COLLAGE_FILE: &str = "collage.jpg";

/// Handle on one `vh-<uuid>` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingStorage {
    root: PathBuf,
}

impl WorkingStorage {
    /// Create the scaffold under `base` (system temp dir when `None`)
    pub async fn create(base: Option<&Path>) -> Result<Self> {
        let base = match base {
            Some(base) => {
                if !base.is_dir() {
                    return Err(VideoHashError::StoragePathDoesNotExist(base.to_path_buf()));
                }
                base.to_path_buf()
            }
            None => std::env::temp_dir(),
        };

        let storage = Self {
            root: base.join(format!("vh-{}", Uuid::new_v4())),
        };
        tokio::fs::create_dir_all(storage.frames_dir()).await?;
        tokio::fs::create_dir_all(storage.collage_dir()).await?;

        debug!("Created working storage: {}", storage.root.display());
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join(FRAMES_DIR)
    }

    pub fn collage_dir(&self) -> PathBuf {
        self.root.join(COLLAGE_DIR)
    }

    pub fn collage_path(&self) -> PathBuf {
        self.collage_dir().join(COLLAGE_FILE)
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    /// Recursively remove the whole tree; a missing tree is not an error
    pub async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!("Deleted working storage: {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the tree once `result` is known.
    ///
    /// An error in `result` wins over a cleanup failure, which is only logged.
    pub async fn delete_after<T>(&self, result: Result<T>) -> Result<T> {
        let cleanup = self.delete().await;
        settle(&self.root, result, cleanup)
    }
}

fn settle<T>(root: &Path, result: Result<T>, cleanup: Result<()>) -> Result<T> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_error)) => {
            warn!(
                "Could not delete working storage {}: {}",
                root.display(),
                cleanup_error
            );
            Err(e)
        }
    }
}
