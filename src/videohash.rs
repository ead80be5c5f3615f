//! # VideoHash
//!
//! Entry point of the library: runs the whole pipeline for one video.
//!
//! ## Stages:
//! `Created -> DurationResolved -> FfmpegVerified -> FramesExtracted -> CollageBuilt -> Hashed -> (Cleaned)`
//!
//! Every transition is one-way. A failing stage returns its typed error and
//! leaves the working storage on disk; only `delete_storage_path` (or the
//! `phash`/`phex` helpers) remove it.
//!
//! ## Example:
//! ```rust,ignore
//! let mut vh = VideoHash::new("rocket.mkv", HashConfig::default()).await?;
//! println!("{} ({}s)", vh.hash_hex(), vh.duration());
//! vh.delete_storage_path().await?;
//!
//! let (hex, duration) = phex("rocket.mkv", HashConfig::default()).await?;
//! ```

use crate::collage::{make_collage, save_collage};
use crate::config::HashConfig;
use crate::crop::Crop;
use crate::duration::probe_duration;
use crate::error::{Result, VideoHashError};
use crate::extract::FrameExtractor;
use crate::hash::{hash_collage, HashValue};
use crate::storage::WorkingStorage;
use crate::tool_resolver::{resolve_tool, verify_decoder};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Progress of one computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    DurationResolved,
    FfmpegVerified,
    FramesExtracted,
    CollageBuilt,
    Hashed,
    Cleaned,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::DurationResolved => "duration resolved",
            Self::FfmpegVerified => "ffmpeg verified",
            Self::FramesExtracted => "frames extracted",
            Self::CollageBuilt => "collage built",
            Self::Hashed => "hashed",
            Self::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Perceptual hash of one video, plus what was learned computing it
#[derive(Debug)]
pub struct VideoHash {
    video_path: PathBuf,
    duration: f64,
    decoder_version: String,
    crop: Crop,
    placeholders: usize,
    hash: HashValue,
    config: HashConfig,
    storage: WorkingStorage,
    stage: Stage,
}

impl VideoHash {
    /// Hash `video_path`, creating fresh working storage.
    ///
    /// The configuration is validated before the video is even looked at.
    pub async fn new(video_path: impl AsRef<Path>, config: HashConfig) -> Result<Self> {
        config.validate()?;
        let video_path = resolve_video(video_path.as_ref()).await?;
        let storage = WorkingStorage::create(config.storage_path.as_deref()).await?;
        Self::run(video_path, config, storage).await
    }

    /// Hash `video_path` inside caller-provided working storage
    pub async fn with_storage(
        video_path: impl AsRef<Path>,
        config: HashConfig,
        storage: WorkingStorage,
    ) -> Result<Self> {
        config.validate()?;
        let video_path = resolve_video(video_path.as_ref()).await?;
        Self::run(video_path, config, storage).await
    }

    async fn run(video_path: PathBuf, config: HashConfig, storage: WorkingStorage) -> Result<Self> {
        let mut stage = Stage::Created;
        match Self::pipeline(&video_path, config, storage, &mut stage).await {
            Ok(vh) => Ok(vh),
            Err(e) => {
                warn!(
                    "Hashing {} failed after stage '{}': {}",
                    video_path.display(),
                    stage,
                    e
                );
                Err(e)
            }
        }
    }

    async fn pipeline(
        video_path: &Path,
        config: HashConfig,
        storage: WorkingStorage,
        stage: &mut Stage,
    ) -> Result<Self> {
        let decoder = resolve_tool(&config.decoder_path);
        let timeout = config.process_timeout_secs;

        let duration = probe_duration(video_path, &decoder, &config.duration_probe, timeout).await?;
        advance(stage, Stage::DurationResolved);

        let decoder_version = verify_decoder(&decoder, timeout).await?;
        advance(stage, Stage::FfmpegVerified);

        let frames_dir = storage.frames_dir();
        let (crop, frames) = FrameExtractor::new(&config, &decoder)
            .with_frames_dir(&frames_dir)
            .extract(video_path, duration)
            .await?;
        let placeholders = frames.iter().filter(|f| f.placeholder).count();
        advance(stage, Stage::FramesExtracted);

        let collage = make_collage(&frames, config.frame_size)?;
        if config.keep_collage {
            save_collage(&collage, &storage.collage_path())?;
        }
        advance(stage, Stage::CollageBuilt);

        let hash = hash_collage(&collage, config.hash_length)?;
        advance(stage, Stage::Hashed);

        info!("{} -> {} ({}s)", video_path.display(), hash, duration);

        Ok(Self {
            video_path: video_path.to_path_buf(),
            duration,
            decoder_version,
            crop,
            placeholders,
            hash,
            config,
            storage,
            stage: *stage,
        })
    }

    /// Absolute path of the hashed video
    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn hash(&self) -> &HashValue {
        &self.hash
    }

    pub fn hash_bits(&self) -> &[bool] {
        self.hash.bits()
    }

    pub fn hash_hex(&self) -> &str {
        self.hash.hex()
    }

    /// Crop applied to every frame
    pub fn crop(&self) -> Crop {
        self.crop
    }

    /// Frames replaced by black placeholders
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    /// First line of `<decoder> -version`
    pub fn decoder_version(&self) -> &str {
        &self.decoder_version
    }

    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    pub fn storage(&self) -> &WorkingStorage {
        &self.storage
    }

    pub fn storage_path(&self) -> &Path {
        self.storage.root()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Remove the working storage; safe to call repeatedly
    pub async fn delete_storage_path(&mut self) -> Result<()> {
        self.storage.delete().await?;
        advance(&mut self.stage, Stage::Cleaned);
        Ok(())
    }

    /// Bit difference with another video's hash
    pub fn hamming_distance(&self, other: &VideoHash) -> Result<u32> {
        self.hash.hamming_distance(&other.hash)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    if *stage != next {
        debug!("Stage: {} -> {}", stage, next);
        *stage = next;
    }
}

async fn resolve_video(video_path: &Path) -> Result<PathBuf> {
    let resolved = tokio::fs::canonicalize(video_path)
        .await
        .map_err(|_| VideoHashError::VideoNotFound(video_path.to_path_buf()))?;
    if !resolved.is_file() {
        return Err(VideoHashError::VideoNotFound(resolved));
    }
    Ok(resolved)
}

async fn hash_and_cleanup(video_path: &Path, config: HashConfig) -> Result<(HashValue, f64)> {
    config.validate()?;
    let video_path = resolve_video(video_path).await?;
    let storage = WorkingStorage::create(config.storage_path.as_deref()).await?;

    let result = VideoHash::run(video_path, config, storage.clone()).await;
    let vh = storage.delete_after(result).await?;
    Ok((vh.hash, vh.duration))
}

/// Hash bits and duration of a video; working storage is always removed
pub async fn phash(video_path: impl AsRef<Path>, config: HashConfig) -> Result<(Vec<bool>, f64)> {
    let (hash, duration) = hash_and_cleanup(video_path.as_ref(), config).await?;
    Ok((hash.bits().to_vec(), duration))
}

/// Hex hash and duration of a video; working storage is always removed
pub async fn phex(video_path: impl AsRef<Path>, config: HashConfig) -> Result<(String, f64)> {
    let (hash, duration) = hash_and_cleanup(video_path.as_ref(), config).await?;
    Ok((hash.hex().to_string(), duration))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ExtractMode;
    use crate::crop::CropRectangle;
    use image::{Rgb, RgbImage};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const STUB: &str = r#"#!/bin/sh
ss=0
mode=probe
out=""
while [ $# -gt 0 ]; do
    case "$1" in
        -version) echo "ffmpeg version 6.1-stub Copyright (c) 2000-2023 the FFmpeg developers"; exit 0 ;;
        -ss) ss="$2"; shift ;;
        cropdetect) mode=crop ;;
        image2pipe) mode=pipe ;;
        -y) mode=file; out="$2"; shift ;;
    esac
    shift
done
case "$mode" in
    probe)
        echo "Input #0, matroska,webm, from 'video.mkv':" >&2
        echo "  Duration: @DURATION@, start: 0.000000, bitrate: 1534 kb/s" >&2
        echo "At least one output file must be specified" >&2
        exit 1 ;;
    crop)
        echo "[Parsed_cropdetect_0 @ 0x5581] x1:0 x2:479 y1:112 y2:367 w:480 h:256 x:0 y:112 pts:1 t:0.040000 crop=480:256:0:112" >&2
        exit 0 ;;
esac
if awk -v t="$ss" -v l="@LAST@" 'BEGIN { exit !(t + 0 > l + 0) }'; then
    echo "Output file is empty, nothing was encoded" >&2
    exit 1
fi
frame="@DIR@/dark.png"
if awk -v t="$ss" 'BEGIN { exit !(t + 0 > 26) }'; then
    frame="@DIR@/light.png"
fi
if [ "$mode" = file ]; then
    cp "$frame" "$out"
else
    cat "$frame"
fi
"#;

    struct Fixture {
        dir: TempDir,
        decoder: PathBuf,
        video: PathBuf,
    }

    /// Fake decoder answering like ffmpeg; seeks past `last` produce no frame
    fn fixture(duration: &str, last: f64) -> Fixture {
        let dir = TempDir::new().unwrap();

        let dark = RgbImage::from_fn(16, 16, |x, _| Rgb([(x * 8) as u8, 40, 40]));
        let light = RgbImage::from_fn(16, 16, |_, y| Rgb([220, (y * 12) as u8, 200]));
        dark.save(dir.path().join("dark.png")).unwrap();
        light.save(dir.path().join("light.png")).unwrap();

        let script = STUB
            .replace("@DURATION@", duration)
            .replace("@LAST@", &last.to_string())
            .replace("@DIR@", &dir.path().display().to_string());
        let decoder = dir.path().join("ffmpeg");
        std::fs::write(&decoder, script).unwrap();
        std::fs::set_permissions(&decoder, std::fs::Permissions::from_mode(0o755)).unwrap();

        let video = dir.path().join("video.mkv");
        std::fs::write(&video, b"matroska").unwrap();

        Fixture { dir, decoder, video }
    }

    fn config(f: &Fixture, base: &Path) -> HashConfig {
        HashConfig {
            frame_size: 16,
            decoder_path: f.decoder.clone(),
            storage_path: Some(base.to_path_buf()),
            process_timeout_secs: Some(30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();

        let mut vh = VideoHash::new(&f.video, config(&f, base.path())).await.unwrap();

        assert_eq!(vh.video_path(), f.video.canonicalize().unwrap());
        assert_eq!(vh.duration(), 52.08);
        assert_eq!(vh.stage(), Stage::Hashed);
        assert_eq!(
            vh.crop().0,
            Some(CropRectangle { width: 480, height: 256, x: 0, y: 112 })
        );
        assert_eq!(vh.hash_bits().len(), 64);
        assert_eq!(vh.hash_hex().len(), 16);
        assert_eq!(vh.placeholders(), 0);
        assert!(vh.decoder_version().starts_with("ffmpeg version"));
        assert_eq!(vh.storage_path().parent(), Some(base.path()));
        assert!(vh.storage().frames_dir().is_dir());

        vh.delete_storage_path().await.unwrap();
        assert_eq!(vh.stage(), Stage::Cleaned);
        vh.delete_storage_path().await.unwrap();
        assert!(std::fs::read_dir(base.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_hash_stable_across_thread_counts() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();

        let mut results = Vec::new();
        for threads in [1, 4, 8, 16] {
            let config = HashConfig {
                ffmpeg_threads: threads,
                ..config(&f, base.path())
            };
            results.push(phex(&f.video, config).await.unwrap());
        }

        assert!(results.windows(2).all(|w| w[0] == w[1]), "{:?}", results);
        assert!(std::fs::read_dir(base.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_phash_matches_phex() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();

        let (bits, duration) = phash(&f.video, config(&f, base.path())).await.unwrap();
        let (hex, _) = phex(&f.video, config(&f, base.path())).await.unwrap();
        assert_eq!(duration, 52.08);
        assert_eq!(HashValue::from_bits(bits).hex(), hex);
    }

    #[tokio::test]
    async fn test_file_extraction_matches_pipe() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();

        let (piped, _) = phex(&f.video, config(&f, base.path())).await.unwrap();

        let files_config = HashConfig {
            extract_mode: ExtractMode::Files,
            keep_collage: true,
            ..config(&f, base.path())
        };
        let mut vh = VideoHash::new(&f.video, files_config).await.unwrap();
        assert_eq!(vh.hash_hex(), piped);
        assert_eq!(std::fs::read_dir(vh.storage().frames_dir()).unwrap().count(), 16);
        assert!(vh.storage().frames_dir().join("frame_07.jpeg").is_file());
        assert!(vh.storage().collage_path().is_file());
        vh.delete_storage_path().await.unwrap();
    }

    #[tokio::test]
    async fn test_last_frame_failure_tolerance() {
        // 57s declared, frames after 52.08s come back empty: only #15 fails
        let f = fixture("00:00:57.00", 52.08);
        let base = TempDir::new().unwrap();

        let strict = HashConfig {
            maxerrors: 0,
            ..config(&f, base.path())
        };
        let err = phex(&f.video, strict).await.unwrap_err();
        assert!(matches!(err, VideoHashError::FrameExtraction { index: 15, .. }));

        let tolerant = HashConfig {
            maxerrors: 1,
            ..config(&f, base.path())
        };
        let mut vh = VideoHash::new(&f.video, tolerant).await.unwrap();
        assert_eq!(vh.placeholders(), 1);
        vh.delete_storage_path().await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_keeps_storage() {
        let f = fixture("00:00:57.00", 52.08);
        let base = TempDir::new().unwrap();

        let strict = HashConfig {
            maxerrors: 0,
            ..config(&f, base.path())
        };
        assert!(VideoHash::new(&f.video, strict).await.is_err());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_no_duration_stops_before_extraction() {
        let f = fixture("N/A", 1000.0);
        let base = TempDir::new().unwrap();

        let err = VideoHash::new(&f.video, config(&f, base.path())).await.unwrap_err();
        assert!(matches!(
            err,
            VideoHashError::DurationUnavailable {
                cause: crate::error::DurationCause::NotSpecified,
                ..
            }
        ));

        let storage = std::fs::read_dir(base.path()).unwrap().next().unwrap().unwrap().path();
        assert!(std::fs::read_dir(storage.join("frames")).unwrap().next().is_none());
        assert!(std::fs::read_dir(storage.join("collage")).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_invalid_hash_length_before_video_access() {
        let base = TempDir::new().unwrap();
        for hash_length in [1, 5] {
            let config = HashConfig {
                hash_length,
                storage_path: Some(base.path().to_path_buf()),
                ..Default::default()
            };
            let err = VideoHash::new("/no/such/video.mkv", config).await.unwrap_err();
            assert!(matches!(err, VideoHashError::InvalidConfiguration(_)));
        }
        assert!(std::fs::read_dir(base.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_missing_video() {
        let err = VideoHash::new("/no/such/video.mkv", HashConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VideoHashError::VideoNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_decoder() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();
        let config = HashConfig {
            decoder_path: f.dir.path().join("no-ffmpeg-here"),
            ..config(&f, base.path())
        };

        let err = phex(&f.video, config).await.unwrap_err();
        assert!(matches!(err, VideoHashError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_wrong_decoder_program() {
        let f = fixture("00:00:52.08", 1000.0);
        let base = TempDir::new().unwrap();
        let python = f.dir.path().join("python");
        std::fs::write(&python, "#!/bin/sh\necho 'Python 3.12.1'\n").unwrap();
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = HashConfig {
            decoder_path: python,
            ..config(&f, base.path())
        };
        let err = phex(&f.video, config).await.unwrap_err();
        match err {
            VideoHashError::ToolMisbehaved { output, .. } => assert!(output.contains("Python")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(std::fs::read_dir(base.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_missing_frame_file_within_tolerance() {
        let f = fixture("00:00:57.00", 52.08);
        let base = TempDir::new().unwrap();

        let config = HashConfig {
            extract_mode: ExtractMode::Files,
            maxerrors: 1,
            ..config(&f, base.path())
        };
        let mut vh = VideoHash::new(&f.video, config).await.unwrap();
        assert_eq!(vh.placeholders(), 1);
        assert!(!vh.storage().frames_dir().join("frame_15.jpeg").exists());
        vh.delete_storage_path().await.unwrap();
    }
}
