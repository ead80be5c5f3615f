//! # Frame Extractor
//!
//! Samples `frame_count` evenly spaced frames from a video, cropped and
//! scaled to `frame_size x frame_size`, and decodes them in memory.
//!
//! ## Pipeline:
//! 1. crop detection (`crop::CropDetector`)
//! 2. timestamps `duration * i / (frame_count + 1)`, boundaries excluded
//! 3. one decoder command per timestamp, seeking before the input and
//!    emitting exactly one frame
//! 4. all commands through the `BatchRunner` with `ffmpeg_threads` width
//! 5. decode each output; up to `maxerrors` failures become black
//!    placeholders, one more aborts with `FrameExtraction`
//!
//! ## Transport:
//! - `ExtractMode::Pipe`: `-f image2pipe -` on stdout, nothing touches the disk
//! - `ExtractMode::Files`: `frames/frame_<NN>.jpeg` in the working storage
//!
//! Output slot `i` always holds the frame of timestamp `i`, whatever the
//! completion order, so the result does not depend on the thread count.

use crate::args;
use crate::config::{ExtractMode, HashConfig};
use crate::crop::{Crop, CropDetector};
use crate::error::{Result, VideoHashError};
use crate::runner::BatchRunner;
use crate::utils::evenly_spaced_timestamps;
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One sampled frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Ordinal position, matching timestamp order
    pub index: usize,
    /// Seek position in seconds
    pub timestamp: f64,
    pub image: RgbImage,
    /// True when the frame failed to decode and is a black stand-in
    pub placeholder: bool,
}

impl Frame {
    /// Uniformly black frame occupying a failed slot
    pub fn placeholder(index: usize, timestamp: f64, frame_size: u32) -> Self {
        Self {
            index,
            timestamp,
            image: RgbImage::new(frame_size, frame_size),
            placeholder: true,
        }
    }
}

/// Frame sampling for one video
pub struct FrameExtractor<'a> {
    config: &'a HashConfig,
    decoder: &'a Path,
    frames_dir: Option<&'a Path>,
}

impl<'a> FrameExtractor<'a> {
    pub fn new(config: &'a HashConfig, decoder: &'a Path) -> Self {
        Self {
            config,
            decoder,
            frames_dir: None,
        }
    }

    /// Directory receiving frame files in `ExtractMode::Files`
    pub fn with_frames_dir(mut self, frames_dir: &'a Path) -> Self {
        self.frames_dir = Some(frames_dir);
        self
    }

    /// Detect the crop, then extract and decode every frame with it
    pub async fn extract(&self, video: &Path, duration: f64) -> Result<(Crop, Vec<Frame>)> {
        let crop = CropDetector {
            decoder: self.decoder,
            samples: self.config.crop_samples,
            sample_frames: self.config.crop_sample_frames,
            timeout_secs: self.config.process_timeout_secs,
        }
        .detect(video, duration)
        .await?;

        let frames = self.extract_with_crop(video, duration, &crop).await?;
        Ok((crop, frames))
    }

    /// Extract and decode every frame with an already known crop
    pub async fn extract_with_crop(&self, video: &Path, duration: f64, crop: &Crop) -> Result<Vec<Frame>> {
        let timestamps = evenly_spaced_timestamps(duration, self.config.frame_count);
        let frame_paths = self.frame_paths()?;
        let commands = self.commands(video, &timestamps, crop, frame_paths.as_deref());

        info!(
            "Extracting {} frames from {} ({} per batch)",
            commands.len(),
            video.display(),
            self.config.ffmpeg_threads
        );

        let outcome = BatchRunner::new(self.config.ffmpeg_threads)
            .with_timeout(self.config.process_timeout_secs)
            .run(&commands)
            .await?;

        if !outcome.success {
            debug!("Some extraction commands exited with errors for {}", video.display());
        }

        let payloads = match frame_paths {
            None => outcome.outputs.into_iter().map(|o| o.stdout).collect(),
            Some(paths) => {
                let mut payloads = Vec::with_capacity(paths.len());
                for path in &paths {
                    let payload = match tokio::fs::read(path).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            debug!("Cannot read frame file {}: {}", path.display(), e);
                            Vec::new()
                        }
                    };
                    payloads.push(payload);
                }
                payloads
            }
        };

        decode_frames(
            video,
            &payloads,
            &timestamps,
            self.config.frame_size,
            self.config.maxerrors,
        )
    }

    fn frame_paths(&self) -> Result<Option<Vec<PathBuf>>> {
        match self.config.extract_mode {
            ExtractMode::Pipe => Ok(None),
            ExtractMode::Files => {
                let dir = self.frames_dir.ok_or_else(|| {
                    VideoHashError::invalid_config("file-based extraction needs a frames directory")
                })?;
                Ok(Some(
                    (0..self.config.frame_count)
                        .map(|i| dir.join(frame_file_name(i, self.config.frame_count)))
                        .collect(),
                ))
            }
        }
    }

    /// Build one extraction command per timestamp
    pub fn commands(
        &self,
        video: &Path,
        timestamps: &[f64],
        crop: &Crop,
        frame_paths: Option<&[PathBuf]>,
    ) -> Vec<Vec<String>> {
        let size = format!("{}x{}", self.config.frame_size, self.config.frame_size);

        timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                let mut command = args![self.decoder.display(), "-v", 1, "-ss", ts, "-i", video.display()];
                command.extend(crop.args());
                command.extend(args!["-frames:v", 1, "-s", size]);
                match frame_paths {
                    None => command.extend(args!["-f", "image2pipe", "-"]),
                    Some(paths) => command.extend(args!["-y", paths[i].display()]),
                }
                command
            })
            .collect()
    }
}

/// `frame_<index>.jpeg`, zero padded to the digit count of `frame_count`
pub fn frame_file_name(index: usize, frame_count: usize) -> String {
    let width = frame_count.to_string().len();
    format!("frame_{:0width$}.jpeg", index, width = width)
}

/// Decode raw decoder outputs into frames, tolerating up to `maxerrors` failures
pub fn decode_frames(
    video: &Path,
    payloads: &[Vec<u8>],
    timestamps: &[f64],
    frame_size: u32,
    maxerrors: usize,
) -> Result<Vec<Frame>> {
    let mut frames = Vec::with_capacity(payloads.len());
    let mut errors = 0;

    for (index, (bytes, &timestamp)) in payloads.iter().zip(timestamps).enumerate() {
        match image::load_from_memory(bytes) {
            Ok(decoded) => {
                let decoded = if decoded.dimensions() != (frame_size, frame_size) {
                    decoded.resize_exact(frame_size, frame_size, FilterType::Triangle)
                } else {
                    decoded
                };
                frames.push(Frame {
                    index,
                    timestamp,
                    image: decoded.to_rgb8(),
                    placeholder: false,
                });
            }
            Err(e) => {
                if errors < maxerrors {
                    errors += 1;
                    warn!(
                        "Frame #{} at {}s of {} failed to decode ({}), using a blank frame",
                        index,
                        timestamp,
                        video.display(),
                        e
                    );
                    frames.push(Frame::placeholder(index, timestamp, frame_size));
                } else {
                    return Err(VideoHashError::FrameExtraction {
                        path: video.to_path_buf(),
                        index,
                        timestamp,
                        errors: errors + 1,
                    });
                }
            }
        }
    }

    Ok(frames)
}
