//! # Crop Detector
//!
//! Finds the letterbox/pillarbox free region of a video by running ffmpeg's
//! `cropdetect` filter on a few short sub-clips and keeping the most common
//! rectangle.
//!
//! ## Algorithm:
//! 1. `samples` evenly spaced timestamps inside `(0, duration)`
//! 2. one `cropdetect` command per timestamp, decoding `sample_frames` frames
//!    into the `null` muxer
//! 3. all commands run in a single fully parallel batch
//! 4. every `crop=W:H:X:Y` substring of every output joins one multiset
//! 5. the mode wins, ties going to the first value seen with the top count
//!
//! A single sample is noisy (title cards, logos, fades through black); the
//! mode over several samples settles on the stable content rectangle.
//! Finding nothing is the common case and means "do not crop".

use crate::args;
use crate::error::Result;
use crate::runner::BatchRunner;
use crate::utils::evenly_spaced_timestamps;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

fn crop_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"crop=[0-9]{1,4}:[0-9]{1,4}:[0-9]{1,4}:[0-9]{1,4}").expect("valid crop pattern")
    })
}

/// Content region of every frame, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropRectangle {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropRectangle {
    /// Decoder arguments applying this crop
    pub fn filter_args(&self) -> Vec<String> {
        args!["-vf", self]
    }
}

impl fmt::Display for CropRectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for CropRectangle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values = s
            .strip_prefix("crop=")
            .ok_or_else(|| format!("not a crop filter: {}", s))?
            .split(':')
            .map(|v| v.parse::<u32>().map_err(|e| format!("{}: {}", s, e)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [width, height, x, y] => Ok(Self {
                width: *width,
                height: *height,
                x: *x,
                y: *y,
            }),
            _ => Err(format!("expected four crop values: {}", s)),
        }
    }
}

/// Crop decision for one video, `None` meaning frames are used uncropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop(pub Option<CropRectangle>);

impl Crop {
    /// Arguments to splice into an extraction command (`[]` or `["-vf", "crop=..."]`)
    pub fn args(&self) -> Vec<String> {
        self.0.map(|rect| rect.filter_args()).unwrap_or_default()
    }
}

/// Sampling parameters of the detector
#[derive(Debug, Clone)]
pub struct CropDetector<'a> {
    pub decoder: &'a Path,
    pub samples: usize,
    pub sample_frames: usize,
    pub timeout_secs: Option<u64>,
}

impl<'a> CropDetector<'a> {
    pub fn new(decoder: &'a Path) -> Self {
        Self {
            decoder,
            samples: 4,
            sample_frames: 2,
            timeout_secs: None,
        }
    }

    /// Build the `cropdetect` command for each sample timestamp
    pub fn commands(&self, video: &Path, duration: f64) -> Vec<Vec<String>> {
        evenly_spaced_timestamps(duration, self.samples)
            .into_iter()
            .map(|ts| {
                args![
                    self.decoder.display(),
                    "-v",
                    "32",
                    "-hide_banner",
                    "-ss",
                    ts,
                    "-i",
                    video.display(),
                    "-frames:v",
                    self.sample_frames,
                    "-vf",
                    "cropdetect",
                    "-f",
                    "null",
                    "-",
                ]
            })
            .collect()
    }

    /// Detect the crop of `video`
    pub async fn detect(&self, video: &Path, duration: f64) -> Result<Crop> {
        let commands = self.commands(video, duration);
        let outcome = BatchRunner::new(commands.len())
            .with_timeout(self.timeout_secs)
            .run(&commands)
            .await?;

        let texts: Vec<String> = outcome.outputs.iter().map(|o| o.text()).collect();
        let crop = select_crop(texts.iter().map(String::as_str));

        match crop.0 {
            Some(rect) => debug!("Detected crop for {}: {}", video.display(), rect),
            None => debug!("No cropping needed for {}", video.display()),
        }

        Ok(crop)
    }
}

/// Mode of all `crop=W:H:X:Y` matches across the diagnostic outputs
pub fn select_crop<'t>(outputs: impl IntoIterator<Item = &'t str>) -> Crop {
    let mut counts: HashMap<&'t str, usize> = HashMap::new();
    let mut order: Vec<&'t str> = Vec::new();

    for text in outputs {
        for m in crop_regex().find_iter(text) {
            let count = counts.entry(m.as_str()).or_insert(0);
            if *count == 0 {
                order.push(m.as_str());
            }
            *count += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for candidate in order {
        let count = counts[candidate];
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((candidate, count));
        }
    }

    Crop(best.and_then(|(s, _)| s.parse().ok()))
}
