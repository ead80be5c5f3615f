//! # Duration Prober
//!
//! Obtains the exact duration in seconds of a video, which every later stage
//! needs to place its evenly spaced timestamps.
//!
//! ## Probe modes:
//! - `DurationProbe::Banner`: runs `<decoder> -hide_banner -i <video>` and parses
//!   the `Duration: HH:MM:SS.ff,` line (the decoder exits non-zero because no
//!   output is given, which is expected)
//! - `DurationProbe::Ffprobe`: asks ffprobe for the bare `format=duration` value
//!
//! ## Failure classes:
//! - spawn failure: `ToolNotFound` (bad decoder path)
//! - `Duration: N/A` or `N/A`: `DurationCause::NotSpecified` (legitimate, e.g. live captures)
//! - anything else unparseable: `DurationCause::Unreadable` with the raw output
//! - banner mode output without any `Input #` banner: the decoder is checked
//!   with `-version`, so a wrong program gives `ToolMisbehaved`
//! - negative, infinite or NaN values are `Unreadable`

use crate::args;
use crate::config::DurationProbe;
use crate::error::{DurationCause, Result, VideoHashError};
use crate::runner::BatchRunner;
use crate::tool_resolver::verify_decoder;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Start of the container description ffmpeg prints for any opened input
const INPUT_BANNER: &str = "Input #";

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Duration:\s*(\d{1,3}):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid duration pattern")
    })
}

/// Probe the duration of `video` in seconds
pub async fn probe_duration(
    video: &Path,
    decoder: &Path,
    probe: &DurationProbe,
    timeout_secs: Option<u64>,
) -> Result<f64> {
    let runner = BatchRunner::new(1).with_timeout(timeout_secs);

    let cause = match probe {
        DurationProbe::Banner => {
            let command = args![decoder.display(), "-hide_banner", "-i", video.display()];
            let outcome = runner.run(&[command]).await?;
            let text = outcome.outputs[0].text();
            match parse_banner_duration(&text) {
                Ok(seconds) => {
                    debug!("Duration of {}: {}s", video.display(), seconds);
                    return Ok(seconds);
                }
                Err(cause) => {
                    // no input banner either: maybe not ffmpeg at all
                    if !text.contains(INPUT_BANNER) {
                        verify_decoder(decoder, timeout_secs).await?;
                    }
                    cause
                }
            }
        }
        DurationProbe::Ffprobe(ffprobe) => {
            let command = args![
                ffprobe.display(),
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                "-i",
                video.display(),
            ];
            let outcome = runner.run(&[command]).await?;
            let output = &outcome.outputs[0];
            if !output.success() {
                DurationCause::Unreadable(output.text())
            } else {
                match parse_plain_duration(&String::from_utf8_lossy(&output.stdout)) {
                    Ok(seconds) => {
                        debug!("Duration of {} (ffprobe): {}s", video.display(), seconds);
                        return Ok(seconds);
                    }
                    Err(cause) => cause,
                }
            }
        }
    };

    Err(VideoHashError::DurationUnavailable {
        path: video.to_path_buf(),
        cause,
    })
}

/// Parse `Duration: HH:MM:SS.ff` from decoder diagnostic text
pub fn parse_banner_duration(text: &str) -> std::result::Result<f64, DurationCause> {
    if let Some(caps) = duration_regex().captures(text) {
        let hours: f64 = caps[1].parse().unwrap_or_default();
        let minutes: f64 = caps[2].parse().unwrap_or_default();
        let seconds: f64 = caps[3].parse().unwrap_or_default();
        return Ok(round_millis(hours * 3600.0 + minutes * 60.0 + seconds));
    }

    if text.contains("Duration: N/A") {
        return Err(DurationCause::NotSpecified);
    }

    Err(DurationCause::Unreadable(text.trim().to_string()))
}

/// Parse the unlabeled value printed by ffprobe
pub fn parse_plain_duration(text: &str) -> std::result::Result<f64, DurationCause> {
    let value = text.trim();
    if value.is_empty() || value == "N/A" {
        return Err(DurationCause::NotSpecified);
    }
    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(DurationCause::Unreadable(value.to_string())),
    }
}

// 3600 * h + 60 * m + s accumulates float noise (52.080000000000005)
fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
