//! # Collage Builder
//!
//! Questo modulo compone i frame campionati in un'unica immagine quadrata.
//!
//! ## Disposizione:
//! - lato della griglia `r = isqrt(m)` per `m` frame
//! - canvas nero di `r * frame_size` pixel per lato
//! - frame `i` nella cella (colonna `i mod r`, riga `i div r`), riga per riga
//! - con `m` non quadrato perfetto i frame oltre `r * r` vengono scartati
//!
//! ```text
//! 16 frame, r = 4        13 frame, r = 3 (frame 9..12 scartati)
//! | 0  1  2  3 |         | 0 1 2 |
//! | 4  5  6  7 |         | 3 4 5 |
//! | 8  9 10 11 |         | 6 7 8 |
//! |12 13 14 15 |
//! ```

use crate::config::isqrt;
use crate::error::{Result, VideoHashError};
use crate::extract::Frame;
use image::{imageops, RgbImage};
use std::path::Path;
use tracing::debug;

/// Side length in pixels of the collage of `frame_count` frames
pub fn collage_side(frame_count: usize, frame_size: u32) -> u32 {
    isqrt(frame_count) as u32 * frame_size
}

/// Tile `frames`, in order, into one square image
pub fn make_collage(frames: &[Frame], frame_size: u32) -> Result<RgbImage> {
    if frames.is_empty() {
        return Err(VideoHashError::EmptyCollage);
    }

    let per_row = isqrt(frames.len());
    let side = per_row as u32 * frame_size;
    let mut collage = RgbImage::new(side, side);

    for (i, frame) in frames.iter().take(per_row * per_row).enumerate() {
        let x = (i % per_row) as i64 * frame_size as i64;
        let y = (i / per_row) as i64 * frame_size as i64;
        imageops::replace(&mut collage, &frame.image, x, y);
    }

    debug!(
        "Collage of {}x{} frames ({}px), {} frame(s) dropped",
        per_row,
        per_row,
        side,
        frames.len() - per_row * per_row
    );

    Ok(collage)
}

/// Persist the collage (format from the extension)
pub fn save_collage(collage: &RgbImage, path: &Path) -> Result<()> {
    collage.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frames(count: usize, size: u32) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame {
                index: i,
                timestamp: i as f64 + 1.0,
                image: RgbImage::from_pixel(size, size, Rgb([i as u8 + 1, 0, 0])),
                placeholder: false,
            })
            .collect()
    }

    #[test]
    fn test_collage_side_for_every_count() {
        for count in 1..=40 {
            let collage = make_collage(&frames(count, 4), 4).unwrap();
            let expected = isqrt(count) as u32 * 4;
            assert_eq!(collage.dimensions(), (expected, expected), "count {}", count);
            assert_eq!(collage_side(count, 4), expected);
        }
    }

    #[test]
    fn test_row_major_placement() {
        let collage = make_collage(&frames(16, 4), 4).unwrap();
        // frame 0 top-left, frame 3 top-right, frame 4 starts row two
        assert_eq!(collage.get_pixel(0, 0), &Rgb([1, 0, 0]));
        assert_eq!(collage.get_pixel(13, 2), &Rgb([4, 0, 0]));
        assert_eq!(collage.get_pixel(1, 5), &Rgb([5, 0, 0]));
        assert_eq!(collage.get_pixel(15, 15), &Rgb([16, 0, 0]));
    }

    #[test]
    fn test_extra_frames_dropped() {
        let collage = make_collage(&frames(13, 4), 4).unwrap();
        assert_eq!(collage.dimensions(), (12, 12));
        assert_eq!(collage.get_pixel(11, 11), &Rgb([9, 0, 0]));
    }

    #[test]
    fn test_empty_collage() {
        assert!(matches!(make_collage(&[], 240), Err(VideoHashError::EmptyCollage)));
    }

    #[test]
    fn test_save_collage() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("collage.jpg");
        let collage = make_collage(&frames(4, 8), 8).unwrap();
        save_collage(&collage, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (16, 16));
    }
}
