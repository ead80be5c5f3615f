//! # Hash Engine
//!
//! Turns a collage into the video's perceptual hash and compares hashes.
//!
//! The image hash is a DCT based pHash (`image_hasher`, mean of the low
//! frequency block after DCT preprocessing) on a `isqrt(hash_length)` square
//! grid. Its bit matrix is flattened row-major into exactly `hash_length`
//! booleans; the hex rendering packs them most significant bit first.
//!
//! ## Example:
//! ```rust,ignore
//! let a = hash_collage(&collage_a, 64)?;
//! let b = hash_collage(&collage_b, 64)?;
//! let similar = a.hamming_distance(&b)? <= 10;
//! ```

use crate::config::{is_perfect_square, isqrt};
use crate::error::{Result, VideoHashError};
use image::{DynamicImage, RgbImage};
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-length perceptual hash of a video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashValue {
    bits: Vec<bool>,
    hex: String,
}

impl HashValue {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        let hex = bits_to_hex(&bits);
        Self { bits, hex }
    }

    /// Parse the hex rendering of a `bit_len` bit hash
    pub fn from_hex(hex_str: &str, bit_len: usize) -> Result<Self> {
        let digits = (bit_len + 3) / 4;
        if hex_str.len() != digits {
            return Err(VideoHashError::InvalidHash(format!(
                "expected {} hex digits for {} bits, got '{}'",
                digits, bit_len, hex_str
            )));
        }

        let padded = if hex_str.len() % 2 == 1 {
            format!("0{}", hex_str)
        } else {
            hex_str.to_string()
        };
        let bytes = hex::decode(&padded)
            .map_err(|e| VideoHashError::InvalidHash(format!("'{}': {}", hex_str, e)))?;

        let all_bits: Vec<bool> = bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        let (padding, bits) = all_bits.split_at(all_bits.len() - bit_len);
        if padding.iter().any(|&bit| bit) {
            return Err(VideoHashError::InvalidHash(format!(
                "'{}' does not fit in {} bits",
                hex_str, bit_len
            )));
        }

        Ok(Self::from_bits(bits.to_vec()))
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// `0b`-prefixed bit string
    pub fn to_bit_string(&self) -> String {
        let mut s = String::with_capacity(self.bits.len() + 2);
        s.push_str("0b");
        s.extend(self.bits.iter().map(|&bit| if bit { '1' } else { '0' }));
        s
    }

    /// Number of differing bit positions
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.bits.len() != other.bits.len() {
            return Err(VideoHashError::InvalidHash(format!(
                "hashes must be the same length ({} vs {} bits)",
                self.bits.len(),
                other.bits.len()
            )));
        }

        Ok(self
            .bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| a != b)
            .count() as u32)
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Hamming distance of two hex-rendered hashes of equal length
pub fn hamming_hex(a: &str, b: &str) -> Result<u32> {
    let bit_len = a.len() * 4;
    HashValue::from_hex(a, bit_len)?.hamming_distance(&HashValue::from_hex(b, bit_len)?)
}

/// Hex digits for `bits`, MSB first, zero padded on the left to whole nibbles
pub fn bits_to_hex(bits: &[bool]) -> String {
    let byte_count = (bits.len() + 7) / 8;
    let padding = byte_count * 8 - bits.len();

    let mut bytes = vec![0u8; byte_count];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            let pos = i + padding;
            bytes[pos / 8] |= 0x80 >> (pos % 8);
        }
    }

    let encoded = hex::encode(bytes);
    let digits = (bits.len() + 3) / 4;
    encoded[encoded.len() - digits..].to_string()
}

/// Perceptual hash of a collage, `hash_length` bits long
pub fn hash_collage(collage: &RgbImage, hash_length: usize) -> Result<HashValue> {
    if hash_length < 4 || !is_perfect_square(hash_length) {
        return Err(VideoHashError::invalid_config(format!(
            "invalid hash length '{}', must be greater than or equal to 4 and a perfect square",
            hash_length
        )));
    }

    let grid = isqrt(hash_length) as u32;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .preproc_dct()
        .hash_size(grid, grid)
        .to_hasher();

    let hash = hasher.hash_image(&DynamicImage::ImageRgb8(collage.clone()));

    // packed least significant bit first
    let bits = hash
        .as_bytes()
        .iter()
        .flat_map(|byte| (0..8).map(move |shift| (byte >> shift) & 1 == 1))
        .take(hash_length)
        .collect::<Vec<_>>();

    if bits.len() != hash_length {
        return Err(VideoHashError::InvalidHash(format!(
            "image hash produced {} bits, expected {}",
            bits.len(),
            hash_length
        )));
    }

    Ok(HashValue::from_bits(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgb([v, v / 2, 255 - v])
        })
    }

    #[test]
    fn test_hash_lengths() {
        let img = gradient(96);
        for hash_length in [4, 9, 16, 25, 64, 256] {
            let hash = hash_collage(&img, hash_length).unwrap();
            assert_eq!(hash.len(), hash_length);
            assert_eq!(hash.hex().len(), (hash_length + 3) / 4);
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let img = gradient(64);
        let a = hash_collage(&img, 64).unwrap();
        let b = hash_collage(&img, 64).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hamming_distance(&b).unwrap(), 0);
    }

    #[test]
    fn test_invalid_hash_length() {
        let img = gradient(16);
        assert!(matches!(hash_collage(&img, 1), Err(VideoHashError::InvalidConfiguration(_))));
        assert!(matches!(hash_collage(&img, 5), Err(VideoHashError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_bits_to_hex() {
        let bits: Vec<bool> = "1010110010101100".chars().map(|c| c == '1').collect();
        assert_eq!(bits_to_hex(&bits), "acac");

        let nine: Vec<bool> = "100000001".chars().map(|c| c == '1').collect();
        assert_eq!(bits_to_hex(&nine), "101");

        assert_eq!(bits_to_hex(&[false, false, true, true]), "3");
    }

    #[test]
    fn test_hex_parse() {
        let hash = HashValue::from_hex("acac", 16).unwrap();
        assert_eq!(hash.to_bit_string(), "0b1010110010101100");

        let nine = HashValue::from_hex("101", 9).unwrap();
        assert_eq!(nine.to_bit_string(), "0b100000001");

        assert!(HashValue::from_hex("acac", 12).is_err());
        assert!(HashValue::from_hex("zz", 8).is_err());
        // 0x3ff needs 10 bits
        assert!(HashValue::from_hex("3ff", 9).is_err());
    }

    #[test]
    fn test_hamming_distance() {
        let a = HashValue::from_hex("f0aa", 16).unwrap();
        let b = HashValue::from_hex("0fff", 16).unwrap();
        assert_eq!(a.hamming_distance(&b).unwrap(), 12);
        assert_eq!(hamming_hex("f0aa", "0fff").unwrap(), 12);

        let short = HashValue::from_hex("f", 4).unwrap();
        assert!(a.hamming_distance(&short).is_err());
    }
}
