//! Shared test utilities for the sharpei test suite.
//!
//! Synthetic pixels and encoded fixtures, so that no test depends on binary
//! files checked into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_jpeg(tmp.path(), "dawn.jpg", 64, 48);
//! let img = Image::new_from_buffer(&jpeg_with_orientation(40, 20, 6), "").unwrap();
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =========================================================================
// Pixels
// =========================================================================

/// Horizontal red ramp, vertical green ramp, constant blue. `(0, 0)` is `[0, 0, 128]`.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([ramp(x, width), ramp(y, height), 128])
    }))
}

/// [`gradient_rgb`] with a varying, never fully transparent alpha channel.
pub fn gradient_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([ramp(x, width), ramp(y, height), 128, 128 + ((x + y) % 128) as u8])
    }))
}

fn ramp(pos: u32, len: u32) -> u8 {
    (pos * 255 / len.max(1)) as u8
}

// =========================================================================
// Encoded fixtures
// =========================================================================

pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes(img: &DynamicImage) -> Vec<u8> {
    jpeg_with_app1(img, None)
}

/// Big-endian TIFF header with a single IFD entry: the orientation tag.
pub fn exif_chunk(orientation: u8) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(26);
    chunk.extend_from_slice(b"MM\0\x2a");
    chunk.extend_from_slice(&8u32.to_be_bytes());
    chunk.extend_from_slice(&1u16.to_be_bytes());
    chunk.extend_from_slice(&0x0112u16.to_be_bytes());
    chunk.extend_from_slice(&3u16.to_be_bytes());
    chunk.extend_from_slice(&1u32.to_be_bytes());
    chunk.extend_from_slice(&[0, orientation, 0, 0]);
    chunk.extend_from_slice(&0u32.to_be_bytes());
    chunk
}

/// JPEG of a `width`×`height` gradient tagged with an EXIF orientation.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
    jpeg_with_app1(&gradient_rgb(width, height), Some(&exif_chunk(orientation)))
}

fn jpeg_with_app1(img: &DynamicImage, exif: Option<&[u8]>) -> Vec<u8> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, 90);
    if let Some(exif) = exif {
        let mut segment = b"Exif\0\0".to_vec();
        segment.extend_from_slice(exif);
        encoder.add_app_segment(1, &segment).unwrap();
    }
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width() as u16,
            rgb.height() as u16,
            jpeg_encoder::ColorType::Rgb,
        )
        .unwrap();
    out
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Write a gradient JPEG into `dir` and return its path.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, jpeg_bytes(&gradient_rgb(width, height))).unwrap();
    path
}

/// Write a gradient PNG into `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(&gradient_rgb(width, height))).unwrap();
    path
}
