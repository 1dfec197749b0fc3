//! Encoder adapters: [`Image`] → encoded bytes.
//!
//! | Adapter | Backend | Knobs | Embeds |
//! |---------|---------|-------|--------|
//! | `jpegsave_buffer` | `jpeg-encoder` | quality, optimised Huffman tables | ICC, EXIF |
//! | `pngsave_buffer` | `image` (png) | deflate level, no filtering | ICC, EXIF |
//! | `webpsave_buffer` | `webp` (libwebp) | quality, lossless | - |
//! | `tiffsave_buffer` | `image` (tiff) | - | - |
//!
//! Lab images are rejected: they must go through `icc_export` first.

use super::handle::{Image, Interpretation};
use super::metadata::fields;
use super::params::{Compression, Quality};
use super::{ImagingError, Result};
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{ColorType, DynamicImage, ImageEncoder};
use std::borrow::Cow;
use std::io::Cursor;

const EXIF_APP1_HEADER: &[u8] = b"Exif\0\0";

impl Image {
    /// Encode as baseline JPEG.
    pub fn jpegsave_buffer(&self, quality: Quality) -> Result<Vec<u8>> {
        self.ensure_encodable("jpeg")?;
        let pixels = eight_bit(&self.pixels);

        let width = u16::try_from(pixels.width()).map_err(|_| too_large(pixels.width()))?;
        let height = u16::try_from(pixels.height()).map_err(|_| too_large(pixels.height()))?;
        let color = match pixels.color() {
            ColorType::L8 => jpeg_encoder::ColorType::Luma,
            ColorType::Rgb8 => jpeg_encoder::ColorType::Rgb,
            ColorType::Rgba8 => jpeg_encoder::ColorType::Rgba,
            other => {
                return Err(ImagingError::UnsupportedFormat(format!(
                    "jpeg cannot store {other:?}"
                )));
            }
        };

        let mut out = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality.value());
        encoder.set_optimized_huffman_tables(true);

        if let Some(icc) = self.get_blob(fields::ICC_PROFILE) {
            encoder.add_icc_profile(icc).map_err(encode_err)?;
        }
        if let Some(exif) = self.get_blob(fields::EXIF) {
            let mut segment = Vec::with_capacity(EXIF_APP1_HEADER.len() + exif.len());
            segment.extend_from_slice(EXIF_APP1_HEADER);
            segment.extend_from_slice(exif);
            if let Err(e) = encoder.add_app_segment(1, &segment) {
                tracing::warn!(bytes = exif.len(), error = %e, "exif block dropped");
            }
        }

        encoder
            .encode(pixels.as_bytes(), width, height, color)
            .map_err(encode_err)?;
        tracing::debug!(bytes = out.len(), quality = quality.value(), "jpeg encoded");
        Ok(out)
    }

    /// Encode as PNG. 16-bit data is kept, float data is stored as 16-bit.
    pub fn pngsave_buffer(&self, compression: Compression) -> Result<Vec<u8>> {
        self.ensure_encodable("png")?;
        let pixels = match self.pixels.color() {
            ColorType::Rgb32F => Cow::Owned(DynamicImage::ImageRgb16(self.pixels.to_rgb16())),
            ColorType::Rgba32F => Cow::Owned(DynamicImage::ImageRgba16(self.pixels.to_rgba16())),
            _ => Cow::Borrowed(&*self.pixels),
        };

        let mut out = Vec::new();
        let mut encoder = PngEncoder::new_with_quality(
            &mut out,
            CompressionType::Level(compression.value()),
            PngFilterType::NoFilter,
        );
        if let Some(icc) = self.get_blob(fields::ICC_PROFILE) {
            encoder
                .set_icc_profile(icc.to_vec())
                .map_err(|e| ImagingError::Encode(e.to_string()))?;
        }
        if let Some(exif) = self.get_blob(fields::EXIF) {
            encoder
                .set_exif_metadata(exif.to_vec())
                .map_err(|e| ImagingError::Encode(e.to_string()))?;
        }

        encoder
            .write_image(
                pixels.as_bytes(),
                pixels.width(),
                pixels.height(),
                pixels.color().into(),
            )
            .map_err(encode_err)?;
        tracing::debug!(bytes = out.len(), level = compression.value(), "png encoded");
        Ok(out)
    }

    /// Encode as WebP, lossy at `quality` or lossless.
    pub fn webpsave_buffer(&self, quality: Quality, lossless: bool) -> Result<Vec<u8>> {
        self.ensure_encodable("webp")?;
        let (w, h) = (self.width(), self.height());

        let q = f32::from(quality.value());
        let encoded = if self.has_alpha() {
            let rgba = self.pixels.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode_simple(lossless, q)
        } else {
            let rgb = self.pixels.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), w, h).encode_simple(lossless, q)
        };
        let memory = encoded.map_err(|e| ImagingError::Encode(format!("webp: {e:?}")))?;

        tracing::debug!(bytes = memory.len(), lossless, "webp encoded");
        Ok(memory.to_vec())
    }

    /// Encode as uncompressed TIFF.
    pub fn tiffsave_buffer(&self) -> Result<Vec<u8>> {
        self.ensure_encodable("tiff")?;
        let pixels = match self.pixels.color() {
            ColorType::La8 => Cow::Owned(DynamicImage::ImageRgba8(self.pixels.to_rgba8())),
            ColorType::La16 => Cow::Owned(DynamicImage::ImageRgba16(self.pixels.to_rgba16())),
            _ => Cow::Borrowed(&*self.pixels),
        };

        let mut cursor = Cursor::new(Vec::new());
        TiffEncoder::new(&mut cursor)
            .write_image(
                pixels.as_bytes(),
                pixels.width(),
                pixels.height(),
                pixels.color().into(),
            )
            .map_err(encode_err)?;
        let out = cursor.into_inner();
        tracing::debug!(bytes = out.len(), "tiff encoded");
        Ok(out)
    }

    fn ensure_encodable(&self, codec: &str) -> Result<()> {
        if self.interpretation == Interpretation::Lab {
            return Err(ImagingError::UnsupportedFormat(format!(
                "{codec}: lab images must be exported to a device profile first"
            )));
        }
        Ok(())
    }
}

/// 8-bit view of the pixels, converting only when needed.
fn eight_bit(pixels: &DynamicImage) -> Cow<'_, DynamicImage> {
    match pixels.color() {
        ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(pixels),
        ColorType::L16 => Cow::Owned(DynamicImage::ImageLuma8(pixels.to_luma8())),
        c if c.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(pixels.to_rgba8())),
        _ => Cow::Owned(DynamicImage::ImageRgb8(pixels.to_rgb8())),
    }
}

fn too_large(side: u32) -> ImagingError {
    ImagingError::UnsupportedFormat(format!("jpeg: dimension {side} exceeds 65535"))
}

fn encode_err(e: impl std::fmt::Display) -> ImagingError {
    ImagingError::Encode(e.to_string())
}
