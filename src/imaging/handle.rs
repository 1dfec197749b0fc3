//! The image handle shared by every adapter.
//!
//! An [`Image`] owns three things:
//!
//! - the pixels, behind an `Arc` so that [`Image::copy`] is cheap and writes
//!   go through [`Image::pixels_mut`] (copy-on-write via `Arc::make_mut`);
//! - an [`Interpretation`] telling the colour adapters what the samples mean;
//! - a metadata dictionary (see [`super::metadata`]).
//!
//! Handles never share metadata: a copy gets its own dictionary, so removing a
//! field from a copy is invisible through the original.

use super::metadata::Metadata;
use image::{ColorType, DynamicImage};
use std::sync::Arc;

/// How the samples of an image are to be understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpretation {
    /// 8-bit grayscale.
    BW,
    /// 16-bit grayscale.
    Grey16,
    /// 8-bit sRGB.
    Srgb,
    /// 16-bit RGB.
    Rgb16,
    /// Floating point linear-light RGB.
    Scrgb,
    /// CIE Lab (D50) in 32-bit float samples, normalised into `[0, 1]`.
    Lab,
}

impl Interpretation {
    /// Guess the interpretation of freshly decoded pixels.
    pub fn for_pixels(pixels: &DynamicImage) -> Self {
        match pixels.color() {
            ColorType::L8 | ColorType::La8 => Self::BW,
            ColorType::L16 | ColorType::La16 => Self::Grey16,
            ColorType::Rgb16 | ColorType::Rgba16 => Self::Rgb16,
            ColorType::Rgb32F | ColorType::Rgba32F => Self::Scrgb,
            _ => Self::Srgb,
        }
    }

    pub fn is_gray(self) -> bool {
        matches!(self, Self::BW | Self::Grey16)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BW => "b-w",
            Self::Grey16 => "grey16",
            Self::Srgb => "srgb",
            Self::Rgb16 => "rgb16",
            Self::Scrgb => "scrgb",
            Self::Lab => "lab",
        }
    }

    /// Stable integer code used over the C ABI.
    pub fn code(self) -> i32 {
        match self {
            Self::BW => 0,
            Self::Grey16 => 1,
            Self::Srgb => 2,
            Self::Rgb16 => 3,
            Self::Scrgb => 4,
            Self::Lab => 5,
        }
    }
}

/// Storage type of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandFormat {
    Uchar,
    Ushort,
    Float,
}

impl BandFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uchar => "uchar",
            Self::Ushort => "ushort",
            Self::Float => "float",
        }
    }
}

/// Opaque image handle. See the [module docs](self).
#[derive(Debug, Clone)]
pub struct Image {
    pub(super) pixels: Arc<DynamicImage>,
    pub(super) interpretation: Interpretation,
    pub(super) metadata: Metadata,
}

impl Image {
    /// Wrap already decoded pixels in a handle with empty metadata.
    pub fn from_pixels(pixels: DynamicImage) -> Self {
        let interpretation = Interpretation::for_pixels(&pixels);
        Self::from_parts(pixels, interpretation, Metadata::default())
    }

    pub(super) fn from_parts(
        pixels: DynamicImage,
        interpretation: Interpretation,
        metadata: Metadata,
    ) -> Self {
        Self {
            pixels: Arc::new(pixels),
            interpretation,
            metadata,
        }
    }

    /// New handle with different pixels but this handle's metadata.
    pub(super) fn derive(&self, pixels: DynamicImage, interpretation: Interpretation) -> Self {
        Self::from_parts(pixels, interpretation, self.metadata.clone())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Number of channels, alpha included.
    pub fn bands(&self) -> u8 {
        self.pixels.color().channel_count()
    }

    pub fn has_alpha(&self) -> bool {
        self.pixels.color().has_alpha()
    }

    pub fn band_format(&self) -> BandFormat {
        match self.pixels.color().bytes_per_pixel() / self.bands().max(1) {
            1 => BandFormat::Uchar,
            2 => BandFormat::Ushort,
            _ => BandFormat::Float,
        }
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    /// Read-only view of the pixels.
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Mutable pixels; detaches from any handle sharing the same storage.
    pub fn pixels_mut(&mut self) -> &mut DynamicImage {
        Arc::make_mut(&mut self.pixels)
    }

    /// Whether both handles currently point at the same pixel storage.
    pub fn shares_pixels_with(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// Logically independent handle sharing pixel storage until written.
    pub fn copy(&self) -> Image {
        tracing::trace!(width = self.width(), height = self.height(), "copy");
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_rgb;
    use image::Rgb;

    #[test]
    fn interpretation_follows_color_type() {
        let rgb = DynamicImage::new_rgb8(2, 2);
        let gray16 = DynamicImage::new_luma16(2, 2);
        let rgba32 = DynamicImage::new_rgba32f(2, 2);
        assert_eq!(Interpretation::for_pixels(&rgb), Interpretation::Srgb);
        assert_eq!(Interpretation::for_pixels(&gray16), Interpretation::Grey16);
        assert_eq!(Interpretation::for_pixels(&rgba32), Interpretation::Scrgb);
    }

    #[test]
    fn band_format_and_bands() {
        let img = Image::from_pixels(DynamicImage::new_rgba16(3, 2));
        assert_eq!(img.bands(), 4);
        assert!(img.has_alpha());
        assert_eq!(img.band_format(), BandFormat::Ushort);
        assert_eq!((img.width(), img.height()), (3, 2));
    }

    #[test]
    fn copy_shares_until_written() {
        let original = Image::from_pixels(gradient_rgb(8, 8));
        let mut copy = original.copy();
        assert!(copy.shares_pixels_with(&original));

        if let DynamicImage::ImageRgb8(buf) = copy.pixels_mut() {
            buf.put_pixel(0, 0, Rgb([1, 2, 3]));
        }

        assert!(!copy.shares_pixels_with(&original));
        assert_eq!(copy.pixels().to_rgb8().get_pixel(0, 0), &Rgb([1, 2, 3]));
        assert_eq!(
            original.pixels().to_rgb8().get_pixel(0, 0),
            gradient_rgb(8, 8).to_rgb8().get_pixel(0, 0)
        );
    }
}
