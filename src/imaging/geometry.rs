//! Geometry adapters: separable-scale resize and EXIF auto-rotation.

use super::handle::Image;
use super::metadata::fields;
use super::{ImagingError, Result};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{ColorType, Limits};

/// Output size for a resize by `(xscale, yscale)`: rounded, never below 1.
pub(crate) fn scaled_dimensions(width: u32, height: u32, xscale: f64, yscale: f64) -> (u32, u32) {
    let scale = |side: u32, s: f64| ((f64::from(side) * s).round() as u32).max(1);
    (scale(width, xscale), scale(height, yscale))
}

impl Image {
    /// Resize by independent horizontal and vertical factors (Lanczos3).
    pub fn resize(&self, xscale: f64, yscale: f64) -> Result<Image> {
        for (axis, s) in [("xscale", xscale), ("yscale", yscale)] {
            if !s.is_finite() || s <= 0.0 {
                return Err(ImagingError::InvalidArgument(format!(
                    "{axis} must be a positive number, got {s}"
                )));
            }
        }

        let (w, h) = scaled_dimensions(self.width(), self.height(), xscale, yscale);
        if (w, h) == (self.width(), self.height()) {
            return Ok(self.copy());
        }

        self.reserve_resize(w, h)?;
        tracing::debug!(from_w = self.width(), from_h = self.height(), w, h, "resize");
        let pixels = self.pixels.resize_exact(w, h, FilterType::Lanczos3);
        Ok(self.derive(pixels, self.interpretation))
    }

    /// Check each buffer the resampler allocates against a budget.
    ///
    /// Resampling goes through an RGBA float buffer of `source width x h`
    /// before the `w x h` output. The budget is the default decoder limit or
    /// four times the float size of the source, whichever is larger.
    fn reserve_resize(&self, w: u32, h: u32) -> Result<()> {
        let rgba32f = u64::from(ColorType::Rgba32F.bytes_per_pixel());
        let source = u64::from(self.width())
            .saturating_mul(u64::from(self.height()))
            .saturating_mul(rgba32f);
        let budget = |max: Option<u64>| max.map(|max| max.max(source.saturating_mul(4)));

        let reserve = |width: u32, color: ColorType| {
            let mut limits = Limits::default();
            limits.max_alloc = budget(limits.max_alloc);
            limits.reserve_buffer(width, h, color)
        };
        reserve(self.width(), ColorType::Rgba32F)
            .and_then(|()| reserve(w, self.pixels.color()))
            .map_err(|e| {
                ImagingError::InvalidArgument(format!("resize to {w}x{h} is too large: {e}"))
            })
    }

    /// Apply the `orientation` field to the pixels.
    ///
    /// The field is dropped and the orientation recorded inside `exif-data`
    /// is reset, so that a second call is a no-op.
    pub fn autorot(&self) -> Result<Image> {
        let Some(value) = self.get_int(fields::ORIENTATION) else {
            return Ok(self.copy());
        };
        let orientation = u8::try_from(value)
            .ok()
            .and_then(Orientation::from_exif)
            .ok_or_else(|| ImagingError::InvalidArgument(format!("bad orientation {value}")))?;

        let mut out = self.copy();
        if orientation != Orientation::NoTransforms {
            out.pixels_mut().apply_orientation(orientation);
        }
        out.remove(fields::ORIENTATION);

        if let Some(exif) = self.get_blob(fields::EXIF) {
            let mut exif = exif.to_vec();
            if Orientation::remove_from_exif_chunk(&mut exif).is_some() {
                out.set_blob(fields::EXIF, &exif);
            }
        }

        tracing::debug!(orientation = value, "autorot");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{exif_chunk, gradient_rgb};

    #[test]
    fn scaled_dimensions_round_and_floor_at_one() {
        assert_eq!(scaled_dimensions(100, 50, 0.5, 0.5), (50, 25));
        assert_eq!(scaled_dimensions(3, 3, 0.5, 0.5), (2, 2));
        assert_eq!(scaled_dimensions(100, 100, 0.001, 2.0), (1, 200));
    }

    #[test]
    fn resize_by_one_is_identity() {
        let img = Image::from_pixels(gradient_rgb(33, 17));
        let out = img.resize(1.0, 1.0).unwrap();
        assert_eq!((out.width(), out.height()), (33, 17));
        assert_eq!(out.pixels().to_rgb8(), img.pixels().to_rgb8());
    }

    #[test]
    fn resize_scales_axes_independently() {
        let img = Image::from_pixels(gradient_rgb(100, 80));
        let out = img.resize(0.5, 0.25).unwrap();
        assert_eq!((out.width(), out.height()), (50, 20));
        assert_eq!(out.interpretation(), img.interpretation());
    }

    #[test]
    fn resize_keeps_metadata() {
        let mut img = Image::from_pixels(gradient_rgb(10, 10));
        img.set_blob(fields::XMP, b"<x/>");
        assert!(img.resize(2.0, 2.0).unwrap().is_set(fields::XMP));
    }

    #[test]
    fn resize_rejects_bad_scales() {
        let img = Image::from_pixels(gradient_rgb(10, 10));
        for (x, y) in [(0.0, 1.0), (1.0, -2.0), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
            assert!(matches!(img.resize(x, y), Err(ImagingError::InvalidArgument(_))));
        }
    }

    #[test]
    fn resize_refuses_oversized_output() {
        let img = Image::from_pixels(gradient_rgb(100, 100));
        for (x, y) in [(10_000.0, 10_000.0), (1e12, 1.0), (1.0, 1e12)] {
            assert!(
                matches!(img.resize(x, y), Err(ImagingError::InvalidArgument(_))),
                "{x}x{y}"
            );
        }
        // large but within budget
        let out = img.resize(8.0, 8.0).unwrap();
        assert_eq!((out.width(), out.height()), (800, 800));
    }

    #[test]
    fn autorot_rotates_and_clears_orientation() {
        let mut img = Image::from_pixels(gradient_rgb(40, 20));
        img.set_int(fields::ORIENTATION, 6);
        img.set_blob(fields::EXIF, &exif_chunk(6));

        let out = img.autorot().unwrap();
        assert_eq!((out.width(), out.height()), (20, 40));
        assert!(!out.is_set(fields::ORIENTATION));
        assert_eq!(
            Orientation::from_exif_chunk(out.get_blob(fields::EXIF).unwrap()),
            Some(Orientation::NoTransforms)
        );
        // the source handle is untouched
        assert_eq!((img.width(), img.height()), (40, 20));
        assert_eq!(img.get_int(fields::ORIENTATION), Some(6));
    }

    #[test]
    fn autorot_without_orientation_is_a_copy() {
        let img = Image::from_pixels(gradient_rgb(8, 4));
        let out = img.autorot().unwrap();
        assert!(out.shares_pixels_with(&img));
    }

    #[test]
    fn autorot_rejects_out_of_range_values() {
        let mut img = Image::from_pixels(gradient_rgb(8, 4));
        img.set_int(fields::ORIENTATION, 42);
        assert!(img.autorot().is_err());
    }
}
