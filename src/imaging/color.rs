//! ICC colour adapters.
//!
//! `icc_import` maps device pixels to CIE Lab (D50) and `icc_export` maps Lab
//! back to the device space named by the attached `icc-profile-data`.
//!
//! ```text
//! device RGB/gray ──moxcms──▶ linear ProPhoto ──matrix──▶ XYZ (D50) ──▶ Lab
//! ```
//!
//! The linear ProPhoto intermediate is a matrix-shaper profile that `moxcms`
//! can target in float. Its colorant matrix is exactly the RGB→XYZ(D50)
//! mapping, so the Lab values are independent of the intermediate.
//!
//! Lab samples are stored as `L/100` and `(a + 256)/512`, `(b + 256)/512`.
//! Float resampling clamps to `[0, 1]`, and this range holds every colour of
//! the ProPhoto working space, so resizing never clips chroma.

use super::handle::{Image, Interpretation};
use super::metadata::fields;
use super::profile;
use super::{ImagingError, Result};
use image::{DynamicImage, ImageBuffer};
use moxcms::{
    ColorProfile, DataColorSpace, Lab, Layout, Matrix3d, RenderingIntent, TransformOptions, Xyzd,
    curve_from_gamma,
};
use std::fmt;
use std::str::FromStr;

/// ICC rendering intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    Perceptual,
    #[default]
    Relative,
    Saturation,
    Absolute,
}

impl Intent {
    fn to_moxcms(self) -> RenderingIntent {
        match self {
            Intent::Perceptual => RenderingIntent::Perceptual,
            Intent::Relative => RenderingIntent::RelativeColorimetric,
            Intent::Saturation => RenderingIntent::Saturation,
            Intent::Absolute => RenderingIntent::AbsoluteColorimetric,
        }
    }
}

impl FromStr for Intent {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perceptual" => Ok(Intent::Perceptual),
            "relative" => Ok(Intent::Relative),
            "saturation" => Ok(Intent::Saturation),
            "absolute" => Ok(Intent::Absolute),
            other => Err(ImagingError::InvalidArgument(format!(
                "unknown rendering intent {other:?}"
            ))),
        }
    }
}

impl TryFrom<i32> for Intent {
    type Error = ImagingError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Intent::Perceptual),
            1 => Ok(Intent::Relative),
            2 => Ok(Intent::Saturation),
            3 => Ok(Intent::Absolute),
            other => Err(ImagingError::InvalidArgument(format!(
                "rendering intent must be 0-3, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::Perceptual => "perceptual",
            Intent::Relative => "relative",
            Intent::Saturation => "saturation",
            Intent::Absolute => "absolute",
        })
    }
}

/// Sample depth of an exported image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Eight,
    Sixteen,
}

impl TryFrom<i32> for Depth {
    type Error = ImagingError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            8 => Ok(Depth::Eight),
            16 => Ok(Depth::Sixteen),
            other => Err(ImagingError::InvalidArgument(format!(
                "depth must be 8 or 16, got {other}"
            ))),
        }
    }
}

/// Half-width of the stored a/b range.
const AB_RANGE: f64 = 256.0;

// moxcms scales XYZ into the u1Fixed15 PCS range, where 1.0 is just under 2
const PCS_XYZ_SCALE: f64 = 1.0 + 32767.0 / 32768.0;

/// Linear ProPhoto and its RGB→XYZ(D50) matrix.
struct WorkingSpace {
    profile: ColorProfile,
    to_xyz: Matrix3d,
    from_xyz: Matrix3d,
}

impl WorkingSpace {
    fn new() -> Result<Self> {
        let mut profile = ColorProfile::new_pro_photo_rgb();
        let linear = curve_from_gamma(1.0);
        profile.red_trc = Some(linear.clone());
        profile.green_trc = Some(linear.clone());
        profile.blue_trc = Some(linear);

        let to_xyz = profile.colorant_matrix();
        if to_xyz.determinant().is_none() {
            return Err(ImagingError::Color("singular working space matrix".into()));
        }
        Ok(Self {
            profile,
            from_xyz: to_xyz.inverse(),
            to_xyz,
        })
    }

    fn rgb_to_lab(&self, rgb: [f32; 3]) -> Lab {
        let xyz = Xyzd::new(f64::from(rgb[0]), f64::from(rgb[1]), f64::from(rgb[2]))
            .matrix_mul(self.to_xyz);
        Lab::from_xyz(scale_xyz(xyz, PCS_XYZ_SCALE.recip()).to_xyz())
    }

    fn lab_to_rgb(&self, lab: Lab) -> [f32; 3] {
        let xyz = scale_xyz(lab.to_xyz().to_xyzd(), PCS_XYZ_SCALE).matrix_mul(self.from_xyz);
        [xyz.x, xyz.y, xyz.z].map(|v| v.clamp(0.0, 1.0) as f32)
    }
}

fn scale_xyz(xyz: Xyzd, s: f64) -> Xyzd {
    Xyzd::new(xyz.x * s, xyz.y * s, xyz.z * s)
}

fn encode_lab(lab: Lab) -> [f32; 3] {
    let ab = |v: f32| ((f64::from(v) + AB_RANGE) / (2.0 * AB_RANGE)) as f32;
    [lab.l / 100.0, ab(lab.a), ab(lab.b)]
}

fn decode_lab(v: &[f32]) -> Lab {
    let ab = |v: f32| (f64::from(v) * 2.0 * AB_RANGE - AB_RANGE) as f32;
    Lab::new(v[0] * 100.0, ab(v[1]), ab(v[2]))
}

fn color_err(e: impl fmt::Display) -> ImagingError {
    ImagingError::Color(e.to_string())
}

/// Device channel layout a profile describes.
fn device_layout(profile: &ColorProfile) -> Result<Layout> {
    match profile.color_space {
        DataColorSpace::Rgb => Ok(Layout::Rgb),
        DataColorSpace::Gray => Ok(Layout::Gray),
        other => Err(ImagingError::Color(format!(
            "unsupported profile colour space {other:?}"
        ))),
    }
}

impl Image {
    /// Import to Lab using the embedded profile, or the default profile for
    /// the interpretation when none is attached.
    pub fn icc_import(&self, intent: Intent) -> Result<Image> {
        if self.interpretation == Interpretation::Lab {
            return Err(ImagingError::Color("image is already lab".into()));
        }

        let source = match self.get_blob(fields::ICC_PROFILE) {
            Some(data) => profile::parse_icc(data)?,
            None => profile::default_for(self.interpretation),
        };
        let layout = device_layout(&source)?;
        if layout == Layout::Gray && !self.interpretation.is_gray() {
            return Err(ImagingError::Color(
                "gray profile attached to a colour image".into(),
            ));
        }

        let space = WorkingSpace::new()?;
        let options = TransformOptions {
            rendering_intent: intent.to_moxcms(),
            ..Default::default()
        };
        let transform = source
            .create_transform_f32(layout, &space.profile, Layout::Rgb, options)
            .map_err(color_err)?;

        let (w, h) = (self.width(), self.height());
        let has_alpha = self.has_alpha();
        let rgba = self.pixels.to_rgba32f();
        let channels = if layout == Layout::Gray { 1 } else { 3 };
        let device: Vec<f32> = rgba
            .pixels()
            .flat_map(|p| p.0.into_iter().take(channels))
            .collect();

        let mut linear = vec![0f32; rgba.pixels().len() * 3];
        transform.transform(&device, &mut linear).map_err(color_err)?;

        let out_channels = if has_alpha { 4 } else { 3 };
        let mut lab = Vec::with_capacity(linear.len() / 3 * out_channels);
        for (rgb, src) in linear.chunks_exact(3).zip(rgba.pixels()) {
            lab.extend_from_slice(&encode_lab(space.rgb_to_lab([rgb[0], rgb[1], rgb[2]])));
            if has_alpha {
                lab.push(src.0[3]);
            }
        }

        let pixels = if has_alpha {
            ImageBuffer::from_raw(w, h, lab).map(DynamicImage::ImageRgba32F)
        } else {
            ImageBuffer::from_raw(w, h, lab).map(DynamicImage::ImageRgb32F)
        }
        .ok_or_else(|| ImagingError::Color("lab buffer size mismatch".into()))?;

        tracing::debug!(w, h, %intent, "icc import");
        Ok(self.derive(pixels, Interpretation::Lab))
    }

    /// Export Lab to the attached profile (sRGB when none is attached).
    pub fn icc_export(&self, intent: Intent, depth: Depth) -> Result<Image> {
        if self.interpretation != Interpretation::Lab {
            return Err(ImagingError::Color(format!(
                "export needs a lab image, got {}",
                self.interpretation.name()
            )));
        }

        let target = match self.get_blob(fields::ICC_PROFILE) {
            Some(data) => profile::parse_icc(data)?,
            None => ColorProfile::new_srgb(),
        };
        let layout = device_layout(&target)?;

        let space = WorkingSpace::new()?;
        let options = TransformOptions {
            rendering_intent: intent.to_moxcms(),
            ..Default::default()
        };
        let transform = space
            .profile
            .create_transform_f32(Layout::Rgb, &target, layout, options)
            .map_err(color_err)?;

        let (w, h) = (self.width(), self.height());
        let has_alpha = self.has_alpha();
        let src = self.pixels.to_rgba32f();
        let linear: Vec<f32> = src
            .pixels()
            .flat_map(|p| space.lab_to_rgb(decode_lab(&p.0)))
            .collect();

        let channels = if layout == Layout::Gray { 1 } else { 3 };
        let mut device = vec![0f32; src.pixels().len() * channels];
        transform.transform(&linear, &mut device).map_err(color_err)?;

        let gray = layout == Layout::Gray;
        let alphas = src.pixels().map(|p| p.0[3]);
        let pixels = match depth {
            Depth::Eight => {
                let raw = quantize(&device, channels, alphas, has_alpha, |v| {
                    (v.clamp(0.0, 1.0) * 255.0).round() as u8
                });
                pack8(w, h, raw, gray, has_alpha)
            }
            Depth::Sixteen => {
                let raw = quantize(&device, channels, alphas, has_alpha, |v| {
                    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
                });
                pack16(w, h, raw, gray, has_alpha)
            }
        }
        .ok_or_else(|| ImagingError::Color("export buffer size mismatch".into()))?;

        let interpretation = match (gray, depth) {
            (true, Depth::Eight) => Interpretation::BW,
            (true, Depth::Sixteen) => Interpretation::Grey16,
            (false, Depth::Eight) => Interpretation::Srgb,
            (false, Depth::Sixteen) => Interpretation::Rgb16,
        };
        tracing::debug!(w, h, %intent, ?depth, "icc export");
        Ok(self.derive(pixels, interpretation))
    }
}

/// Interleave device samples with alpha, converting each sample with `q`.
fn quantize<T>(
    device: &[f32],
    channels: usize,
    alphas: impl Iterator<Item = f32>,
    has_alpha: bool,
    q: impl Fn(f32) -> T,
) -> Vec<T> {
    let per_pixel = channels + usize::from(has_alpha);
    let mut out = Vec::with_capacity(device.len() / channels * per_pixel);
    for (px, a) in device.chunks_exact(channels).zip(alphas) {
        out.extend(px.iter().map(|&v| q(v)));
        if has_alpha {
            out.push(q(a));
        }
    }
    out
}

fn pack8(w: u32, h: u32, raw: Vec<u8>, gray: bool, alpha: bool) -> Option<DynamicImage> {
    match (gray, alpha) {
        (true, false) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        (true, true) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
        (false, false) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        (false, true) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
    }
}

fn pack16(w: u32, h: u32, raw: Vec<u16>, gray: bool, alpha: bool) -> Option<DynamicImage> {
    match (gray, alpha) {
        (true, false) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma16),
        (true, true) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA16),
        (false, false) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb16),
        (false, true) => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::profile_load;
    use crate::test_helpers::{gradient_rgb, gradient_rgba};
    use image::{Rgb, RgbImage};

    fn lab_at(img: &Image, x: u32, y: u32) -> [f64; 3] {
        let lab = decode_lab(&img.pixels().to_rgb32f().get_pixel(x, y).0);
        [lab.l, lab.a, lab.b].map(f64::from)
    }

    fn assert_close(a: [f64; 3], b: [f64; 3], tol: f64) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() <= tol, "{a:?} vs {b:?}");
        }
    }

    fn solid(rgb: [u8; 3]) -> Image {
        Image::from_pixels(DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb(rgb))))
    }

    fn pro_photo(rgb: [u8; 3]) -> Image {
        let mut img = solid(rgb);
        let icc = ColorProfile::new_pro_photo_rgb().encode().unwrap();
        img.set_blob(fields::ICC_PROFILE, &icc);
        img
    }

    #[test]
    fn working_space_round_trips_through_lab() {
        let space = WorkingSpace::new().unwrap();
        for rgb in [[0.2, 0.3, 0.1], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.001, 0.0, 0.9]] {
            let back = space.lab_to_rgb(space.rgb_to_lab(rgb));
            for c in 0..3 {
                assert!((back[c] - rgb[c]).abs() < 1e-3, "{rgb:?} vs {back:?}");
            }
        }
    }

    #[test]
    fn working_space_corners_fit_the_stored_range() {
        let space = WorkingSpace::new().unwrap();
        for bits in 0..8u8 {
            let rgb = [bits & 1, (bits >> 1) & 1, (bits >> 2) & 1].map(f32::from);
            let [l, a, b] = encode_lab(space.rgb_to_lab(rgb));
            assert!(l > -1e-3 && l < 1.001, "{rgb:?}: {l}");
            assert!((0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b), "{rgb:?}: {a} {b}");
        }
    }

    #[test]
    fn wide_gamut_colour_survives_lab_resize() {
        let lab = pro_photo([0, 255, 0]).icc_import(Intent::Relative).unwrap();
        let [_, a, b] = lab_at(&lab, 0, 0);
        // outside the a/b range of the ICC Lab PCS encoding
        assert!(a < -128.0 && b > 127.0, "{a} {b}");

        let half = lab.resize(0.5, 0.5).unwrap();
        assert_close(lab_at(&half, 0, 0), lab_at(&lab, 0, 0), 0.05);

        let direct = lab.icc_export(Intent::Relative, Depth::Eight).unwrap();
        let resized = half.icc_export(Intent::Relative, Depth::Eight).unwrap();
        let (d, r) = (direct.pixels().to_rgb8(), resized.pixels().to_rgb8());
        for c in 0..3 {
            let diff = i16::from(d.get_pixel(0, 0).0[c]) - i16::from(r.get_pixel(0, 0).0[c]);
            assert!(diff.abs() <= 1, "{:?} vs {:?}", d.get_pixel(0, 0), r.get_pixel(0, 0));
        }
    }

    #[test]
    fn intent_parsing() {
        assert_eq!("Relative".parse::<Intent>().unwrap(), Intent::Relative);
        assert_eq!(Intent::try_from(3).unwrap(), Intent::Absolute);
        assert!(Intent::try_from(4).is_err());
        assert!("vivid".parse::<Intent>().is_err());
        assert!(Depth::try_from(12).is_err());
    }

    #[test]
    fn white_and_red_import_to_reference_lab() {
        let white = solid([255, 255, 255]).icc_import(Intent::Relative).unwrap();
        assert_eq!(white.interpretation(), Interpretation::Lab);
        assert_close(lab_at(&white, 0, 0), [100.0, 0.0, 0.0], 0.5);

        let red = solid([255, 0, 0]).icc_import(Intent::Relative).unwrap();
        assert_close(lab_at(&red, 1, 1), [54.29, 80.8, 69.9], 1.5);
    }

    #[test]
    fn import_export_round_trips_srgb() {
        let original = Image::from_pixels(gradient_rgb(16, 16));
        let back = original
            .icc_import(Intent::Relative)
            .unwrap()
            .icc_export(Intent::Relative, Depth::Eight)
            .unwrap();

        assert_eq!(back.interpretation(), Interpretation::Srgb);
        let (a, b) = (original.pixels().to_rgb8(), back.pixels().to_rgb8());
        for (p, q) in a.pixels().zip(b.pixels()) {
            for c in 0..3 {
                assert!((i16::from(p.0[c]) - i16::from(q.0[c])).abs() <= 2, "{p:?} vs {q:?}");
            }
        }
    }

    #[test]
    fn alpha_survives_the_round_trip() {
        let original = Image::from_pixels(gradient_rgba(8, 8));
        let lab = original.icc_import(Intent::Perceptual).unwrap();
        assert!(lab.has_alpha());
        let back = lab.icc_export(Intent::Perceptual, Depth::Sixteen).unwrap();
        assert_eq!(back.interpretation(), Interpretation::Rgb16);
        assert_eq!(
            back.pixels().to_rgba8().get_pixel(3, 3).0[3],
            original.pixels().to_rgba8().get_pixel(3, 3).0[3]
        );
    }

    #[test]
    fn gray_images_use_the_gray_default_and_export_to_gray() {
        let gray = Image::from_pixels(DynamicImage::ImageLuma8(gradient_rgb(8, 8).to_luma8()));
        let mut lab = gray.icc_import(Intent::Relative).unwrap();
        // neutral input stays neutral
        let [_, a, b] = lab_at(&lab, 4, 4);
        assert!(a.abs() < 0.5 && b.abs() < 0.5);

        lab.set_blob(fields::ICC_PROFILE, profile_load("gray").unwrap().data());
        let out = lab.icc_export(Intent::Relative, Depth::Eight).unwrap();
        assert_eq!(out.interpretation(), Interpretation::BW);
        assert_eq!(out.bands(), 1);
    }

    #[test]
    fn export_uses_the_attached_profile() {
        let mut lab = solid([200, 30, 30]).icc_import(Intent::Relative).unwrap();
        let srgb = lab.icc_export(Intent::Relative, Depth::Eight).unwrap();

        lab.set_blob(fields::ICC_PROFILE, profile_load("p3").unwrap().data());
        let p3 = lab.icc_export(Intent::Relative, Depth::Eight).unwrap();
        assert_ne!(srgb.pixels().to_rgb8(), p3.pixels().to_rgb8());
    }

    #[test]
    fn rejects_wrong_interpretations() {
        let img = Image::from_pixels(gradient_rgb(4, 4));
        assert!(img.icc_export(Intent::Relative, Depth::Eight).is_err());
        let lab = img.icc_import(Intent::Relative).unwrap();
        assert!(lab.icc_import(Intent::Relative).is_err());
    }

    #[test]
    fn rejects_garbage_embedded_profile() {
        let mut img = Image::from_pixels(gradient_rgb(4, 4));
        img.set_blob(fields::ICC_PROFILE, b"garbage");
        assert!(matches!(
            img.icc_import(Intent::Relative),
            Err(ImagingError::Color(_))
        ));
    }
}
