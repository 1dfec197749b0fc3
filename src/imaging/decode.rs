//! Decoder adapter: memory buffer + option string → [`Image`].

use super::handle::{Image, Interpretation};
use super::metadata::{FieldValue, Metadata, fields};
use super::options::LoadOptions;
use super::{ImagingError, Result};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

impl Image {
    /// Decode an encoded image held in memory.
    ///
    /// The embedded ICC profile, EXIF/XMP/IPTC blobs and the EXIF orientation
    /// are copied into the metadata dictionary. See [`LoadOptions`] for the
    /// accepted option strings.
    pub fn new_from_buffer(buf: &[u8], option_string: &str) -> Result<Image> {
        let options = LoadOptions::parse(option_string)?;
        if buf.is_empty() {
            return Err(ImagingError::Decode("empty buffer".into()));
        }

        let mut reader = ImageReader::new(Cursor::new(buf));
        match options.format {
            Some(format) => reader.set_format(format),
            None => reader = reader.with_guessed_format()?,
        }
        if options.unlimited {
            reader.no_limits();
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| ImagingError::Decode(e.to_string()))?;

        // Metadata is best-effort: a damaged chunk must not prevent decoding.
        let icc = decoder.icc_profile().ok().flatten();
        let mut exif = decoder.exif_metadata().ok().flatten();
        let xmp = decoder.xmp_metadata().ok().flatten();
        let iptc = decoder.iptc_metadata().ok().flatten();

        let mut pixels = DynamicImage::from_decoder(decoder)
            .map_err(|e| ImagingError::Decode(e.to_string()))?;

        let mut metadata = Metadata::default();
        let orientation = exif.as_deref().and_then(Orientation::from_exif_chunk);

        match orientation {
            Some(o) if options.autorotate => {
                pixels.apply_orientation(o);
                if let Some(chunk) = exif.as_mut() {
                    let _ = Orientation::remove_from_exif_chunk(chunk);
                }
            }
            Some(o) => metadata.insert(fields::ORIENTATION, FieldValue::Int(i32::from(o.to_exif()))),
            None => {}
        }

        for (name, blob) in [
            (fields::ICC_PROFILE, icc),
            (fields::EXIF, exif),
            (fields::XMP, xmp),
            (fields::IPTC, iptc),
        ] {
            if let Some(data) = blob.filter(|d| !d.is_empty()) {
                metadata.insert(name, FieldValue::Blob(data));
            }
        }

        let interpretation = Interpretation::for_pixels(&pixels);
        tracing::debug!(
            width = pixels.width(),
            height = pixels.height(),
            interpretation = interpretation.name(),
            "decoded image"
        );

        Ok(Image::from_parts(pixels, interpretation, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_rgb, gradient_rgba, jpeg_with_orientation, png_bytes};
    use image::ImageFormat;

    fn encoded(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_with_header_fields() {
        let img = Image::new_from_buffer(&png_bytes(&gradient_rgb(40, 30)), "").unwrap();
        assert_eq!((img.width(), img.height()), (40, 30));
        assert_eq!(img.interpretation(), Interpretation::Srgb);
        assert_eq!(img.bands(), 3);
        assert!(!img.is_set(fields::ORIENTATION));
    }

    #[test]
    fn decodes_16_bit_tiff_exactly() {
        let source = DynamicImage::ImageRgb16(gradient_rgb(24, 12).to_rgb16());
        let img = Image::new_from_buffer(&encoded(&source, ImageFormat::Tiff), "").unwrap();
        assert_eq!(img.interpretation(), Interpretation::Rgb16);
        assert_eq!(img.pixels().to_rgb16(), source.to_rgb16());
    }

    #[test]
    fn decodes_lossless_webp_exactly() {
        let source = gradient_rgba(20, 10);
        let img = Image::new_from_buffer(&encoded(&source, ImageFormat::WebP), "").unwrap();
        assert_eq!(img.interpretation(), Interpretation::Srgb);
        assert!(img.has_alpha());
        assert_eq!(img.pixels().to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn exif_orientation_becomes_a_field() {
        let img = Image::new_from_buffer(&jpeg_with_orientation(40, 20, 6), "").unwrap();
        assert_eq!(img.get_int(fields::ORIENTATION), Some(6));
        assert!(img.get_blob(fields::EXIF).is_some());
        assert_eq!((img.width(), img.height()), (40, 20));
    }

    #[test]
    fn autorotate_option_applies_orientation_on_load() {
        let img = Image::new_from_buffer(&jpeg_with_orientation(40, 20, 6), "[autorotate]").unwrap();
        assert_eq!((img.width(), img.height()), (20, 40));
        assert!(!img.is_set(fields::ORIENTATION));
        let exif = img.get_blob(fields::EXIF).unwrap();
        assert_eq!(
            Orientation::from_exif_chunk(exif),
            Some(Orientation::NoTransforms)
        );
    }

    #[test]
    fn explicit_format_is_honoured() {
        let png = png_bytes(&gradient_rgb(8, 8));
        assert!(Image::new_from_buffer(&png, "[format=png]").is_ok());
        assert!(matches!(
            Image::new_from_buffer(&png, "[format=jpeg]"),
            Err(ImagingError::Decode(_))
        ));
    }

    #[test]
    fn corrupt_buffer_is_an_error() {
        let mut png = png_bytes(&gradient_rgb(8, 8));
        png.truncate(png.len() / 2);
        assert!(Image::new_from_buffer(&png, "").is_err());
        assert!(Image::new_from_buffer(b"definitely not an image", "").is_err());
        assert!(Image::new_from_buffer(&[], "").is_err());
    }

    #[test]
    fn malformed_option_string_is_an_error() {
        let png = png_bytes(&gradient_rgb(8, 8));
        assert!(matches!(
            Image::new_from_buffer(&png, "[nonsense=1"),
            Err(ImagingError::InvalidOptions(_))
        ));
    }
}
