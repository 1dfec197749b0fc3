//! Loader option strings.
//!
//! The decoder adapter accepts a small loader mini-DSL:
//! an optional bracketed, comma-separated list of `key=value` pairs.
//!
//! ```text
//! ""                                  defaults
//! "[autorotate]"                      bare key means true
//! "[format=png, unlimited=yes]"       whitespace around items is ignored
//! ```

use super::{ImagingError, Result};
use image::ImageFormat;

/// Parsed loader options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Skip content sniffing and decode as this format.
    pub format: Option<ImageFormat>,
    /// Apply the EXIF orientation while loading.
    pub autorotate: bool,
    /// Disable decoder allocation limits.
    pub unlimited: bool,
}

impl LoadOptions {
    pub fn parse(option_string: &str) -> Result<Self> {
        let trimmed = option_string.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let body = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| invalid(format!("expected [key=value,...], got {trimmed:?}")))?;
        if body.contains('[') || body.contains(']') {
            return Err(invalid(format!("unbalanced brackets in {trimmed:?}")));
        }

        let mut options = Self::default();
        let mut seen: Vec<&str> = Vec::new();

        for item in body.split(',').map(str::trim) {
            if item.is_empty() {
                if body.trim().is_empty() {
                    continue;
                }
                return Err(invalid(format!("empty option in {trimmed:?}")));
            }

            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (item, None),
            };
            if seen.contains(&key) {
                return Err(invalid(format!("duplicate option {key:?}")));
            }
            seen.push(key);

            match key {
                "format" => {
                    let value = value.ok_or_else(|| invalid("format requires a value".into()))?;
                    options.format = Some(parse_format(value)?);
                }
                "autorotate" => options.autorotate = parse_bool(key, value)?,
                "unlimited" => options.unlimited = parse_bool(key, value)?,
                other => return Err(invalid(format!("unknown option {other:?}"))),
            }
        }

        Ok(options)
    }
}

fn invalid(message: String) -> ImagingError {
    ImagingError::InvalidOptions(message)
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("true" | "yes" | "on" | "1") => Ok(true),
        Some("false" | "no" | "off" | "0") => Ok(false),
        Some(other) => Err(invalid(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

fn parse_format(value: &str) -> Result<ImageFormat> {
    match value.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "webp" => Ok(ImageFormat::WebP),
        "tiff" | "tif" => Ok(ImageFormat::Tiff),
        other => Err(invalid(format!("unsupported format {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_means_defaults() {
        assert_eq!(LoadOptions::parse("").unwrap(), LoadOptions::default());
        assert_eq!(LoadOptions::parse("   ").unwrap(), LoadOptions::default());
        assert_eq!(LoadOptions::parse("[]").unwrap(), LoadOptions::default());
    }

    #[test]
    fn parses_all_keys() {
        let opts = LoadOptions::parse("[format=PNG, autorotate=yes,unlimited=0]").unwrap();
        assert_eq!(opts.format, Some(ImageFormat::Png));
        assert!(opts.autorotate);
        assert!(!opts.unlimited);
    }

    #[test]
    fn bare_key_is_true() {
        let opts = LoadOptions::parse("[autorotate]").unwrap();
        assert!(opts.autorotate);
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in [
            "autorotate",
            "[autorotate",
            "[[autorotate]]",
            "[autorotate=maybe]",
            "[format]",
            "[format=gif]",
            "[shrink=2]",
            "[autorotate,,unlimited]",
            "[autorotate,autorotate=false]",
        ] {
            let err = LoadOptions::parse(bad).unwrap_err();
            assert!(
                matches!(err, ImagingError::InvalidOptions(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }
}
