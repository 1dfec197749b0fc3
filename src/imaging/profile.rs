//! ICC profile blobs.
//!
//! [`profile_load`] resolves a name to raw ICC bytes. A handful of names are
//! built in and synthesised by `moxcms`; anything else is read from disk and
//! must parse as an ICC profile. The facade itself never consumes the blob:
//! attaching it as `icc-profile-data` is the caller's business.

use super::handle::Interpretation;
use super::{ImagingError, Result};
use moxcms::ColorProfile;
use std::path::Path;
use std::sync::Arc;

/// Names accepted by [`profile_load`] without touching the filesystem.
pub const BUILTIN_PROFILES: &[&str] = &["srgb", "srgb-v2", "srgb-v4", "gray", "grey", "p3", "adobe-rgb"];

const GRAY_GAMMA: f32 = 2.2;

/// A loaded ICC profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    data: Arc<[u8]>,
}

impl Profile {
    /// The name the profile was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw ICC bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Load a named profile into a blob.
///
/// Built-in names are matched case-insensitively; see [`BUILTIN_PROFILES`].
pub fn profile_load(name: &str) -> Result<Profile> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ImagingError::Profile("empty profile name".into()));
    }

    let data = match builtin(&trimmed.to_ascii_lowercase()) {
        Some(profile) => profile
            .encode()
            .map_err(|e| ImagingError::Profile(format!("{trimmed}: {e}")))?,
        None => read_icc_file(Path::new(trimmed))?,
    };

    tracing::debug!(name = trimmed, bytes = data.len(), "profile loaded");
    Ok(Profile {
        name: trimmed.to_string(),
        data: data.into(),
    })
}

fn read_icc_file(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)
        .map_err(|e| ImagingError::Profile(format!("{}: {e}", path.display())))?;
    ColorProfile::new_from_slice(&data)
        .map_err(|e| ImagingError::Profile(format!("{}: not an ICC profile: {e}", path.display())))?;
    Ok(data)
}

fn builtin(name: &str) -> Option<ColorProfile> {
    match name {
        "srgb" | "srgb-v2" | "srgb-v4" => Some(ColorProfile::new_srgb()),
        "gray" | "grey" => Some(ColorProfile::new_gray_with_gamma(GRAY_GAMMA)),
        "p3" => Some(ColorProfile::new_display_p3()),
        "adobe-rgb" => Some(ColorProfile::new_adobe_rgb()),
        _ => None,
    }
}

/// Profile assumed for pixels that carry none.
pub(super) fn default_for(interpretation: Interpretation) -> ColorProfile {
    if interpretation.is_gray() {
        ColorProfile::new_gray_with_gamma(GRAY_GAMMA)
    } else {
        ColorProfile::new_srgb()
    }
}

/// Parse an attached `icc-profile-data` blob.
pub(super) fn parse_icc(data: &[u8]) -> Result<ColorProfile> {
    ColorProfile::new_from_slice(data)
        .map_err(|e| ImagingError::Color(format!("unreadable embedded profile: {e}")))
}
