//! Colour-managed resize of a decoded image.
//!
//! One call turns a decoded [`Image`] into a rendition for a single profile:
//!
//! ```text
//! attach input profile (if none embedded)
//!   → icc_import (relative)          Lab, 32-bit float
//!   → resize(scale, scale)           scale = max(width / W, height / H)
//!   → copy + attach output profile
//!   → icc_export (relative, 8-bit)
//! ```
//!
//! Resampling in Lab keeps gamma-encoded sources from darkening at edges.
//! The scale covers the requested box: the result is at least `width` wide
//! and at least `height` high, whichever constraint is larger wins.

use crate::imaging::{self, Depth, Image, ImagingError, Intent, Profile, fields};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("either width or height should be greater than zero")]
    NoSize,
    #[error(transparent)]
    Imaging(#[from] ImagingError),
}

/// Per-profile parameters for [`transform_image`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformConfig {
    pub width: i64,
    pub height: i64,
    /// Profile assumed when the image embeds none. Empty picks by interpretation.
    pub input_profile: String,
    /// Target profile. Empty means the input profile.
    pub output_profile: String,
}

/// Loaded profiles shared across worker threads, keyed by name.
#[derive(Debug, Default)]
pub struct ProfileCache {
    loaded: Mutex<HashMap<String, Profile>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `name` once; later calls return the cached blob.
    pub fn get(&self, name: &str) -> Result<Profile, ImagingError> {
        if let Some(profile) = self.lock().get(name) {
            return Ok(profile.clone());
        }
        // Loaded outside the lock; a racing thread may load the same file twice.
        let profile = imaging::profile_load(name)?;
        self.lock()
            .entry(name.to_string())
            .or_insert_with(|| profile.clone());
        Ok(profile)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Profile>> {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Produce the 8-bit rendition of `img` described by `config`.
pub fn transform_image(
    img: &Image,
    config: &TransformConfig,
    profiles: &ProfileCache,
) -> Result<Image, TransformError> {
    let width = config.width.max(0);
    let height = config.height.max(0);
    if width == 0 && height == 0 {
        return Err(TransformError::NoSize);
    }

    let input_profile = if config.input_profile.is_empty() {
        if img.interpretation().is_gray() { "gray" } else { "srgb" }
    } else {
        config.input_profile.as_str()
    };
    let output_profile = if config.output_profile.is_empty() {
        input_profile
    } else {
        config.output_profile.as_str()
    };

    let mut source = img.copy();
    if !source.is_set(fields::ICC_PROFILE) {
        let profile = profiles.get(input_profile)?;
        source.set_blob(fields::ICC_PROFILE, profile.data());
    }

    let imported = source.icc_import(Intent::Relative)?;

    let scale = f64::max(
        width as f64 / img.width() as f64,
        height as f64 / img.height() as f64,
    );
    let resized = imported.resize(scale, scale)?;

    let mut target = resized.copy();
    let profile = profiles.get(output_profile)?;
    target.set_blob(fields::ICC_PROFILE, profile.data());

    tracing::debug!(
        from = ?(img.width(), img.height()),
        to = ?(target.width(), target.height()),
        input_profile,
        output_profile,
        "transformed"
    );
    Ok(target.icc_export(Intent::Relative, Depth::Eight)?)
}
