//! Rendition pipeline.
//!
//! Turns every scanned image into one file per configured profile. Images are
//! processed in parallel on the global rayon pool; profiles of one image run
//! sequentially on the worker that decoded it, so each source is decoded once.
//!
//! ## Per image
//!
//! ```text
//! read → decode → autorot (unrotated on failure) → copy
//!      → strip exif*, iptc*, xmp*, orientation
//! ```
//!
//! ## Per profile
//!
//! ```text
//! <output>/<input dir>/<format>.<ext>
//!   exists and not rewrite  → "already exists, skipping"
//!   transform → encode → create dir → write → "OK"
//! ```
//!
//! The extension is the profile's `type` lowercased, or the source's own
//! extension for `same`.
//!
//! Nothing here prints. Progress is reported as [`ProcessEvent`]s over an
//! optional channel; [`crate::output`] turns them into lines.

use crate::config::{Codec, Config, ProfileConfig};
use crate::imaging::{Image, ImagingError, fields};
use crate::scan::Inputs;
use crate::template;
use crate::transform::{self, ProfileCache, TransformConfig, TransformError};
use rayon::prelude::*;
use std::fs;
use std::ops::Add;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("unsupported file type {0}, use jpg, png, webp or tiff")]
    UnsupportedType(String),
    #[error("exists and not a directory, skipping")]
    NotADirectory,
}

/// Progress events, one per finished step.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// Input skipped because its extension is not a supported image type.
    NotAnImage { path: PathBuf },
    /// Rendition written.
    Written { path: PathBuf },
    /// Rendition already present and `rewrite` is off.
    Exists { path: PathBuf },
    /// Failure tied to a path: an unreadable source, or an output
    /// directory or file that could not be written.
    Failed { path: PathBuf, error: String },
    /// Transform or encode failed for one profile.
    ProfileFailed {
        source: PathBuf,
        profile: String,
        error: String,
    },
    /// The filename template could not be rendered.
    FormatFailed {
        source: PathBuf,
        profile: String,
        error: String,
    },
}

/// Outcome counts for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub written: usize,
    pub existing: usize,
    pub failed: usize,
    pub not_images: usize,
}

impl ProcessSummary {
    fn record(&mut self, event: &ProcessEvent) {
        match event {
            ProcessEvent::NotAnImage { .. } => self.not_images += 1,
            ProcessEvent::Written { .. } => self.written += 1,
            ProcessEvent::Exists { .. } => self.existing += 1,
            ProcessEvent::Failed { .. }
            | ProcessEvent::ProfileFailed { .. }
            | ProcessEvent::FormatFailed { .. } => self.failed += 1,
        }
    }

    /// Whether every attempted rendition either was written or already existed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Add for ProcessSummary {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            written: self.written + other.written,
            existing: self.existing + other.existing,
            failed: self.failed + other.failed,
            not_images: self.not_images + other.not_images,
        }
    }
}

/// Sends events and keeps counts for one worker.
struct Reporter<'a> {
    events: Option<&'a Sender<ProcessEvent>>,
    summary: ProcessSummary,
}

impl<'a> Reporter<'a> {
    fn new(events: Option<&'a Sender<ProcessEvent>>) -> Self {
        Self {
            events,
            summary: ProcessSummary::default(),
        }
    }

    fn emit(&mut self, event: ProcessEvent) {
        self.summary.record(&event);
        if let Some(tx) = self.events {
            // The receiver going away only loses progress output.
            tx.send(event).ok();
        }
    }
}

/// Render every image in `inputs` for every profile in `config`.
pub fn process(
    inputs: &Inputs,
    config: &Config,
    events: Option<Sender<ProcessEvent>>,
) -> ProcessSummary {
    let tx = events.as_ref();
    let mut reporter = Reporter::new(tx);
    for path in &inputs.skipped {
        reporter.emit(ProcessEvent::NotAnImage { path: path.clone() });
    }

    let profiles = ProfileCache::new();
    let summary = inputs
        .images
        .par_iter()
        .map(|path| {
            let mut reporter = Reporter::new(tx);
            process_image(path, config, &profiles, &mut reporter);
            reporter.summary
        })
        .reduce(ProcessSummary::default, |a, b| a + b);

    tracing::debug!(profiles_loaded = profiles.len(), "processing finished");
    reporter.summary + summary
}

fn process_image(source: &Path, config: &Config, profiles: &ProfileCache, reporter: &mut Reporter<'_>) {
    let img = match prepare(source) {
        Ok(img) => img,
        Err(e) => {
            reporter.emit(ProcessEvent::Failed {
                path: source.to_path_buf(),
                error: e.to_string(),
            });
            return;
        }
    };

    for (name, profile) in &config.profiles {
        render_profile(&img, source, name, profile, config, profiles, reporter);
    }
}

/// Decode, rotate upright and drop identifying metadata.
fn prepare(source: &Path) -> Result<Image, ProcessError> {
    let bytes = fs::read(source)?;
    let decoded = Image::new_from_buffer(&bytes, "")?;
    let rotated = decoded.autorot().unwrap_or_else(|e| {
        tracing::debug!(path = %source.display(), error = %e, "autorot failed, keeping orientation");
        decoded.copy()
    });

    let mut img = rotated.copy();
    for field in img.get_fields() {
        if is_private_field(&field) {
            img.remove(&field);
        }
    }
    tracing::debug!(path = %source.display(), w = img.width(), h = img.height(), "decoded");
    Ok(img)
}

fn is_private_field(name: &str) -> bool {
    name.starts_with("exif")
        || name.starts_with("iptc")
        || name.starts_with("xmp")
        || name == fields::ORIENTATION
}

fn render_profile(
    img: &Image,
    source: &Path,
    profile_name: &str,
    profile: &ProfileConfig,
    config: &Config,
    profiles: &ProfileCache,
    reporter: &mut Reporter<'_>,
) {
    let profile_failed = |error: String| ProcessEvent::ProfileFailed {
        source: source.to_path_buf(),
        profile: profile_name.to_string(),
        error,
    };

    let ext = output_extension(source, profile);
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let filename = match template::output_stem(&config.format, &stem, profile_name) {
        Ok(f) => format!("{f}.{ext}"),
        Err(e) => {
            reporter.emit(ProcessEvent::FormatFailed {
                source: source.to_path_buf(),
                profile: profile_name.to_string(),
                error: e.to_string(),
            });
            return;
        }
    };
    let dir = output_dir(&config.output, source);
    let path = dir.join(&filename);

    if !config.rewrite && path.exists() {
        reporter.emit(ProcessEvent::Exists { path });
        return;
    }

    let encoded = match encode_profile(img, profile, &ext, profiles) {
        Ok(buf) => buf,
        Err(e) => {
            reporter.emit(profile_failed(e.to_string()));
            return;
        }
    };

    if let Err(e) = ensure_dir(&dir) {
        reporter.emit(ProcessEvent::Failed {
            path: dir,
            error: e.to_string(),
        });
        return;
    }

    match fs::write(&path, encoded) {
        Ok(()) => reporter.emit(ProcessEvent::Written { path }),
        Err(e) => reporter.emit(ProcessEvent::Failed {
            path,
            error: e.to_string(),
        }),
    }
}

fn encode_profile(
    img: &Image,
    profile: &ProfileConfig,
    ext: &str,
    profiles: &ProfileCache,
) -> Result<Vec<u8>, ProcessError> {
    let codec = Codec::from_extension(ext).ok_or_else(|| ProcessError::UnsupportedType(ext.to_string()))?;
    let transform_config = TransformConfig {
        width: profile.width,
        height: profile.height,
        input_profile: profile.input_profile.clone(),
        output_profile: profile.output_profile.clone(),
    };
    let rendition = transform::transform_image(img, &transform_config, profiles)?;
    let buf = match codec {
        Codec::Jpeg => rendition.jpegsave_buffer(profile.quality())?,
        Codec::Png => rendition.pngsave_buffer(profile.compression())?,
        Codec::Tiff => rendition.tiffsave_buffer()?,
        Codec::Webp => rendition.webpsave_buffer(profile.quality(), false)?,
    };
    Ok(buf)
}

/// Lowercased output extension: the profile type, or the source's for `same`.
pub fn output_extension(source: &Path, profile: &ProfileConfig) -> String {
    if profile.keeps_input_type() {
        source
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    } else {
        profile.file_type.trim().to_lowercase()
    }
}

/// `<root>/<source dir>`, with the source directory always nested under `root`.
pub fn output_dir(root: &Path, source: &Path) -> PathBuf {
    let mut dir = root.to_path_buf();
    if let Some(parent) = source.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(part) => dir.push(part),
                Component::ParentDir => dir.push(".."),
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            }
        }
    }
    dir
}

fn ensure_dir(dir: &Path) -> Result<(), ProcessError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ProcessError::NotADirectory),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(fs::create_dir_all(dir)?),
        Err(e) => Err(e.into()),
    }
}
