//! Input discovery.
//!
//! Expands the paths given on the command line into the list of files to
//! process and splits off the ones that are not images.
//!
//! ```text
//! sharpei photos/ extra/cover.png
//!
//! photos/               # directory: its files, subdirectories only with --recursive
//! ├── dawn.jpg          # image
//! ├── notes.txt         # reported as "not an image, skipping"
//! └── 2024/
//!     └── dusk.tif      # image (recursive only)
//! extra/cover.png       # file: taken as-is
//! ```
//!
//! Files are recognised by extension only; decoding failures surface later
//! as per-image errors.

use crate::config::Codec;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Walk(#[from] walkdir::Error),
}

/// Files found by [`scan`], split by whether they look like images.
#[derive(Debug, Default, PartialEq)]
pub struct Inputs {
    pub images: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Expand `paths` into files, descending into subdirectories when `recursive`.
///
/// Directory listings are sorted so that runs are reproducible.
pub fn scan(paths: &[PathBuf], recursive: bool) -> Result<Inputs, ScanError> {
    let mut inputs = Inputs::default();
    for file in collect_files(paths, recursive)? {
        if is_image(&file) {
            inputs.images.push(file);
        } else {
            inputs.skipped.push(file);
        }
    }
    tracing::debug!(
        images = inputs.images.len(),
        skipped = inputs.skipped.len(),
        "scan complete"
    );
    Ok(inputs)
}

fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for path in paths {
        let meta = fs::metadata(path).map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        if !meta.is_dir() {
            files.push(path.clone());
        } else if recursive {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_dir() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.extend(list_dir(path)?);
        }
    }
    Ok(files)
}

fn list_dir(path: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_dir() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

/// Whether the extension names a supported image type.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Codec::from_extension)
        .is_some()
}
