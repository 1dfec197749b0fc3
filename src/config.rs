//! Configuration module.
//!
//! A sharpei run is driven by a set of named *profiles*, each describing one
//! rendition (size, colour profiles, output codec) to produce for every input
//! image.
//!
//! ## Config File Location
//!
//! When `--config` is not given and no profile flags are passed on the
//! command line, the first existing file of this list is used:
//!
//! ```text
//! ./sharpei.toml
//! ./.sharpei.toml
//! ~/.sharpei.toml
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! output = "."                  # Output root directory
//! format = "{name}_{profile}"   # Output filename template (no extension)
//! rewrite = false               # Overwrite existing outputs
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//!
//! [profiles.web]
//! width = 2048                  # 0 = unconstrained
//! height = 0
//! input_profile = ""            # Assumed when the image embeds none
//! output_profile = "srgb"       # Defaults to input_profile
//! type = "jpeg"                 # same | jpeg | png | webp | tiff (+ aliases)
//! quality = 0                   # 0 = 95
//! compression = 0               # 0 = 7
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Compression, Quality};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },
}

/// File names searched, in order, when no config is given explicitly.
pub const CONFIG_FILE_NAMES: &[&str] = &["sharpei.toml", ".sharpei.toml"];

pub const DEFAULT_FORMAT: &str = "{name}_{profile}";
const DEFAULT_QUALITY: i64 = 95;
const DEFAULT_COMPRESSION: i64 = 7;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root directory for all renditions.
    pub output: PathBuf,
    /// Filename template with `{name}` and `{profile}` placeholders.
    pub format: String,
    /// Overwrite renditions that already exist.
    pub rewrite: bool,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Renditions to produce, keyed by profile name.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            format: DEFAULT_FORMAT.to_string(),
            rewrite: false,
            processing: ProcessingConfig::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate the configuration as a whole.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Validation(
                "at least one profile must be configured".into(),
            ));
        }
        if self.format.trim().is_empty() {
            return Err(ConfigError::Validation("format must not be empty".into()));
        }
        crate::template::validate(&self.format, &["name", "profile"])
            .map_err(|e| ConfigError::Validation(format!("format: {e}")))?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (name, profile) in &self.profiles {
            profile
                .validate()
                .map_err(|msg| ConfigError::Validation(format!("profiles.{name}: {msg}")))?;
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// One rendition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Target width; 0 leaves the width unconstrained.
    pub width: i64,
    /// Target height; 0 leaves the height unconstrained.
    pub height: i64,
    /// Profile assumed for images without an embedded one.
    pub input_profile: String,
    /// Profile of the rendition; defaults to the input profile.
    pub output_profile: String,
    /// Output type, `same` keeps the input's extension.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Lossy quality, 0 means the default.
    pub quality: i64,
    /// PNG deflate level, 0 means the default.
    pub compression: i64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            input_profile: String::new(),
            output_profile: String::new(),
            file_type: "same".to_string(),
            quality: 0,
            compression: 0,
        }
    }
}

impl ProfileConfig {
    fn validate(&self) -> Result<(), String> {
        if self.width <= 0 && self.height <= 0 {
            return Err("width or height must be greater than zero".into());
        }
        if !self.keeps_input_type() && Codec::from_extension(&self.file_type).is_none() {
            return Err(format!(
                "unsupported type {:?}, use same, jpg, png, webp or tiff",
                self.file_type
            ));
        }
        Ok(())
    }

    /// Whether the rendition reuses the input file's extension.
    pub fn keeps_input_type(&self) -> bool {
        let t = self.file_type.trim();
        t.is_empty() || t.eq_ignore_ascii_case("same")
    }

    /// Effective lossy quality: 0 → 95, clamped to 1–100.
    pub fn quality(&self) -> Quality {
        match self.quality {
            0 => Quality::new(DEFAULT_QUALITY),
            q => Quality::new(q),
        }
    }

    /// Effective PNG compression: 0 → 7, clamped to 1–9.
    pub fn compression(&self) -> Compression {
        match self.compression {
            0 => Compression::new(DEFAULT_COMPRESSION),
            c => Compression::new(c.clamp(1, 9)),
        }
    }
}

/// Encoder selected by an output type or file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Jpeg,
    Png,
    Tiff,
    Webp,
}

impl Codec {
    /// Case-insensitive, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "jpe" | "jif" | "jfif" | "jfi" => Some(Codec::Jpeg),
            "png" => Some(Codec::Png),
            "tiff" | "tif" => Some(Codec::Tiff),
            "webp" => Some(Codec::Webp),
            _ => None,
        }
    }
}

// =============================================================================
// Config loading and discovery
// =============================================================================

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let wrap = |source: ConfigError| ConfigError::File {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let content = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
    let config: Config = toml::from_str(&content).map_err(|e| wrap(e.into()))?;
    config.validate().map_err(wrap)?;
    Ok(config)
}

/// Candidate config paths, in search order.
pub fn config_candidates(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|n| cwd.join(n)).collect();
    if let Some(home) = home {
        candidates.push(home.join(".sharpei.toml"));
    }
    candidates
}

/// First existing config among [`config_candidates`].
pub fn discover_config(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    config_candidates(cwd, home)
        .into_iter()
        .find(|p| p.is_file())
}

/// Config synthesised from command-line profile flags: one `thumbnail` profile.
pub fn from_cli_profile(
    output: PathBuf,
    format: String,
    rewrite: bool,
    profile: ProfileConfig,
) -> Result<Config, ConfigError> {
    let config = Config {
        output,
        format,
        rewrite,
        processing: ProcessingConfig::default(),
        profiles: BTreeMap::from([("thumbnail".to_string(), profile)]),
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `sharpei.toml` with all keys and explanations.
///
/// Used by the `--gen-config` flag.
pub fn stock_config_toml() -> &'static str {
    r##"# sharpei configuration
# =====================
# Each [profiles.NAME] table describes one rendition produced for every
# input image. Unknown keys will cause an error.

# Root directory for renditions. The input's directory is recreated below it.
output = "."

# Output filename without extension. Placeholders: {name} (input file stem)
# and {profile} (profile name). Use {{ and }} for literal braces.
format = "{name}_{profile}"

# Overwrite renditions that already exist.
rewrite = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Profiles
# ---------------------------------------------------------------------------
[profiles.web]
# Target box. The image is scaled so that it covers width x height;
# 0 leaves a side unconstrained. At least one side must be set.
width = 2048
height = 0

# ICC profile assumed when the image embeds none. Built-in names:
# srgb, srgb-v2, srgb-v4, gray, p3, adobe-rgb. Anything else is a path
# to an .icc file. Empty = gray for grayscale images, srgb otherwise.
input_profile = ""

# ICC profile of the rendition. Empty = same as input_profile.
output_profile = "srgb"

# same | jpeg | png | webp | tiff
type = "jpeg"

# JPEG/WebP quality 1-100 (0 = 95).
quality = 0

# PNG compression 1-9 (0 = 7).
compression = 0
"##
}
