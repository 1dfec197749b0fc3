use thiserror::Error;

/// Failure of a single adapter call.
///
/// No adapter recovers locally: the first failing step is reported as-is and
/// the caller decides what to do with the handle it still owns.
#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid option string: {0}")]
    InvalidOptions(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Color transform failed: {0}")]
    Color(String),
    #[error("Profile load failed: {0}")]
    Profile(String),
}
