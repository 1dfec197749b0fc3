//! # sharpei
//!
//! Colour-managed batch resizing for photographers, built on a small
//! fixed-arity image-processing facade.
//!
//! # Architecture: Facade and Application
//!
//! ```text
//! imaging   decode · encode · resize · icc import/export · metadata · autorot · copy
//!    ↑
//! ffi       the same adapters as flat `extern "C"` functions
//!    ↑
//! transform attach profile → Lab → resize → export          (one image, one profile)
//!    ↑
//! process   scan results × profiles → files on disk          (parallel, event stream)
//! ```
//!
//! The [`imaging`] facade is stateless: every adapter takes a handle and
//! returns a new handle or an encoded buffer. Pipelines are assembled by the
//! caller, either the application layer below or a foreign runtime through
//! [`ffi`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Image handle plus decode, encode, geometry, colour and metadata adapters |
//! | [`ffi`] | C ABI over [`imaging`] with status codes and a thread-local error buffer |
//! | [`config`] | `sharpei.toml` loading, discovery, validation and the stock config |
//! | [`scan`] | Expands command-line paths into image files |
//! | [`template`] | `{name}_{profile}` output filename templates |
//! | [`transform`] | Colour-managed resize of one image for one profile |
//! | [`process`] | Parallel rendition pipeline reporting progress events |
//! | [`output`] | CLI output formatting for events and the run summary |
//!
//! # Design Decisions
//!
//! ## Resizing in Lab
//!
//! Images are converted to CIE Lab before resampling and exported to the
//! target profile afterwards. Averaging gamma-encoded values darkens fine
//! detail; Lab keeps perceived lightness while letting every rendition pick
//! its own output profile.
//!
//! ## Pure-Rust Colour Management
//!
//! ICC parsing and transforms come from `moxcms`; decoding, resampling and
//! most encoders from `image`. Only lossy WebP goes through libwebp.

pub mod config;
pub mod ffi;
pub mod imaging;
pub mod output;
pub mod process;
pub mod scan;
pub mod template;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
