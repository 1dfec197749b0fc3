//! Image processing facade: fixed-arity adapters over the Rust imaging stack.
//!
//! | Adapter | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, TIFF, WebP) + ICC/EXIF/XMP/IPTC extraction |
//! | **JPEG** | `jpeg-encoder` with optimized Huffman tables |
//! | **PNG** | `image::codecs::png::PngEncoder`, filtering disabled |
//! | **WebP** | `webp` (libwebp), lossy or lossless |
//! | **TIFF** | `image::codecs::tiff::TiffEncoder` |
//! | **Resize** | `image::imageops::resize` with `Lanczos3`, independent x/y scales |
//! | **ICC import/export** | `moxcms` transforms into linear ProPhoto, then CIE Lab (D50) |
//! | **Autorot** | `image::DynamicImage::apply_orientation` |
//!
//! Every adapter is a single synchronous call that takes a handle and returns
//! a new handle (or an encoded buffer). Nothing is retained between calls; a
//! pipeline such as decode → import → resize → export → encode is assembled
//! by the caller (see [`crate::transform`]).
//!
//! The module is split into:
//! - **Handle**: [`Image`] with copy-on-write pixels, interpretation, metadata
//! - **Parameters**: [`Quality`], [`Compression`], [`Intent`], [`Depth`]
//! - **Adapters**: `decode`, `encode`, `geometry`, `color`, `profile`, `metadata`

mod color;
mod decode;
mod encode;
mod error;
mod geometry;
mod handle;
mod metadata;
mod options;
mod params;
mod profile;

pub use color::{Depth, Intent};
pub use error::ImagingError;
pub use handle::{BandFormat, Image, Interpretation};
pub use metadata::{FieldValue, fields};
pub use options::LoadOptions;
pub use params::{Compression, Quality};
pub use profile::{BUILTIN_PROFILES, Profile, profile_load};

/// Result type for every adapter in the facade.
pub type Result<T> = std::result::Result<T, ImagingError>;
