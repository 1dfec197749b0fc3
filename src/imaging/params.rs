//! Parameter types for the encoder adapters.
//!
//! These are the "hardcoded option subset" of each encoder expressed as
//! ordinary typed values. They clamp on construction so that every value an
//! adapter receives is one the codec accepts.
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 95).
//! - [`Compression`]: PNG deflate level (0–9, default 7). Level 0 stores the data uncompressed.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// PNG deflate compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression(u8);

impl Compression {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 9) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self(7)
    }
}
