//! Named metadata fields attached to an [`Image`].
//!
//! Two kinds of names are visible through [`Image::get_fields`]:
//!
//! - **header fields** (`width`, `height`, `bands`, `format`,
//!   `interpretation`) derived from the pixels: always present, never removable;
//! - **dictionary fields** filled by the decoder or by the caller: the ICC
//!   profile, EXIF/XMP/IPTC blobs and the EXIF orientation.
//!
//! Field order is not contractual.

use super::handle::Image;
use std::collections::BTreeMap;

/// Well-known field names.
pub mod fields {
    pub const ICC_PROFILE: &str = "icc-profile-data";
    pub const EXIF: &str = "exif-data";
    pub const XMP: &str = "xmp-data";
    pub const IPTC: &str = "iptc-data";
    pub const ORIENTATION: &str = "orientation";

    pub(crate) const HEADER: &[&str] = &["width", "height", "bands", "format", "interpretation"];
}

/// Value stored under a metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Human-readable rendering, blobs shown by size only.
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Double(v) => v.to_string(),
            FieldValue::String(s) => s.clone(),
            FieldValue::Blob(b) => format!("{} bytes of binary data", b.len()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Metadata {
    entries: BTreeMap<String, FieldValue>,
}

impl Metadata {
    pub(crate) fn insert(&mut self, name: &str, value: FieldValue) {
        self.entries.insert(name.to_string(), value);
    }

    fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.get(name)
    }

    fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Image {
    /// Names of every field on the image: header fields first, then the dictionary.
    pub fn get_fields(&self) -> Vec<String> {
        fields::HEADER
            .iter()
            .copied()
            .chain(self.metadata.names())
            .map(str::to_string)
            .collect()
    }

    /// Remove a dictionary field. Returns `true` if it existed and was removed.
    ///
    /// Header fields cannot be removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.metadata.remove(name);
        tracing::trace!(name, removed, "remove field");
        removed
    }

    /// Whether a field (header or dictionary) exists.
    pub fn is_set(&self, name: &str) -> bool {
        fields::HEADER.contains(&name) || self.metadata.get(name).is_some()
    }

    /// Look up a field. Header fields are synthesised from the pixels.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        match name {
            "width" => Some(FieldValue::Int(self.width() as i32)),
            "height" => Some(FieldValue::Int(self.height() as i32)),
            "bands" => Some(FieldValue::Int(i32::from(self.bands()))),
            "format" => Some(FieldValue::String(self.band_format().name().into())),
            "interpretation" => Some(FieldValue::String(self.interpretation.name().into())),
            _ => self.metadata.get(name).cloned(),
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            FieldValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_blob(&self, name: &str) -> Option<&[u8]> {
        match self.metadata.get(name)? {
            FieldValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn get_as_string(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_display_string())
    }

    /// Attach a copy of `data` under `name`, replacing any previous value.
    pub fn set_blob(&mut self, name: &str, data: &[u8]) {
        self.metadata.insert(name, FieldValue::Blob(data.to_vec()));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.metadata.insert(name, FieldValue::Int(value));
    }

    pub fn set_string(&mut self, name: &str, value: &str) {
        self.metadata
            .insert(name, FieldValue::String(value.to_string()));
    }
}
