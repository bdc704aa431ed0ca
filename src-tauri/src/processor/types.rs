//! Wire and value types shared between the processor client and the session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier the processor assigns on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local file about to be uploaded.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Metadata returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: ImageId,
    pub filename: String,
    pub format: String,
    #[serde(default)]
    pub mode: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// Which rendition of the image to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Original,
    Processed,
}

impl Variant {
    /// Value of the `processed` query flag.
    pub fn is_processed(&self) -> bool {
        matches!(self, Variant::Processed)
    }
}

/// One-shot enhancements applied on the processor side. They sit on top of
/// the parametric timeline and are never recorded in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OneShot {
    AutoAdjust,
    Clahe { clip_limit: f64, tile_grid_size: u32 },
    SCurve { intensity: f64 },
}

impl OneShot {
    pub fn name(&self) -> &'static str {
        match self {
            OneShot::AutoAdjust => "auto-adjust",
            OneShot::Clahe { .. } => "CLAHE",
            OneShot::SCurve { .. } => "S-curve",
        }
    }
}

/// A decoded preview image.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Per-channel pixel counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Histogram {
    Rgb {
        red: Vec<u64>,
        green: Vec<u64>,
        blue: Vec<u64>,
    },
    Gray {
        gray: Vec<u64>,
    },
}

impl Histogram {
    /// Largest bucket across all channels, used to scale bars.
    pub fn peak(&self) -> u64 {
        match self {
            Histogram::Rgb { red, green, blue } => red
                .iter()
                .chain(green)
                .chain(blue)
                .copied()
                .max()
                .unwrap_or(0),
            Histogram::Gray { gray } => gray.iter().copied().max().unwrap_or(0),
        }
    }
}
