//! Core types for the bin indicator library
//!
//! This module defines the fundamental types shared across the library:
//! the bin entries the lookup table resolves to, the scan events produced
//! by the input device, and the error taxonomy for map construction.

use chrono::{DateTime, Utc};
use rgb::RGB8;

/// Timestamp type used for scan events
pub type Timestamp = DateTime<Utc>;

/// Result type for map construction and validation
pub type Result<T> = std::result::Result<T, MapError>;

/// Pixel value for an unlit LED
pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// A physical bin location and the LED segment that marks it
///
/// Built once at startup from the lookup dataset and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinEntry {
    /// Human-readable bin identifier (e.g. "D3")
    pub bin_id: String,
    /// LED positions marking this bin, in strip order. Never empty;
    /// every index is below the configured strip length.
    pub led_indices: Vec<u16>,
    /// Fixed color for this bin's segment
    pub color: RGB8,
}

/// A single scan delivered by the input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Raw line as read from the scanner, before trimming
    pub raw_text: String,
    /// When the line was received
    pub timestamp: Timestamp,
}

impl ScanEvent {
    /// Create a scan event stamped with the current time
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of classifying and looking up a scanned line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The scan mapped to a bin (directly or via a sales order)
    Matched(BinEntry),
    /// Unknown format or lookup miss - expected and non-fatal
    Unrecognized(String),
    /// The exit sentinel was scanned or typed
    ExitRequested,
}

/// Errors that can occur while building the bin map
///
/// All of these are fatal at startup: the system refuses to run with an
/// invalid map rather than light wrong or absent pixels.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: String },

    #[error("bin mapping for '{0}' has an empty LED index list")]
    EmptyIndices(String),

    #[error("bin mapping for '{code}': LED index {index} out of range for strip of {strip_len} LEDs")]
    IndexOutOfRange {
        code: String,
        index: u16,
        strip_len: u16,
    },

    #[error("bin mapping for '{code}': invalid LED index '{value}'")]
    InvalidIndex { code: String, value: String },

    #[error("bin mapping for '{code}': unknown color '{color}'")]
    UnknownColor { code: String, color: String },

    #[error("duplicate code in bin mapping: {0}")]
    DuplicateCode(String),

    #[error("duplicate sales order ID: {0}")]
    DuplicateOrder(String),

    #[error("sales order {order} references unknown code '{code}'")]
    DanglingOrder { order: String, code: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a color column value into an RGB triple
///
/// Accepts the fixed palette names used by the floor dataset
/// (case-insensitive) or a numeric "r,g,b" triple. Returns `None` for
/// anything else; the caller turns that into a `MapError::UnknownColor`.
pub fn color_from_name(name: &str) -> Option<RGB8> {
    let trimmed = name.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "orange" => Some(RGB8 { r: 255, g: 165, b: 0 }),
        "white" => Some(RGB8 { r: 255, g: 255, b: 255 }),
        "blue" => Some(RGB8 { r: 0, g: 0, b: 255 }),
        "green" => Some(RGB8 { r: 0, g: 255, b: 0 }),
        "red" => Some(RGB8 { r: 255, g: 0, b: 0 }),
        "purple" => Some(RGB8 { r: 128, g: 0, b: 128 }),
        _ => parse_rgb_triple(trimmed),
    }
}

fn parse_rgb_triple(text: &str) -> Option<RGB8> {
    let mut parts = text.split(',').map(str::trim);
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RGB8 { r, g, b })
}
