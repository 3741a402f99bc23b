//! LED strip abstraction
//!
//! The hardware capability the render loop drives: set a pixel, push the
//! buffer, clear everything. Production implementations live in the
//! application layer (SPI on the Pi); `MemoryStrip` here backs tests and
//! dry-run mode.

use rgb::RGB8;

use crate::state::PixelDiff;
use crate::types::BLACK;

/// Errors from a strip implementation
///
/// Non-fatal at runtime: the render loop reports these and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum StripError {
    #[error("LED index {index} out of range for strip of {len} pixels")]
    OutOfRange { index: u16, len: u16 },

    #[error("strip write failed: {0}")]
    Io(String),
}

/// Capability for an addressable LED strip
pub trait LedStrip: Send {
    /// Number of pixels on the strip
    fn len(&self) -> u16;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage a color for one pixel (no hardware effect until `show`)
    fn set_pixel(&mut self, index: u16, color: RGB8) -> Result<(), StripError>;

    /// Flush the staged buffer to the hardware
    fn show(&mut self) -> Result<(), StripError>;

    /// Turn every pixel off and flush
    fn clear_all(&mut self) -> Result<(), StripError> {
        for index in 0..self.len() {
            self.set_pixel(index, BLACK)?;
        }
        self.show()
    }
}

/// Apply a diff: off-pixels to black, on-pixels to their color, one flush
pub fn apply_diff(strip: &mut impl LedStrip, diff: &PixelDiff) -> Result<(), StripError> {
    for &index in &diff.off {
        strip.set_pixel(index, BLACK)?;
    }
    for &(index, color) in &diff.on {
        strip.set_pixel(index, color)?;
    }
    strip.show()
}

/// Scale a color by a 0..=1 brightness factor
pub fn scale_color(color: RGB8, factor: f32) -> RGB8 {
    let k = factor.clamp(0.0, 1.0);
    RGB8 {
        r: (f32::from(color.r) * k) as u8,
        g: (f32::from(color.g) * k) as u8,
        b: (f32::from(color.b) * k) as u8,
    }
}

/// In-memory strip for tests and `--dry-run`
#[derive(Debug)]
pub struct MemoryStrip {
    pixels: Vec<RGB8>,
    /// Number of successful `show` calls
    pub show_count: usize,
    /// When set, the next `show` fails once with an injected error
    pub fail_next_show: bool,
}

impl MemoryStrip {
    pub fn new(len: u16) -> Self {
        Self {
            pixels: vec![BLACK; usize::from(len)],
            show_count: 0,
            fail_next_show: false,
        }
    }

    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// The staged color at `index`, or `None` past the end of the strip
    pub fn pixel(&self, index: u16) -> Option<RGB8> {
        self.pixels.get(usize::from(index)).copied()
    }

    /// Indices of all non-black pixels, in strip order
    pub fn lit_indices(&self) -> Vec<u16> {
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, px)| **px != BLACK)
            .map(|(i, _)| i as u16)
            .collect()
    }
}

impl LedStrip for MemoryStrip {
    fn len(&self) -> u16 {
        self.pixels.len() as u16
    }

    fn set_pixel(&mut self, index: u16, color: RGB8) -> Result<(), StripError> {
        let len = self.pixels.len() as u16;
        let slot = self
            .pixels
            .get_mut(usize::from(index))
            .ok_or(StripError::OutOfRange { index, len })?;
        *slot = color;
        Ok(())
    }

    fn show(&mut self) -> Result<(), StripError> {
        if self.fail_next_show {
            self.fail_next_show = false;
            return Err(StripError::Io("injected failure".to_string()));
        }
        self.show_count += 1;
        Ok(())
    }
}
