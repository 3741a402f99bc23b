//! WS2812 LED strip over SPI
//!
//! The strip hangs off the Pi's SPI MOSI pin. WS2812 timing is faked by
//! running the bus at 2.4 MHz and stretching every data bit into a 3-bit
//! pattern: `0b100` for a zero, `0b110` for a one. Each 8-bit color byte
//! therefore becomes exactly 3 SPI bytes. Bytes go out in GRB order, and
//! a tail of zero bytes holds the line low long enough (>= 50 us) to
//! latch the frame.

use rgb::RGB8;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tipout_core::strip::{scale_color, LedStrip, StripError};
use tipout_core::types::BLACK;

use crate::config::StripConfig;

/// 3 SPI bits per WS2812 bit at this clock gives ~416 ns per bit
const SPI_CLOCK_HZ: u32 = 2_400_000;

/// Zero bytes appended after the frame; 18 bytes at 2.4 MHz is 60 us
const LATCH_BYTES: usize = 18;

/// Expand one color byte into its 3-byte SPI bit pattern
fn encode_byte(byte: u8) -> [u8; 3] {
    let mut acc: u32 = 0;
    for bit in (0..8).rev() {
        let pattern = if byte & (1 << bit) != 0 { 0b110 } else { 0b100 };
        acc = (acc << 3) | pattern;
    }
    [(acc >> 16) as u8, (acc >> 8) as u8, acc as u8]
}

/// Push a whole frame through a writer that may accept fewer bytes than
/// offered
///
/// spidev transfers are capped by the kernel's bufsiz (4096 bytes by
/// default), and a frame is led_count * 9 + 18 bytes, so long strips need
/// several writes. A writer that accepts nothing is an error; a partial
/// frame would light wrong pixels.
fn write_frame<W>(mut write: W, frame: &[u8]) -> Result<(), StripError>
where
    W: FnMut(&[u8]) -> Result<usize, StripError>,
{
    let mut written = 0;
    while written < frame.len() {
        let n = write(&frame[written..])?;
        if n == 0 {
            return Err(StripError::Io("SPI device accepted no bytes".to_string()));
        }
        written += n;
    }
    Ok(())
}

/// A WS2812 strip on the Pi's SPI bus
pub struct SpiStrip {
    spi: Spi,
    pixels: Vec<RGB8>,
    brightness: f32,
}

impl SpiStrip {
    /// Open the SPI device and allocate the pixel buffer
    pub fn open(config: &StripConfig) -> Result<Self, StripError> {
        let bus = match config.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => {
                return Err(StripError::Io(format!("unsupported SPI bus {}", other)));
            }
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| StripError::Io(e.to_string()))?;

        log::info!(
            "SPI strip opened: bus {}, {} LEDs, brightness {:.2}",
            config.spi_bus,
            config.led_count,
            config.brightness
        );

        Ok(Self {
            spi,
            pixels: vec![BLACK; usize::from(config.led_count)],
            brightness: config.brightness.clamp(0.0, 1.0),
        })
    }

    fn encode_frame(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 9 + LATCH_BYTES);
        for pixel in &self.pixels {
            let scaled = scale_color(*pixel, self.brightness);
            for byte in [scaled.g, scaled.r, scaled.b] {
                out.extend_from_slice(&encode_byte(byte));
            }
        }
        out.resize(out.len() + LATCH_BYTES, 0);
        out
    }
}

impl LedStrip for SpiStrip {
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
        let frame = self.encode_frame();
        let spi = &mut self.spi;
        write_frame(
            |chunk| spi.write(chunk).map_err(|e| StripError::Io(e.to_string())),
            &frame,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_byte_all_zeros() {
        // 0b100 repeated eight times: 100100100 100100100 100100...
        assert_eq!(encode_byte(0x00), [0x92, 0x49, 0x24]);
    }

    #[test]
    fn test_encode_byte_all_ones() {
        assert_eq!(encode_byte(0xFF), [0xDB, 0x6D, 0xB6]);
    }

    #[test]
    fn test_encode_byte_msb_first() {
        // 0b1000_0000: first pattern is 110, the remaining seven are 100
        assert_eq!(encode_byte(0x80), [0xD2, 0x49, 0x24]);
    }

    #[test]
    fn test_write_frame_retries_partial_writes() {
        // Device accepts at most 7 bytes per call, like a small bufsiz
        let frame: Vec<u8> = (0..40).collect();
        let mut sent = Vec::new();
        write_frame(
            |chunk| {
                let n = chunk.len().min(7);
                sent.extend_from_slice(&chunk[..n]);
                Ok(n)
            },
            &frame,
        )
        .unwrap();
        assert_eq!(sent, frame);
    }

    #[test]
    fn test_write_frame_errors_on_stalled_device() {
        let frame = [0u8; 16];
        let result = write_frame(|_| Ok(0), &frame);
        assert!(matches!(result, Err(StripError::Io(_))));
    }

    #[test]
    fn test_write_frame_propagates_device_error() {
        let frame = [0u8; 16];
        let result = write_frame(|_| Err(StripError::Io("EIO".to_string())), &frame);
        assert!(result.is_err());
    }
}
