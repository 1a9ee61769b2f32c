use std::io::{self, Write};

use crate::error::{Result, SimError};
use crate::palette::Palette;

/// Encode an arbitrary RGBA buffer to Sixel with icy_sixel's quantizer.
/// Slower than `SixelEncoder` but keeps colours the palette cannot express.
pub fn encode_sixel(rgba: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    let sixel_output = icy_sixel::sixel_string(
        rgba,
        width as i32,
        height as i32,
        icy_sixel::PixelFormat::RGBA8888,
        icy_sixel::DiffusionMethod::None,
        icy_sixel::MethodForLargest::Auto,
        icy_sixel::MethodForRep::Auto,
        icy_sixel::Quality::LOW,
    )
    .map_err(|e| SimError::Render(format!("Sixel encoding error: {}", e)))?;

    Ok(sixel_output.into_bytes())
}

/// Output a Sixel-encoded frame to stdout.
/// Uses synchronized output (DEC 2026) and single write to minimize flicker.
pub fn output_frame(sixel_data: &[u8]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut buf = Vec::with_capacity(10 + 3 + sixel_data.len() + 10);
    buf.extend_from_slice(b"\x1b[?2026h"); // begin synchronized update
    buf.extend_from_slice(b"\x1b[H"); // cursor home
    buf.extend_from_slice(sixel_data);
    buf.extend_from_slice(b"\x1b[?2026l"); // end synchronized update
    handle.write_all(&buf)?;
    handle.flush()?;
    Ok(())
}

/// Number of Sixel colour registers used by `SixelEncoder`.
const PALETTE_SIZE: usize = 64;

/// Bits kept per channel when indexing the colour lookup table.
const LUT_BITS: u32 = 5;
const LUT_SIDE: usize = 1 << LUT_BITS;

/// Fast Sixel encoder with a fixed palette.
///
/// The registers hold `PALETTE_SIZE` evenly spaced samples of the density
/// palette, so rendered frames map onto them without quantization. Pixels
/// are matched through a 5-bit-per-channel lookup table.
pub struct SixelEncoder {
    registers: Vec<[u8; 3]>,
    header: Vec<u8>,
    lut: Vec<u8>,
}

impl SixelEncoder {
    pub fn new(palette: &Palette) -> Self {
        let registers: Vec<[u8; 3]> = (0..PALETTE_SIZE)
            .map(|i| palette.sample(i as f64 / (PALETTE_SIZE - 1) as f64))
            .collect();

        // Colour definitions use percentages.
        let mut header = Vec::with_capacity(PALETTE_SIZE * 16);
        for (n, rgb) in registers.iter().enumerate() {
            let [r, g, b] = rgb.map(|c| c as u32 * 100 / 255);
            let _ = write!(header, "#{n};2;{r};{g};{b}");
        }

        let lut = (0..LUT_SIDE * LUT_SIDE * LUT_SIDE)
            .map(|key| {
                let level = |shift: usize| ((key >> shift) & (LUT_SIDE - 1)) as u32 * 255 / (LUT_SIDE as u32 - 1);
                nearest_register(&registers, [level(2 * LUT_BITS as usize), level(LUT_BITS as usize), level(0)])
            })
            .collect();

        Self { registers, header, lut }
    }

    /// Colour register for an RGB triple.
    #[inline]
    fn register_of(&self, r: u8, g: u8, b: u8) -> u8 {
        let shift = 8 - LUT_BITS;
        let key = ((r >> shift) as usize) << (2 * LUT_BITS) | ((g >> shift) as usize) << LUT_BITS | (b >> shift) as usize;
        self.lut[key]
    }

    /// Encode an RGBA buffer to Sixel.
    pub fn encode(&self, rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
        let pixels: Vec<u8> = rgba
            .chunks_exact(4)
            .take(width * height)
            .map(|px| self.register_of(px[0], px[1], px[2]))
            .collect();

        let mut out = Vec::with_capacity(pixels.len() + self.header.len() + 32);
        // DCS, raster attributes, then the colour registers.
        let _ = write!(out, "\x1bP0;0;0q\"1;1;{width};{height}");
        out.extend_from_slice(&self.header);

        for (band, rows) in pixels.chunks(width.max(1) * 6).enumerate() {
            if band > 0 {
                out.push(b'-');
            }
            self.encode_band(&mut out, rows, width);
        }

        out.extend_from_slice(b"\x1b\\");
        out
    }

    /// Emit one six-row band: one pass per colour present, each pass a
    /// run-length encoded row of sixels.
    fn encode_band(&self, out: &mut Vec<u8>, rows: &[u8], width: usize) {
        let mut present = [false; PALETTE_SIZE];
        for &reg in rows {
            present[reg as usize] = true;
        }
        let band_rows = rows.len() / width.max(1);

        let mut first = true;
        for reg in (0..self.registers.len()).filter(|&r| present[r]) {
            if !first {
                out.push(b'$');
            }
            first = false;
            let _ = write!(out, "#{reg}");

            let mut run = Run::default();
            for x in 0..width {
                let bits = (0..band_rows)
                    .filter(|&dy| rows[dy * width + x] as usize == reg)
                    .fold(0u8, |acc, dy| acc | 1 << dy);
                run.push(out, 63 + bits);
            }
            run.flush(out);
        }
    }
}

/// Index of the register closest to `rgb` in squared RGB distance.
fn nearest_register(registers: &[[u8; 3]], rgb: [u32; 3]) -> u8 {
    let dist = |c: &[u8; 3]| -> i32 {
        (0..3)
            .map(|k| {
                let d = rgb[k] as i32 - c[k] as i32;
                d * d
            })
            .sum()
    };
    registers
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| dist(c))
        .map_or(0, |(n, _)| n as u8)
}

/// Pending repeat of one sixel character.
#[derive(Default)]
struct Run {
    ch: u8,
    len: u32,
}

impl Run {
    fn push(&mut self, out: &mut Vec<u8>, ch: u8) {
        if ch == self.ch {
            self.len += 1;
        } else {
            self.flush(out);
            *self = Run { ch, len: 1 };
        }
    }

    fn flush(&mut self, out: &mut Vec<u8>) {
        match self.len {
            0 => {}
            // Repeat introducer only pays off from four characters up.
            1..=3 => out.extend(std::iter::repeat(self.ch).take(self.len as usize)),
            n => {
                let _ = write!(out, "!{n}{}", self.ch as char);
            }
        }
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        rgba
    }

    #[test]
    fn test_encode_sixel_frames_image() {
        let data = encode_sixel(&solid(8, 6, [255, 0, 0]), 8, 6).unwrap();
        assert!(!data.is_empty(), "Output should not be empty");
        let s = String::from_utf8_lossy(&data);
        assert!(
            s.starts_with("\x1bP") || data[0] == 0x90,
            "Should start with DCS header, got: {:?}",
            &data[..data.len().min(10)]
        );
        assert!(
            s.ends_with("\x1b\\") || *data.last().unwrap() == 0x9c,
            "Should end with ST footer"
        );
    }

    #[test]
    fn test_custom_encoder_header_and_footer() {
        let encoder = SixelEncoder::new(&Palette::beach());
        let data = encoder.encode(&solid(8, 6, [128, 128, 128]), 8, 6);
        assert!(data.starts_with(b"\x1bP0;0;0q\"1;1;8;6"), "Should start with DCS + raster attributes");
        assert!(data.ends_with(b"\x1b\\"), "Should end with ST footer");
    }

    #[test]
    fn test_custom_encoder_band_count() {
        let encoder = SixelEncoder::new(&Palette::beach());
        // 13 rows -> 3 bands -> 2 band separators.
        let data = encoder.encode(&solid(4, 13, [0, 0x42, 0x9d]), 4, 13);
        let body = &data[encoder.header.len()..];
        assert_eq!(body.iter().filter(|&&b| b == b'-').count(), 2);
    }

    #[test]
    fn test_custom_encoder_run_length() {
        let encoder = SixelEncoder::new(&Palette::beach());
        let data = encoder.encode(&solid(16, 6, [0, 0x42, 0x9d]), 16, 6);
        let s = String::from_utf8_lossy(&data);
        // One colour fills the whole band: a single run of 16 full sixels.
        assert!(s.contains("!16~"), "expected RLE run in {s:?}");
    }

    #[test]
    fn test_palette_endpoints_map_to_end_registers() {
        let palette = Palette::beach();
        let encoder = SixelEncoder::new(&palette);
        let [r, g, b] = palette.sample(0.0);
        assert_eq!(encoder.register_of(r, g, b), 0);
        let [r, g, b] = palette.sample(1.0);
        assert_eq!(encoder.register_of(r, g, b), (PALETTE_SIZE - 1) as u8);
    }
}
