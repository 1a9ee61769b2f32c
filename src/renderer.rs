use crate::field::Field;
use crate::palette::Palette;

/// Frame layout: how many pixels the grid is stretched over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub frame_width: usize,
    pub frame_height: usize,
    pub grid_width: usize,
    pub grid_height: usize,
}

impl RenderConfig {
    /// Integer upscale: every cell becomes a `scale x scale` block.
    pub fn scaled(grid_width: usize, grid_height: usize, scale: usize) -> Self {
        let scale = scale.max(1);
        Self {
            frame_width: grid_width * scale,
            frame_height: grid_height * scale,
            grid_width,
            grid_height,
        }
    }

    /// Horizontal scale: display pixels per simulation cell.
    fn scale_x(&self) -> f64 {
        self.frame_width as f64 / self.grid_width as f64
    }

    /// Vertical scale: display pixels per simulation cell.
    fn scale_y(&self) -> f64 {
        self.frame_height as f64 / self.grid_height as f64
    }

    /// Grid cell under a frame pixel, for mapping mouse positions.
    pub fn pixel_to_cell(&self, px: f64, py: f64) -> (f64, f64) {
        (px / self.scale_x(), py / self.scale_y())
    }
}

/// Render the density field into an RGBA buffer, row 0 at the top.
pub fn render_into(buf: &mut Vec<u8>, density: &Field, cfg: &RenderConfig, palette: &Palette) {
    let (fw, fh) = (cfg.frame_width, cfg.frame_height);
    let (gw, gh) = density.dims();
    debug_assert_eq!((gw, gh), (cfg.grid_width, cfg.grid_height));
    buf.resize(fw * fh * 4, 0);

    // Nearest cell per pixel column, computed once per frame.
    let cols: Vec<usize> = (0..fw).map(|px| (px * gw / fw).min(gw - 1)).collect();
    for py in 0..fh {
        let j = (py * gh / fh).min(gh - 1);
        let row = &mut buf[py * fw * 4..(py + 1) * fw * 4];
        for (px, pixel) in row.chunks_exact_mut(4).enumerate() {
            pixel.copy_from_slice(&palette.sample_rgba(density.get(cols[px], j)));
        }
    }
}

/// Allocating convenience wrapper around `render_into`.
pub fn render(density: &Field, cfg: &RenderConfig, palette: &Palette) -> Vec<u8> {
    let mut buf = Vec::new();
    render_into(&mut buf, density, cfg, palette);
    buf
}

/// Pack RGBA bytes into minifb's 0RGB words.
pub fn rgba_to_argb(rgba: &[u8], out: &mut [u32]) {
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        out[i] = (pixel[0] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[2] as u32;
    }
}
