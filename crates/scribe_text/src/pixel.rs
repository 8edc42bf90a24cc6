//! Atlas pixel formats and writers
//!
//! A [`PixelWriter`] is selected once per font from the page format and the
//! antialias flag. It holds two function pointers, one that stores a
//! luminance/alpha pair in the page format and one that maps a source
//! coverage byte to that pair, so the copy loops never branch per pixel.

/// Page pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Two bytes per pixel: luminance, alpha
    LuminanceAlpha8,
    /// Four bytes per pixel: luminance replicated to RGB, alpha
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::LuminanceAlpha8 => 2,
            PixelFormat::Rgba8 => 4,
        }
    }
}

type StoreFn = fn(&mut [u8], u8, u8);
type SampleFn = fn(u8) -> (u8, u8);

fn store_la(dst: &mut [u8], lum: u8, alpha: u8) {
    dst[0] = lum;
    dst[1] = alpha;
}

fn store_rgba(dst: &mut [u8], lum: u8, alpha: u8) {
    dst[0] = lum;
    dst[1] = lum;
    dst[2] = lum;
    dst[3] = alpha;
}

fn sample_antialiased(src: u8) -> (u8, u8) {
    (src, src)
}

fn sample_solid(src: u8) -> (u8, u8) {
    (0xFF, src)
}

/// Writes glyph pixels into an atlas page
#[derive(Clone, Copy)]
pub struct PixelWriter {
    format: PixelFormat,
    antialias: bool,
    store: StoreFn,
    sample: SampleFn,
}

impl PixelWriter {
    pub fn select(format: PixelFormat, antialias: bool) -> Self {
        let store: StoreFn = match format {
            PixelFormat::LuminanceAlpha8 => store_la,
            PixelFormat::Rgba8 => store_rgba,
        };
        let sample: SampleFn = if antialias {
            sample_antialiased
        } else {
            sample_solid
        };
        Self {
            format,
            antialias,
            store,
            sample,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    /// Fill a `width`x`height` block at (`x`, `y`).
    ///
    /// Even columns get `lum0`, odd columns `lum1`; every pixel gets `alpha`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &self,
        dst: &mut [u8],
        pitch: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        lum0: u8,
        lum1: u8,
        alpha: u8,
    ) {
        let bpp = self.format.bytes_per_pixel();
        for row in 0..height {
            let start = (y + row) * pitch + x * bpp;
            for (col, px) in dst[start..start + width * bpp].chunks_exact_mut(bpp).enumerate() {
                let lum = if col % 2 == 0 { lum0 } else { lum1 };
                (self.store)(px, lum, alpha);
            }
        }
    }

    /// Copy an 8-bit coverage bitmap into a `width`x`height` block.
    ///
    /// Pixels outside the `src_width`x`src_rows` source are written
    /// transparent.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &self,
        dst: &mut [u8],
        pitch: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        src: &[u8],
        src_width: usize,
        src_rows: usize,
        src_pitch: usize,
    ) {
        let bpp = self.format.bytes_per_pixel();
        for row in 0..height {
            let start = (y + row) * pitch + x * bpp;
            let line = dst[start..start + width * bpp].chunks_exact_mut(bpp);
            for (col, px) in line.enumerate() {
                let coverage = if row < src_rows && col < src_width {
                    src.get(row * src_pitch + col).copied()
                } else {
                    None
                };
                match coverage {
                    Some(value) => {
                        let (lum, alpha) = (self.sample)(value);
                        (self.store)(px, lum, alpha);
                    }
                    None => (self.store)(px, 0, 0),
                }
            }
        }
    }
}

impl std::fmt::Debug for PixelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelWriter")
            .field("format", &self.format)
            .field("antialias", &self.antialias)
            .finish()
    }
}
