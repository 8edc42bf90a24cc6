//! Glyph rasterization
//!
//! The font resource sees the rasterizer only through [`FaceLoader`] and
//! [`RasterFace`]. [`SwashFace`] is the bundled implementation: ttf-parser
//! answers cmap, OS/2 and bounding-box queries and swash renders bitmaps.

use crate::font::Hinting;
use crate::stream::{read_to_end, FontStream};
use crate::{Result, TextError};
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;

/// Pixel size used by faces that never get a character size
const DEFAULT_PIXEL_SIZE: f32 = 16.0;

/// OS/2 table vertical metrics in font units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Os2Metrics {
    pub win_ascent: u16,
    pub win_descent: u16,
    pub typo_ascender: i16,
    /// Usually negative
    pub typo_descender: i16,
}

/// Face-wide metrics for the current character size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceMetrics {
    /// Ascender in pixels
    pub ascender_px: i32,
    /// Descender in pixels, positive below the baseline
    pub descender_px: i32,
    pub y_ppem: u16,
    pub units_per_em: u16,
    pub os2: Option<Os2Metrics>,
}

impl FaceMetrics {
    /// Font-wide `(ascent, descent)` in pixels.
    ///
    /// Each value is the largest of the size metrics, the OS/2 Windows pair
    /// and the OS/2 typographic pair, the latter two scaled by
    /// `y_ppem / units_per_em` in integer arithmetic.
    pub fn line_extents(&self) -> (i32, i32) {
        let mut ascent = self.ascender_px;
        let mut descent = self.descender_px;

        if let Some(os2) = self.os2.filter(|_| self.units_per_em > 0) {
            let ppem = i64::from(self.y_ppem);
            let upem = i64::from(self.units_per_em);
            let scale = |value: i64| {
                (value * ppem / upem).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
            };

            ascent = ascent.max(scale(i64::from(os2.win_ascent)));
            descent = descent.max(scale(i64::from(os2.win_descent)));
            ascent = ascent.max(scale(i64::from(os2.typo_ascender)));
            descent = descent.max(scale(-i64::from(os2.typo_descender)));
        }

        (ascent, descent)
    }
}

/// Glyph selector for [`RasterFace::load_glyph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceGlyph {
    Char(char),
    /// The face's `.notdef` glyph
    NotDefined,
}

/// Glyph load options derived from the font's hinting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFlags {
    pub hinting: Hinting,
    /// Produce a bitmap, and take metrics from it
    pub render: bool,
}

impl LoadFlags {
    /// Flags for a hinting mode. Unhinted glyphs are always rendered since
    /// their outline metrics and bitmap metrics can disagree.
    pub fn for_hinting(hinting: Hinting) -> Self {
        Self {
            hinting,
            render: hinting == Hinting::DisableAll,
        }
    }

    pub fn rendered(self) -> Self {
        Self {
            render: true,
            ..self
        }
    }
}

/// Glyph metrics in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub width: f32,
    pub height: f32,
    pub bearing_x: f32,
    /// Baseline to glyph top, positive upwards
    pub bearing_y: f32,
    /// Pen advance from the origin
    pub advance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// One byte of coverage per pixel
    Gray,
    /// One bit per pixel, most significant bit first
    Mono,
}

/// A rendered glyph image
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u32,
    pub rows: u32,
    /// Bytes per row
    pub pitch: usize,
    pub mode: PixelMode,
    pub buffer: Vec<u8>,
}

impl Bitmap {
    /// Tightly packed 8-bit coverage (`width * rows` bytes).
    ///
    /// Monochrome bits become 0xFF, clear bits 0x00.
    pub fn to_gray(&self) -> Vec<u8> {
        let width = self.width as usize;
        let rows = self.rows as usize;
        let mut out = Vec::with_capacity(width * rows);

        for row in 0..rows {
            let line = row * self.pitch;
            for col in 0..width {
                let value = match self.mode {
                    PixelMode::Gray => self.buffer.get(line + col).copied().unwrap_or(0),
                    PixelMode::Mono => {
                        let byte = self.buffer.get(line + col / 8).copied().unwrap_or(0);
                        if byte & (0x80 >> (col % 8)) != 0 {
                            0xFF
                        } else {
                            0x00
                        }
                    }
                };
                out.push(value);
            }
        }

        out
    }
}

/// Result of loading one glyph
#[derive(Debug, Clone)]
pub struct GlyphSlot {
    pub metrics: GlyphMetrics,
    /// Present when the glyph was rendered and has visible pixels
    pub bitmap: Option<Bitmap>,
}

/// A loaded font face
pub trait RasterFace {
    fn is_scalable(&self) -> bool;

    fn set_char_size(&mut self, points: f32, dpi: u32) -> Result<()>;

    fn metrics(&self) -> FaceMetrics;

    fn has_char(&self, ch: char) -> bool;

    fn load_glyph(&mut self, glyph: FaceGlyph, flags: LoadFlags) -> Result<GlyphSlot>;
}

/// Opens faces from font streams
pub trait FaceLoader {
    fn load_face(&self, stream: &mut dyn FontStream) -> Result<Box<dyn RasterFace>>;
}

/// Loads [`SwashFace`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SwashFaceLoader;

impl FaceLoader for SwashFaceLoader {
    fn load_face(&self, stream: &mut dyn FontStream) -> Result<Box<dyn RasterFace>> {
        let data = read_to_end(stream);
        if data.is_empty() {
            return Err(TextError::InvalidFontData);
        }
        Ok(Box::new(SwashFace::from_data(data, 0)?))
    }
}

/// Face backed by ttf-parser and swash
pub struct SwashFace {
    data: Vec<u8>,
    face_index: u32,
    scale_context: ScaleContext,
    pixel_size: f32,
    y_ppem: u16,
    units_per_em: u16,
    scalable: bool,
}

impl SwashFace {
    pub fn from_data(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| TextError::FontParseError(format!("{:?}", e)))?;

        let units_per_em = face.units_per_em();
        let tables = face.tables();
        let scalable = tables.glyf.is_some() || tables.cff.is_some();

        swash::FontRef::from_index(&data, face_index as usize).ok_or(TextError::InvalidFontData)?;

        Ok(Self {
            data,
            face_index,
            scale_context: ScaleContext::new(),
            pixel_size: DEFAULT_PIXEL_SIZE,
            y_ppem: DEFAULT_PIXEL_SIZE as u16,
            units_per_em,
            scalable,
        })
    }

    fn ttf_face(&self) -> Result<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.face_index)
            .map_err(|e| TextError::FontParseError(format!("{:?}", e)))
    }

    fn scale(&self) -> f32 {
        self.pixel_size / f32::from(self.units_per_em.max(1))
    }

    fn glyph_id(&self, glyph: FaceGlyph) -> Result<u16> {
        match glyph {
            FaceGlyph::NotDefined => Ok(0),
            FaceGlyph::Char(ch) => self
                .ttf_face()?
                .glyph_index(ch)
                .map(|id| id.0)
                .ok_or(TextError::GlyphNotFound(ch)),
        }
    }

    /// Metrics from the outline bounding box, no rendering
    fn outline_metrics(&self, glyph_id: u16) -> Result<GlyphMetrics> {
        let face = self.ttf_face()?;
        let id = ttf_parser::GlyphId(glyph_id);
        let scale = self.scale();
        let advance = face
            .glyph_hor_advance(id)
            .map(|a| (f32::from(a) * scale).round())
            .unwrap_or(0.0);

        let metrics = match face.glyph_bounding_box(id) {
            Some(bbox) => {
                let left = (f32::from(bbox.x_min) * scale).floor();
                let right = (f32::from(bbox.x_max) * scale).ceil();
                let bottom = (f32::from(bbox.y_min) * scale).floor();
                let top = (f32::from(bbox.y_max) * scale).ceil();
                GlyphMetrics {
                    width: right - left,
                    height: top - bottom,
                    bearing_x: left,
                    bearing_y: top,
                    advance,
                }
            }
            None => GlyphMetrics {
                advance,
                ..GlyphMetrics::default()
            },
        };
        Ok(metrics)
    }

    /// Render through swash; placement overrides the outline metrics
    fn rendered_metrics(
        &mut self,
        glyph_id: u16,
        hinting: Hinting,
    ) -> Result<(GlyphMetrics, Option<Bitmap>)> {
        let mut metrics = self.outline_metrics(glyph_id)?;
        let font = swash::FontRef::from_index(&self.data, self.face_index as usize)
            .ok_or(TextError::InvalidFontData)?;

        let mut scaler = self
            .scale_context
            .builder(font)
            .size(self.pixel_size)
            .hint(hinting != Hinting::DisableAll)
            .build();

        let mut render = Render::new(&[Source::Bitmap(StrikeWith::BestFit), Source::Outline]);
        render.format(Format::Alpha);

        let bitmap = match render.render(&mut scaler, glyph_id) {
            Some(image) if image.placement.width > 0 && image.placement.height > 0 => {
                let placement = image.placement;
                metrics.width = placement.width as f32;
                metrics.height = placement.height as f32;
                metrics.bearing_x = placement.left as f32;
                metrics.bearing_y = placement.top as f32;
                Some(Bitmap {
                    width: placement.width,
                    rows: placement.height,
                    pitch: placement.width as usize,
                    mode: PixelMode::Gray,
                    buffer: image.data,
                })
            }
            _ => None,
        };

        Ok((metrics, bitmap))
    }
}

impl RasterFace for SwashFace {
    fn is_scalable(&self) -> bool {
        self.scalable
    }

    fn set_char_size(&mut self, points: f32, dpi: u32) -> Result<()> {
        if points.is_nan() || points <= 0.0 || dpi == 0 {
            return Err(TextError::InvalidCharSize { size: points, dpi });
        }
        self.pixel_size = points * dpi as f32 / 72.0;
        self.y_ppem = self.pixel_size.round().clamp(1.0, f32::from(u16::MAX)) as u16;
        tracing::debug!(
            "Face char size {}pt at {} dpi -> {:.2}px",
            points,
            dpi,
            self.pixel_size
        );
        Ok(())
    }

    fn metrics(&self) -> FaceMetrics {
        let Ok(face) = self.ttf_face() else {
            return FaceMetrics::default();
        };
        let scale = self.scale();

        let os2 = face.tables().os2.map(|os2| Os2Metrics {
            win_ascent: os2.windows_ascender().unsigned_abs(),
            win_descent: os2.windows_descender().unsigned_abs(),
            typo_ascender: os2.typographic_ascender(),
            typo_descender: os2.typographic_descender(),
        });

        FaceMetrics {
            ascender_px: (f32::from(face.ascender()) * scale).ceil() as i32,
            descender_px: (-f32::from(face.descender()) * scale).ceil() as i32,
            y_ppem: self.y_ppem,
            units_per_em: self.units_per_em,
            os2,
        }
    }

    fn has_char(&self, ch: char) -> bool {
        self.ttf_face()
            .map(|face| face.glyph_index(ch).is_some())
            .unwrap_or(false)
    }

    fn load_glyph(&mut self, glyph: FaceGlyph, flags: LoadFlags) -> Result<GlyphSlot> {
        let glyph_id = self.glyph_id(glyph)?;

        if flags.render {
            let (metrics, bitmap) = self.rendered_metrics(glyph_id, flags.hinting)?;
            Ok(GlyphSlot { metrics, bitmap })
        } else {
            Ok(GlyphSlot {
                metrics: self.outline_metrics(glyph_id)?,
                bitmap: None,
            })
        }
    }
}

impl std::fmt::Debug for SwashFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashFace")
            .field("face_index", &self.face_index)
            .field("pixel_size", &self.pixel_size)
            .field("units_per_em", &self.units_per_em)
            .field("scalable", &self.scalable)
            .finish()
    }
}
