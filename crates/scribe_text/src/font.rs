//! TrueType font resource
//!
//! A [`TrueTypeFont`] owns a face, a glyph table and the atlas pages the
//! glyphs live in. Loading never returns an error: a font whose face cannot
//! be opened or sized logs the failure and stays unusable, answering `None`
//! to every glyph and texture query, so callers can keep rendering whatever
//! else they have.

use crate::atlas::{GlyphAtlas, PageId};
use crate::glyph::{GlyphInfo, GlyphKey, GlyphKind, GlyphTable, Marker};
use crate::pixel::{PixelFormat, PixelWriter};
use crate::rasterizer::{Bitmap, FaceGlyph, FaceLoader, GlyphMetrics, LoadFlags, RasterFace};
use crate::stream::FontDataSource;
use crate::texture::{TextureBackend, TextureId, TextureUsage};
use crate::{Result, TextError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;

/// Tab width in spaces when none is configured
const DEFAULT_TAB_WIDTH: f32 = 8.0;
/// Largest atlas page edge accepted from a config
pub const MAX_TEXTURE_SIZE: u32 = 16384;
const SELECTED_WIDTH: u32 = 1;
const CURSOR_WIDTH: u32 = 2;

const MASK_WHITE: u8 = 0xFF;
const MASK_BLACK: u8 = 0x00;
const MASK_SELECTED: u8 = 0x88;
const MASK_SELECTED_BACK: u8 = 0x60;
const MASK_CURSOR: u8 = 0xFF;

/// Hinting mode requested from the rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Hinting {
    #[default]
    UseNative,
    ForceAuto,
    DisableAuto,
    DisableAll,
}

impl Hinting {
    /// Parse a hinting name; unknown names mean [`Hinting::UseNative`]
    pub fn parse(value: &str) -> Self {
        match value {
            "force_auto" => Hinting::ForceAuto,
            "disable_auto" => Hinting::DisableAuto,
            "disable_all" => Hinting::DisableAll,
            _ => Hinting::UseNative,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Hinting::UseNative => "use_native",
            Hinting::ForceAuto => "force_auto",
            Hinting::DisableAuto => "disable_auto",
            Hinting::DisableAll => "disable_all",
        }
    }
}

impl FromStr for Hinting {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Hinting::parse(s))
    }
}

impl From<String> for Hinting {
    fn from(value: String) -> Self {
        Hinting::parse(&value)
    }
}

impl From<Hinting> for String {
    fn from(value: Hinting) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Hinting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Font definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Name passed to the font data source
    pub source: String,
    /// Size in points
    pub size: f32,
    /// Dots per inch
    pub resolution: u32,
    pub antialias: bool,
    pub hinting: Hinting,
    /// Tab stop width in pixels, defaults to eight spaces
    pub tab_width: Option<f32>,
    /// Horizontal and vertical spacing between packed glyphs
    pub distance: u32,
    /// Code point drawn for missing characters
    pub substitute_code: Option<u32>,
    /// Vertical adjustment of every glyph, in pixels
    pub offset_height: i32,
    /// Deprecated: overrides the measured space width
    pub space_width: Option<f32>,
    /// Deprecated: ignored
    pub cursor_width: Option<f32>,
    /// Atlas page edge in pixels
    pub texture_size: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            size: 0.0,
            resolution: 96,
            antialias: false,
            hinting: Hinting::UseNative,
            tab_width: None,
            distance: 1,
            substitute_code: None,
            offset_height: 0,
            space_width: None,
            cursor_width: None,
            texture_size: 256,
        }
    }
}

/// Font-wide metrics resolved at load time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
    /// Line height, `ascent + descent`
    pub default_height: i32,
    pub space_width: f32,
    pub tab_width: f32,
    /// Gap between packed glyphs
    pub spacing: u32,
    pub format: PixelFormat,
}

/// Outcome of [`TrueTypeFont::prepare_string`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareReport {
    /// Glyphs rasterized by this call
    pub rasterized: usize,
    /// Pages waiting for upload after this call
    pub dirty_pages: SmallVec<[PageId; 4]>,
}

impl PrepareReport {
    pub fn needs_upload(&self) -> bool {
        !self.dirty_pages.is_empty()
    }
}

/// State of a successfully loaded font
struct LoadedFont {
    face: Box<dyn RasterFace>,
    atlas: GlyphAtlas,
    glyphs: GlyphTable,
    metrics: FontMetrics,
    flags: LoadFlags,
    offset_height: f32,
    substitute: GlyphKey,
}

impl LoadedFont {
    fn initialise(
        name: &str,
        config: &FontConfig,
        source: &mut dyn FontDataSource,
        loader: &dyn FaceLoader,
        backend: &dyn TextureBackend,
    ) -> Result<Self> {
        if config.texture_size == 0 || config.texture_size > MAX_TEXTURE_SIZE {
            return Err(TextError::FontLoadError(format!(
                "texture size {} outside 1..={}",
                config.texture_size, MAX_TEXTURE_SIZE
            )));
        }

        let format = if backend.is_format_supported(
            PixelFormat::LuminanceAlpha8,
            TextureUsage::STATIC | TextureUsage::WRITE,
        ) {
            PixelFormat::LuminanceAlpha8
        } else {
            PixelFormat::Rgba8
        };
        let writer = PixelWriter::select(format, config.antialias);

        let mut face = {
            let mut stream = source.open(&config.source)?;
            loader.load_face(stream.as_mut())?
        };

        if face.is_scalable() {
            face.set_char_size(config.size, config.resolution)?;
        }

        let (ascent, descent) = face.metrics().line_extents();
        let default_height = ascent.saturating_add(descent);
        if default_height <= 0 {
            return Err(TextError::FontLoadError(format!(
                "face reports no vertical extent ({} + {})",
                ascent, descent
            )));
        }

        let flags = LoadFlags::for_hinting(config.hinting);

        if config.cursor_width.is_some() {
            tracing::warn!("Font '{}': 'cursor_width' is deprecated; value ignored", name);
        }
        let space_width = match config.space_width {
            Some(width) => {
                tracing::warn!(
                    "Font '{}': 'space_width' is deprecated; remove it to use automatic calculation",
                    name
                );
                width
            }
            None => face
                .load_glyph(FaceGlyph::Char(' '), flags)
                .map(|slot| slot.metrics.advance)
                .ok()
                .filter(|advance| *advance > 0.0)
                .unwrap_or(default_height as f32 / 4.0),
        };
        let tab_width = config
            .tab_width
            .filter(|width| *width > 0.0)
            .unwrap_or(DEFAULT_TAB_WIDTH * space_width);

        let metrics = FontMetrics {
            ascent,
            descent,
            default_height,
            space_width,
            tab_width,
            spacing: config.distance,
            format,
        };

        let mut font = LoadedFont {
            face,
            atlas: GlyphAtlas::new(config.texture_size, default_height as u32, config.distance, writer),
            glyphs: GlyphTable::new(),
            metrics,
            flags,
            offset_height: config.offset_height as f32,
            substitute: GlyphKey::Marker(Marker::NotDefined),
        };

        font.create_specials()?;
        font.create_substitute(name, config.substitute_code)?;
        Ok(font)
    }

    fn create_specials(&mut self) -> Result<()> {
        let height = self.metrics.default_height as f32;
        let space = self.metrics.space_width;

        self.glyphs.insert(GlyphInfo::synthetic(' ', space, height, space));
        self.glyphs
            .insert(GlyphInfo::synthetic('\t', 0.0, 0.0, self.metrics.tab_width));

        self.create_marker(Marker::Selected, SELECTED_WIDTH, MASK_SELECTED, true)?;
        self.create_marker(Marker::SelectedBack, SELECTED_WIDTH, MASK_SELECTED_BACK, true)?;
        self.create_marker(Marker::Cursor, CURSOR_WIDTH, MASK_CURSOR, false)?;
        Ok(())
    }

    /// Solid-filled marker. Selection markers are drawn stretched, so their
    /// width collapses to zero after filling to avoid seams.
    fn create_marker(&mut self, marker: Marker, width: u32, alpha: u8, collapse: bool) -> Result<()> {
        let height = self.metrics.default_height as u32;
        let mut info = GlyphInfo::synthetic(marker, width as f32, height as f32, 0.0);

        if let Some((slot, uv)) = self
            .atlas
            .insert_fill(width, height, MASK_WHITE, MASK_BLACK, alpha)?
        {
            info.page = Some(slot.page);
            info.uv = uv;
        }
        if collapse {
            info.width = 0.0;
            info.uv.right = info.uv.left;
        }

        self.glyphs.insert(info);
        Ok(())
    }

    fn create_substitute(&mut self, name: &str, code: Option<u32>) -> Result<()> {
        if let Some(code) = code {
            match char::from_u32(code).filter(|ch| self.face.has_char(*ch)) {
                Some(ch) => {
                    let key = GlyphKey::Char(ch);
                    if self.glyphs.contains(key) {
                        self.substitute = key;
                    } else {
                        match self.rasterize(key, FaceGlyph::Char(ch)) {
                            Ok(info) => {
                                self.glyphs.insert(info);
                                self.substitute = key;
                            }
                            Err(e) => tracing::warn!(
                                "Font '{}': substitute U+{:04X} failed to load: {}",
                                name,
                                code,
                                e
                            ),
                        }
                    }
                }
                None => tracing::warn!(
                    "Font '{}': substitute U+{:04X} is not in the face, using the not-defined glyph",
                    name,
                    code
                ),
            }
        }

        let not_defined = GlyphKey::Marker(Marker::NotDefined);
        if self.substitute == not_defined {
            let info = match self.rasterize(not_defined, FaceGlyph::NotDefined) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!("Font '{}': cannot load the not-defined glyph: {}", name, e);
                    let space = self.metrics.space_width;
                    GlyphInfo::synthetic(Marker::NotDefined, 0.0, 0.0, space)
                }
            };
            self.glyphs.insert(info);
        }
        Ok(())
    }

    /// Load metrics, render and pack one face glyph
    fn rasterize(&mut self, key: GlyphKey, glyph: FaceGlyph) -> Result<GlyphInfo> {
        let slot = self.face.load_glyph(glyph, self.flags)?;
        let bitmap = match slot.bitmap {
            Some(bitmap) => Some(bitmap),
            None => self.face.load_glyph(glyph, self.flags.rendered())?.bitmap,
        };

        let mut info = glyph_info(key, &slot.metrics, bitmap.as_ref(), self.metrics.ascent, self.offset_height);

        if let Some(bitmap) = bitmap {
            let coverage = bitmap.to_gray();
            let packed = self.atlas.insert_bitmap(
                info.width.ceil() as u32,
                info.height.ceil() as u32,
                &coverage,
                bitmap.width,
                bitmap.rows,
            )?;
            if let Some((slot, uv)) = packed {
                info.page = Some(slot.page);
                info.uv = uv;
            }
        }

        Ok(info)
    }
}

/// Build table metrics from face metrics
fn glyph_info(
    key: GlyphKey,
    metrics: &GlyphMetrics,
    bitmap: Option<&Bitmap>,
    ascent: i32,
    offset_height: f32,
) -> GlyphInfo {
    let (bitmap_width, bitmap_rows) = bitmap.map_or((0.0, 0.0), |b| (b.width as f32, b.rows as f32));

    GlyphInfo {
        key,
        kind: GlyphKind::Rasterized,
        page: None,
        width: bitmap_width.max(metrics.width),
        height: bitmap_rows.max(metrics.height),
        advance: (metrics.advance - metrics.bearing_x).max(0.0),
        bearing_x: metrics.bearing_x,
        bearing_y: (ascent as f32 - metrics.bearing_y - offset_height).floor(),
        uv: Default::default(),
    }
}

/// A TrueType font resource
pub struct TrueTypeFont {
    name: String,
    config: FontConfig,
    state: Option<LoadedFont>,
}

impl TrueTypeFont {
    /// Load a font. Failure is logged and leaves the font unusable.
    pub fn load(
        name: impl Into<String>,
        config: FontConfig,
        source: &mut dyn FontDataSource,
        loader: &dyn FaceLoader,
        backend: &dyn TextureBackend,
    ) -> Self {
        let name = name.into();
        let state = match LoadedFont::initialise(&name, &config, source, loader, backend) {
            Ok(font) => {
                tracing::info!(
                    "Loaded font '{}' from '{}': {}pt @ {}dpi, height {}px, {:?}",
                    name,
                    config.source,
                    config.size,
                    config.resolution,
                    font.metrics.default_height,
                    font.metrics.format
                );
                Some(font)
            }
            Err(e) => {
                tracing::error!("Could not load the font '{}': {}", name, e);
                None
            }
        };

        Self {
            name,
            config,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn metrics(&self) -> Option<&FontMetrics> {
        self.state.as_ref().map(|font| &font.metrics)
    }

    /// Line height in pixels, zero for a font that failed to load
    pub fn default_height(&self) -> i32 {
        self.metrics().map_or(0, |m| m.default_height)
    }

    /// Key drawn in place of missing glyphs
    pub fn substitute(&self) -> Option<GlyphKey> {
        self.state.as_ref().map(|font| font.substitute)
    }

    /// Glyph for `key`, or the substitute when it is absent.
    ///
    /// `None` only when the font failed to load.
    pub fn glyph_info(&self, key: impl Into<GlyphKey>) -> Option<&GlyphInfo> {
        let font = self.state.as_ref()?;
        font.glyphs
            .get(key.into())
            .or_else(|| font.glyphs.get(font.substitute))
    }

    /// Exact lookup without substitution
    pub fn lookup(&self, ch: char) -> Option<&GlyphInfo> {
        self.state.as_ref()?.glyphs.get(GlyphKey::Char(ch))
    }

    pub fn glyph_count(&self) -> usize {
        self.state.as_ref().map_or(0, |font| font.glyphs.len())
    }

    /// Rasterize and pack every character of `text` not yet in the table.
    ///
    /// Line breaks are skipped. Characters that failed once are not retried,
    /// so a second call with the same text does nothing.
    pub fn prepare_string(&mut self, text: &str) -> PrepareReport {
        let mut report = PrepareReport::default();
        let name = &self.name;
        let Some(font) = self.state.as_mut() else {
            return report;
        };

        for ch in text.chars() {
            if matches!(ch, '\r' | '\n' | '\u{85}') {
                continue;
            }
            let key = GlyphKey::Char(ch);
            if font.glyphs.contains(key) || font.glyphs.has_failed(ch) {
                continue;
            }

            match font.rasterize(key, FaceGlyph::Char(ch)) {
                Ok(info) => {
                    font.glyphs.insert(info);
                    report.rasterized += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Cannot load glyph for character {:?} in font '{}': {}",
                        ch,
                        name,
                        e
                    );
                    font.glyphs.mark_failed(ch);
                }
            }
        }

        if report.rasterized > 0 {
            tracing::debug!("Font '{}': rasterized {} glyph(s)", name, report.rasterized);
        }
        report.dirty_pages = font.atlas.dirty_pages();
        report
    }

    /// Pages waiting for upload
    pub fn dirty_pages(&self) -> SmallVec<[PageId; 4]> {
        self.state
            .as_ref()
            .map(|font| font.atlas.dirty_pages())
            .unwrap_or_default()
    }

    /// Upload dirty atlas pages, returning how many were uploaded
    pub fn prepare_textures(&mut self, backend: &mut dyn TextureBackend) -> Result<usize> {
        match self.state.as_mut() {
            Some(font) => font.atlas.upload_dirty(backend),
            None => Ok(0),
        }
    }

    /// Texture of the first atlas page
    pub fn texture_font(&self) -> Option<TextureId> {
        self.state.as_ref()?.atlas.pages().first()?.texture()
    }

    pub fn page_texture(&self, page: PageId) -> Option<TextureId> {
        self.state.as_ref()?.atlas.page(page)?.texture()
    }

    pub fn atlas(&self) -> Option<&GlyphAtlas> {
        self.state.as_ref().map(|font| &font.atlas)
    }

    /// Destroy the page textures. The font is unusable afterwards.
    pub fn release(&mut self, backend: &mut dyn TextureBackend) {
        if let Some(mut font) = self.state.take() {
            font.atlas.release(backend);
            tracing::debug!("Released font '{}'", self.name);
        }
    }
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("TrueTypeFont");
        s.field("name", &self.name).field("source", &self.config.source);
        match &self.state {
            Some(font) => s
                .field("metrics", &font.metrics)
                .field("glyphs", &font.glyphs.len())
                .field("atlas", &font.atlas),
            None => s.field("loaded", &false),
        };
        s.finish()
    }
}
