//! Scripted rasterizer for tests
//!
//! The mock face has ascent 16 and descent 4 (line height 20). Every
//! character is a 5x10 glyph with bearing (1, 12) and pen advance 7, except
//! the space (advance 6) and whatever a script overrides. Rendering produces a
//! fully covered bitmap of the glyph size.

use crate::font::{FontConfig, TrueTypeFont};
use crate::rasterizer::{
    Bitmap, FaceGlyph, FaceLoader, FaceMetrics, GlyphMetrics, GlyphSlot, LoadFlags, PixelMode,
    RasterFace,
};
use crate::stream::{read_to_end, FontStream, MemorySource};
use crate::texture::{HeadlessBackend, TextureBackend};
use crate::{Result, TextError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) const MOCK_GLYPH: GlyphMetrics = GlyphMetrics {
    width: 5.0,
    height: 10.0,
    bearing_x: 1.0,
    bearing_y: 12.0,
    advance: 7.0,
};

const MOCK_SPACE: GlyphMetrics = GlyphMetrics {
    width: 0.0,
    height: 0.0,
    bearing_x: 0.0,
    bearing_y: 0.0,
    advance: 6.0,
};

const MOCK_NOT_DEFINED: GlyphMetrics = GlyphMetrics {
    width: 4.0,
    height: 10.0,
    bearing_x: 0.0,
    bearing_y: 12.0,
    advance: 5.0,
};

#[derive(Debug, Clone)]
pub(crate) struct MockFaceScript {
    pub scalable: bool,
    pub ascent: i32,
    pub descent: i32,
    pub overrides: Vec<(char, GlyphMetrics)>,
    /// Characters absent from the cmap
    pub missing: Vec<char>,
    /// Characters in the cmap that fail to load
    pub broken: Vec<char>,
    pub fail_char_size: bool,
    /// Every `load_glyph` request, shared between clones
    pub load_log: Rc<RefCell<Vec<(FaceGlyph, LoadFlags)>>>,
}

impl Default for MockFaceScript {
    fn default() -> Self {
        Self {
            scalable: true,
            ascent: 16,
            descent: 4,
            overrides: Vec::new(),
            missing: vec!['Ω'],
            broken: Vec::new(),
            fail_char_size: false,
            load_log: Rc::default(),
        }
    }
}

impl MockFaceScript {
    pub fn with_glyph(mut self, ch: char, metrics: GlyphMetrics) -> Self {
        self.overrides.push((ch, metrics));
        self
    }
}

pub(crate) struct MockFace {
    script: MockFaceScript,
    loads: Rc<Cell<usize>>,
}

impl MockFace {
    fn glyph_metrics(&self, glyph: FaceGlyph) -> Result<GlyphMetrics> {
        let ch = match glyph {
            FaceGlyph::NotDefined => return Ok(MOCK_NOT_DEFINED),
            FaceGlyph::Char(ch) => ch,
        };
        if !self.has_char(ch) {
            return Err(TextError::GlyphNotFound(ch));
        }
        if self.script.broken.contains(&ch) {
            return Err(TextError::RasterizeError(format!("scripted failure for {:?}", ch)));
        }
        if let Some((_, metrics)) = self.script.overrides.iter().rev().find(|(c, _)| *c == ch) {
            return Ok(*metrics);
        }
        Ok(if ch == ' ' { MOCK_SPACE } else { MOCK_GLYPH })
    }
}

impl RasterFace for MockFace {
    fn is_scalable(&self) -> bool {
        self.script.scalable
    }

    fn set_char_size(&mut self, points: f32, dpi: u32) -> Result<()> {
        if self.script.fail_char_size {
            return Err(TextError::InvalidCharSize { size: points, dpi });
        }
        Ok(())
    }

    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascender_px: self.script.ascent,
            descender_px: self.script.descent,
            y_ppem: 16,
            units_per_em: 1000,
            os2: None,
        }
    }

    fn has_char(&self, ch: char) -> bool {
        !self.script.missing.contains(&ch)
    }

    fn load_glyph(&mut self, glyph: FaceGlyph, flags: LoadFlags) -> Result<GlyphSlot> {
        self.loads.set(self.loads.get() + 1);
        self.script.load_log.borrow_mut().push((glyph, flags));
        let metrics = self.glyph_metrics(glyph)?;

        let bitmap = (flags.render && metrics.width > 0.0 && metrics.height > 0.0).then(|| {
            let width = metrics.width as u32;
            let rows = metrics.height as u32;
            Bitmap {
                width,
                rows,
                pitch: width as usize,
                mode: PixelMode::Gray,
                buffer: vec![0xFF; (width * rows) as usize],
            }
        });

        Ok(GlyphSlot { metrics, bitmap })
    }
}

/// Loader producing [`MockFace`]s; data `b"bad"` fails to parse
pub(crate) struct MockLoader {
    pub script: MockFaceScript,
    pub loads: Rc<Cell<usize>>,
}

impl FaceLoader for MockLoader {
    fn load_face(&self, stream: &mut dyn FontStream) -> Result<Box<dyn RasterFace>> {
        let data = read_to_end(stream);
        if data == b"bad" {
            return Err(TextError::FontParseError("scripted parse failure".into()));
        }
        Ok(Box::new(MockFace {
            script: self.script.clone(),
            loads: Rc::clone(&self.loads),
        }))
    }
}

pub(crate) fn mock_source() -> MemorySource {
    MemorySource::new()
        .with("mock.ttf", b"mock".to_vec())
        .with("bad.ttf", b"bad".to_vec())
}

pub(crate) fn mock_config() -> FontConfig {
    FontConfig {
        source: "mock.ttf".into(),
        size: 12.0,
        antialias: true,
        ..FontConfig::default()
    }
}

pub(crate) fn mock_font_on(
    backend: &dyn TextureBackend,
    script: MockFaceScript,
    config: FontConfig,
) -> (TrueTypeFont, Rc<Cell<usize>>) {
    let loads = Rc::new(Cell::new(0));
    let loader = MockLoader {
        script,
        loads: Rc::clone(&loads),
    };
    let mut source = mock_source();
    let font = TrueTypeFont::load("mock", config, &mut source, &loader, backend);
    (font, loads)
}

pub(crate) fn mock_font_with(script: MockFaceScript, config: FontConfig) -> (TrueTypeFont, Rc<Cell<usize>>) {
    mock_font_on(&HeadlessBackend::new(), script, config)
}

/// Default mock font with its glyph-load counter
pub(crate) fn mock_font() -> (TrueTypeFont, Rc<Cell<usize>>) {
    mock_font_with(MockFaceScript::default(), mock_config())
}
