//! Glyph atlas and text rendering pipeline for Scribe
//!
//! This crate provides:
//! - Font data sources (seekable byte streams over files or memory)
//! - Glyph rasterization behind a face trait (swash + ttf-parser backend)
//! - Paged glyph atlases with shelf packing and deferred texture upload
//! - TrueType font resources with lazily populated glyph tables
//! - Text layout engine (explicit breaks, tab stops, word wrap, colour tags)
//! - Render batch building per atlas page with clip-rect trimming
//! - A text surface holding the state of one text-displaying widget

pub mod atlas;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod pixel;
pub mod rasterizer;
pub mod registry;
pub mod renderer;
pub mod stream;
pub mod surface;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

pub use atlas::{AtlasPage, AtlasSlot, GlyphAtlas, PageId, UvRect};
pub use font::{FontConfig, FontMetrics, Hinting, PrepareReport, TrueTypeFont};
pub use glyph::{GlyphInfo, GlyphKey, GlyphKind, GlyphTable, Marker};
pub use layout::{
    BreakPolicy, HorizontalAlign, LayoutOptions, LineEntry, PlacedGlyph, TextAlign, TextLayout,
    TextLayoutEngine, TextLine, VerticalAlign,
};
pub use pixel::{PixelFormat, PixelWriter};
pub use rasterizer::{
    Bitmap, FaceGlyph, FaceLoader, FaceMetrics, GlyphMetrics, GlyphSlot, LoadFlags, Os2Metrics,
    PixelMode, RasterFace, SwashFace, SwashFaceLoader,
};
pub use registry::{FontId, FontManager};
pub use renderer::{clip_quad, BatchParams, GlyphQuad, PageBatch, TextBatcher, TextBatches, TextVertex};
pub use stream::{read_to_end, FileSystemSource, FontDataSource, FontStream, MemorySource};
pub use surface::TextSurface;
pub use texture::{HeadlessBackend, TextureBackend, TextureId, TextureUsage};

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Font source not found: {0}")]
    SourceNotFound(String),

    #[error("Failed to load font: {0}")]
    FontLoadError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid character size {size}pt at {dpi} dpi")]
    InvalidCharSize { size: f32, dpi: u32 },

    #[error("Glyph not found for codepoint: {0:?}")]
    GlyphNotFound(char),

    #[error("Failed to rasterize glyph: {0}")]
    RasterizeError(String),

    #[error("Glyph {width}x{height} does not fit a {page_size}px atlas page")]
    GlyphTooLarge {
        width: u32,
        height: u32,
        page_size: u32,
    },

    #[error("Texture backend error: {0}")]
    TextureError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextError>;
