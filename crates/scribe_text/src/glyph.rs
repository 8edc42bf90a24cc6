//! Glyph table
//!
//! Real characters and synthetic markers are keyed by different variants of
//! [`GlyphKey`], so a marker can never shadow a character from the text.

use crate::atlas::{PageId, UvRect};
use rustc_hash::{FxHashMap, FxHashSet};

/// Synthetic glyphs created by every font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Selection highlight drawn over text
    Selected,
    /// Selection background for an unfocused widget
    SelectedBack,
    Cursor,
    /// The face's `.notdef` glyph
    NotDefined,
}

impl Marker {
    const fn slot(self) -> usize {
        match self {
            Marker::Selected => 0,
            Marker::SelectedBack => 1,
            Marker::Cursor => 2,
            Marker::NotDefined => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKey {
    Char(char),
    Marker(Marker),
}

impl From<char> for GlyphKey {
    fn from(ch: char) -> Self {
        GlyphKey::Char(ch)
    }
}

impl From<Marker> for GlyphKey {
    fn from(marker: Marker) -> Self {
        GlyphKey::Marker(marker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphKind {
    /// Produced by the rasterizer
    Rasterized,
    /// Solid fill or metrics-only (space, tab, selection, cursor)
    Synthetic,
}

/// Metrics and atlas placement of one glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    pub key: GlyphKey,
    pub kind: GlyphKind,
    /// Atlas page holding the pixels, `None` for glyphs with nothing to draw
    pub page: Option<PageId>,
    pub width: f32,
    pub height: f32,
    /// Advance after the bearing
    pub advance: f32,
    pub bearing_x: f32,
    /// Offset from the line top to the glyph top
    pub bearing_y: f32,
    pub uv: UvRect,
}

impl GlyphInfo {
    /// Metrics-only synthetic glyph
    pub fn synthetic(key: impl Into<GlyphKey>, width: f32, height: f32, advance: f32) -> Self {
        Self {
            key: key.into(),
            kind: GlyphKind::Synthetic,
            page: None,
            width,
            height,
            advance,
            bearing_x: 0.0,
            bearing_y: 0.0,
            uv: UvRect::default(),
        }
    }

    /// Pen movement for this glyph
    pub fn full_advance(&self) -> f32 {
        self.bearing_x + self.advance
    }

    pub fn has_pixels(&self) -> bool {
        self.page.is_some()
    }
}

/// Lazily populated glyph storage for one font
#[derive(Debug, Default)]
pub struct GlyphTable {
    chars: FxHashMap<char, GlyphInfo>,
    markers: [Option<GlyphInfo>; 4],
    failed: FxHashSet<char>,
}

impl GlyphTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact lookup. `None` is a cache miss, not an error.
    pub fn get(&self, key: GlyphKey) -> Option<&GlyphInfo> {
        match key {
            GlyphKey::Char(ch) => self.chars.get(&ch),
            GlyphKey::Marker(marker) => self.markers[marker.slot()].as_ref(),
        }
    }

    pub fn contains(&self, key: GlyphKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace the entry for `info.key`
    pub fn insert(&mut self, info: GlyphInfo) {
        match info.key {
            GlyphKey::Char(ch) => {
                self.failed.remove(&ch);
                self.chars.insert(ch, info);
            }
            GlyphKey::Marker(marker) => self.markers[marker.slot()] = Some(info),
        }
    }

    /// Remember a character the face could not produce
    pub fn mark_failed(&mut self, ch: char) {
        self.failed.insert(ch);
    }

    pub fn has_failed(&self, ch: char) -> bool {
        self.failed.contains(&ch)
    }

    /// Number of entries, markers included
    pub fn len(&self) -> usize {
        self.chars.len() + self.markers.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
