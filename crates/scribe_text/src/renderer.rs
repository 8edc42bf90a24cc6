//! Text renderer
//!
//! Converts a [`TextLayout`] into textured quads grouped by atlas page.
//! Per glyph the selection background is emitted first, then the shadow,
//! then the glyph itself; the cursor comes last. Quads are clipped to the
//! visible rectangle with their UVs cropped in proportion.

use crate::atlas::{PageId, UvRect};
use crate::font::TrueTypeFont;
use crate::glyph::Marker;
use crate::layout::{LineEntry, TextLayout};
use crate::texture::TextureId;
use bytemuck::{Pod, Zeroable};
use scribe_core::{Color, Point, Rect, Size};
use std::ops::Range;

/// Vertex consumed by the text shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Normalized device coordinates
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// One textured rectangle in target pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub rect: Rect,
    pub uv: UvRect,
    pub color: Color,
}

impl GlyphQuad {
    /// Two triangles in NDC for a target of `target` pixels
    pub fn vertices(&self, target: Size) -> [TextVertex; 6] {
        let to_x = |x: f32| x / target.width * 2.0 - 1.0;
        let to_y = |y: f32| 1.0 - y / target.height * 2.0;

        let (left, right) = (to_x(self.rect.left()), to_x(self.rect.right()));
        let (top, bottom) = (to_y(self.rect.top()), to_y(self.rect.bottom()));
        let color = self.color.to_array();
        let vertex = |x: f32, y: f32, u: f32, v: f32| TextVertex {
            position: [x, y],
            uv: [u, v],
            color,
        };

        let uv = self.uv;
        let left_top = vertex(left, top, uv.left, uv.top);
        let right_top = vertex(right, top, uv.right, uv.top);
        let left_bottom = vertex(left, bottom, uv.left, uv.bottom);
        let right_bottom = vertex(right, bottom, uv.right, uv.bottom);

        [left_top, right_top, left_bottom, right_top, right_bottom, left_bottom]
    }
}

/// Quads sampling one atlas page
#[derive(Debug, Clone, PartialEq)]
pub struct PageBatch {
    pub page: PageId,
    /// `None` until the page has been uploaded
    pub texture: Option<TextureId>,
    pub quads: Vec<GlyphQuad>,
}

impl PageBatch {
    pub fn vertices(&self, target: Size) -> Vec<TextVertex> {
        self.quads.iter().flat_map(|quad| quad.vertices(target)).collect()
    }

    /// Vertex data as bytes, ready for a vertex buffer
    pub fn vertex_bytes(&self, target: Size) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices(target)).to_vec()
    }
}

/// Render output of one text block, ordered by page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBatches {
    batches: Vec<PageBatch>,
}

impl TextBatches {
    pub fn iter(&self) -> impl Iterator<Item = &PageBatch> {
        self.batches.iter()
    }

    pub fn page(&self, page: PageId) -> Option<&PageBatch> {
        self.batches.iter().find(|batch| batch.page == page)
    }

    pub fn for_texture(&self, texture: TextureId) -> Option<&PageBatch> {
        self.batches
            .iter()
            .find(|batch| batch.texture == Some(texture))
    }

    pub fn quad_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.quads.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(|batch| batch.quads.is_empty())
    }

    fn push(&mut self, font: &TrueTypeFont, page: PageId, quad: GlyphQuad) {
        let position = match self.batches.binary_search_by_key(&page, |batch| batch.page) {
            Ok(position) => position,
            Err(position) => {
                self.batches.insert(
                    position,
                    PageBatch {
                        page,
                        texture: font.page_texture(page),
                        quads: Vec::new(),
                    },
                );
                position
            }
        };
        self.batches[position].quads.push(quad);
    }
}

/// Clip `rect` to `clip`, cropping `uv` by the same fraction on each side.
///
/// Returns `None` when nothing of the quad remains visible.
pub fn clip_quad(rect: Rect, uv: UvRect, clip: Rect) -> Option<(Rect, UvRect)> {
    let (mut left, mut top, mut right, mut bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let mut uv = uv;

    let left_clip = clip.left() - left;
    if left_clip > 0.0 {
        if clip.left() >= right {
            return None;
        }
        uv.left += uv.width() * left_clip / (right - left);
        left += left_clip;
    }

    let right_clip = right - clip.right();
    if right_clip > 0.0 {
        if left >= clip.right() {
            return None;
        }
        uv.right -= uv.width() * right_clip / (right - left);
        right -= right_clip;
    }

    let top_clip = clip.top() - top;
    if top_clip > 0.0 {
        if clip.top() >= bottom {
            return None;
        }
        uv.top += uv.height() * top_clip / (bottom - top);
        top += top_clip;
    }

    let bottom_clip = bottom - clip.bottom();
    if bottom_clip > 0.0 {
        if top >= clip.bottom() {
            return None;
        }
        uv.bottom -= uv.height() * bottom_clip / (bottom - top);
        bottom -= bottom_clip;
    }

    Some((Rect::from_edges(left, top, right, bottom), uv))
}

/// Render state of a text block
#[derive(Debug, Clone, PartialEq)]
pub struct BatchParams {
    /// Where the layout origin lands on the target
    pub origin: Point,
    /// Visible area on the target
    pub clip: Rect,
    /// Scroll offset into the text
    pub view_offset: Point,
    /// Selected cursor positions
    pub selection: Range<usize>,
    /// Cursor position, `None` when hidden
    pub cursor: Option<usize>,
    pub colour: Color,
    pub shadow: Option<Color>,
    /// Draw selected glyphs in the inverse colour
    pub invert_select: bool,
    /// Selection background from the opaque marker rather than the
    /// translucent one
    pub select_background_normal: bool,
    /// Move everything one pixel down (pressed-button look)
    pub shift_text: bool,
}

impl BatchParams {
    pub fn new(origin: Point, clip: Rect) -> Self {
        Self {
            origin,
            clip,
            view_offset: Point::ZERO,
            selection: 0..0,
            cursor: None,
            colour: Color::WHITE,
            shadow: None,
            invert_select: true,
            select_background_normal: true,
            shift_text: false,
        }
    }
}

fn selected_colour(colour: Color, invert_select: bool) -> Color {
    if invert_select {
        colour.inverted()
    } else {
        colour.whitened()
    }
}

/// Builds [`TextBatches`] from a layout
pub struct TextBatcher<'a> {
    font: &'a TrueTypeFont,
    params: &'a BatchParams,
    batches: TextBatches,
}

impl<'a> TextBatcher<'a> {
    /// Emit the quads for `layout`, which must have been laid out with
    /// `font`. A font that failed to load produces nothing.
    pub fn build(layout: &TextLayout, font: &'a TrueTypeFont, params: &'a BatchParams) -> TextBatches {
        if !font.is_loaded() {
            return TextBatches::default();
        }

        let mut batcher = TextBatcher {
            font,
            params,
            batches: TextBatches::default(),
        };
        batcher.emit_lines(layout);
        batcher.emit_cursor(layout);
        batcher.batches
    }

    fn emit_lines(&mut self, layout: &TextLayout) {
        let params = self.params;
        let line_height = layout.line_height;

        let mut colour = params.colour;
        let mut inverse = colour.inverted();
        let mut selected = selected_colour(colour, params.invert_select);

        let marker = if params.select_background_normal {
            Marker::Selected
        } else {
            Marker::SelectedBack
        };
        let select_glyph = self.font.glyph_info(marker).copied();

        let mut index = 0;
        for line in &layout.lines {
            let top = line.top - params.view_offset.y + params.origin.y;
            let mut left = line.offset - params.view_offset.x + params.origin.x;

            for entry in &line.entries {
                let glyph = match entry {
                    LineEntry::Colour(tint) => {
                        colour = tint.with_alpha(colour.a);
                        inverse = colour.inverted();
                        selected = selected_colour(colour, params.invert_select);
                        continue;
                    }
                    LineEntry::Glyph(glyph) => glyph,
                };

                let select = params.selection.contains(&index);

                if select {
                    if let Some(background) = select_glyph {
                        let rect = Rect::new(left, top, glyph.advance, line_height);
                        self.emit(background.page, rect, background.uv, selected);
                    }
                }

                if glyph.page.is_some() {
                    if let Some(shadow) = params.shadow {
                        let rect = Rect::new(
                            left + glyph.bearing_x + 1.0,
                            top + glyph.bearing_y + 1.0,
                            glyph.width,
                            glyph.height,
                        );
                        self.emit(glyph.page, rect, glyph.uv, shadow);
                    }

                    let rect = Rect::new(left + glyph.bearing_x, top + glyph.bearing_y, glyph.width, glyph.height);
                    let tint = if select && params.invert_select { inverse } else { colour };
                    self.emit(glyph.page, rect, glyph.uv, tint);
                }

                left += glyph.advance;
                index += 1;
            }

            if !line.auto_wrap {
                index += 1;
            }
        }
    }

    fn emit_cursor(&mut self, layout: &TextLayout) {
        let params = self.params;
        let Some(position) = params.cursor else {
            return;
        };
        let Some(cursor) = self.font.glyph_info(Marker::Cursor).copied() else {
            return;
        };

        let point = layout.cursor_point(position) - params.view_offset + params.origin;
        let rect = Rect::new(point.x, point.y, cursor.width, layout.line_height);
        self.emit(cursor.page, rect, cursor.uv, params.colour.whitened());
    }

    fn emit(&mut self, page: Option<PageId>, rect: Rect, uv: UvRect, color: Color) {
        let Some(page) = page else {
            return;
        };
        let rect = if self.params.shift_text { rect.offset(0.0, 1.0) } else { rect };
        let Some((rect, uv)) = clip_quad(rect, uv, self.params.clip) else {
            return;
        };
        self.batches.push(self.font, page, GlyphQuad { rect, uv, color });
    }
}
