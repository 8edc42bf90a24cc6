//! Text surface
//!
//! The state a text-displaying widget keeps: caption, font, alignment,
//! colours, selection, cursor and scroll offset inside a widget rectangle.
//! The layout is cached and recomputed only after something that affects
//! it changes (caption, font, height, wrap width, alignment, break policy).

use crate::layout::{BreakPolicy, LayoutOptions, TextAlign, TextLayout, TextLayoutEngine};
use crate::registry::{FontId, FontManager};
use crate::renderer::{BatchParams, TextBatcher, TextBatches};
use scribe_core::{Color, Point, Rect, Size};
use std::ops::Range;

/// Horizontal room reserved for the caret
const CURSOR_WIDTH: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct TextSurface {
    caption: String,
    font_name: String,
    font: Option<FontId>,
    font_height: f32,
    align: TextAlign,
    colour: Color,
    alpha: f32,
    shadow: bool,
    shadow_colour: Color,
    selection: Range<usize>,
    cursor: usize,
    cursor_visible: bool,
    invert_select: bool,
    select_background_normal: bool,
    add_cursor_width: bool,
    view_offset: Point,
    word_wrap: bool,
    break_policy: BreakPolicy,
    colour_tags: bool,
    shift_text: bool,
    coord: Rect,
    clip: Option<Rect>,
    layout: Option<TextLayout>,
}

impl TextSurface {
    pub fn new(coord: Rect) -> Self {
        Self {
            caption: String::new(),
            font_name: String::new(),
            font: None,
            font_height: 0.0,
            align: TextAlign::default(),
            colour: Color::WHITE,
            alpha: 1.0,
            shadow: false,
            shadow_colour: Color::BLACK,
            selection: 0..0,
            cursor: 0,
            cursor_visible: false,
            invert_select: true,
            select_background_normal: true,
            add_cursor_width: true,
            view_offset: Point::ZERO,
            word_wrap: false,
            break_policy: BreakPolicy::Whitespace,
            colour_tags: true,
            shift_text: false,
            coord,
            clip: None,
            layout: None,
        }
    }

    /// Drop the cached layout
    pub fn invalidate(&mut self) {
        self.layout = None;
    }

    /// Bind the font on first use; a newly bound font rasterizes the caption
    fn bind_font(&mut self, fonts: &mut FontManager) -> Option<FontId> {
        if self.font.is_none() {
            self.font = fonts.get_by_name(&self.font_name);
            if let Some(id) = self.font {
                fonts.prepare_string(id, &self.caption);
            }
        }
        self.font
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Replace the text, rasterizing any new glyphs right away
    pub fn set_caption(&mut self, fonts: &mut FontManager, text: impl Into<String>) {
        self.caption = text.into();
        match self.font {
            Some(id) => {
                fonts.prepare_string(id, &self.caption);
            }
            None => {
                self.bind_font(fonts);
            }
        }
        self.invalidate();
    }

    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    pub fn font(&self) -> Option<FontId> {
        self.font
    }

    /// Switch fonts. The font height resets to the new font's default.
    pub fn set_font_name(&mut self, fonts: &mut FontManager, name: &str) {
        self.font_name = name.to_string();
        self.font = fonts.get_by_name(name);

        if let Some(id) = self.font {
            let height = fonts.font(id).map_or(0, |font| font.default_height());
            if height != 0 {
                self.font_height = height as f32;
            }
            fonts.prepare_string(id, &self.caption);
        }
        self.invalidate();
    }

    pub fn font_height(&self) -> f32 {
        self.font_height
    }

    pub fn set_font_height(&mut self, height: f32) {
        self.font_height = height;
        self.invalidate();
    }

    pub fn text_align(&self) -> TextAlign {
        self.align
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        if self.align != align {
            self.align = align;
            self.invalidate();
        }
    }

    pub fn set_word_wrap(&mut self, wrap: bool) {
        self.word_wrap = wrap;
        self.invalidate();
    }

    pub fn set_break_policy(&mut self, policy: BreakPolicy) {
        if self.break_policy != policy {
            self.break_policy = policy;
            self.invalidate();
        }
    }

    pub fn set_colour_tags(&mut self, enabled: bool) {
        if self.colour_tags != enabled {
            self.colour_tags = enabled;
            self.invalidate();
        }
    }

    pub fn coord(&self) -> Rect {
        self.coord
    }

    /// Move or resize the widget. Only a width change with word wrap on
    /// needs a new layout.
    pub fn set_coord(&mut self, coord: Rect) {
        if self.word_wrap && coord.width() != self.coord.width() {
            self.invalidate();
        }
        self.coord = coord;
    }

    /// Visible area; defaults to the widget rectangle
    pub fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    pub fn colour(&self) -> Color {
        self.colour
    }

    /// Text colour; alpha comes from [`set_alpha`](Self::set_alpha)
    pub fn set_colour(&mut self, colour: Color) {
        self.colour = colour;
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn set_shadow_colour(&mut self, colour: Color) {
        self.shadow_colour = colour;
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.selection = start.min(end)..start.max(end);
    }

    pub fn set_invert_selected(&mut self, invert: bool) {
        self.invert_select = invert;
    }

    pub fn set_select_background_normal(&mut self, normal: bool) {
        self.select_background_normal = normal;
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor_position(&mut self, index: usize) {
        self.cursor = index;
    }

    pub fn set_visible_cursor(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    /// Reserve caret width when wrapping and measuring
    pub fn set_add_cursor_width(&mut self, add: bool) {
        if self.add_cursor_width != add {
            self.add_cursor_width = add;
            if self.word_wrap {
                self.invalidate();
            }
        }
    }

    pub fn view_offset(&self) -> Point {
        self.view_offset
    }

    pub fn set_view_offset(&mut self, offset: Point) {
        self.view_offset = offset;
    }

    pub fn set_shift_text(&mut self, shift: bool) {
        self.shift_text = shift;
    }

    fn layout_options(&self) -> LayoutOptions {
        let max_width = self.word_wrap.then(|| {
            let reserved = if self.add_cursor_width { CURSOR_WIDTH } else { 0.0 };
            self.coord.width() - reserved
        });
        LayoutOptions {
            line_height: self.font_height,
            align: self.align,
            max_width,
            break_policy: self.break_policy,
            colour_tags: self.colour_tags,
        }
    }

    /// Recompute the layout if anything it depends on changed
    pub fn update(&mut self, fonts: &mut FontManager) {
        if self.layout.is_some() {
            return;
        }
        let Some(font) = self.bind_font(fonts).and_then(|id| fonts.font(id)) else {
            return;
        };
        self.layout = Some(TextLayoutEngine::layout(&self.caption, font, &self.layout_options()));
    }

    /// Cached layout, `None` until [`update`](Self::update) ran with a font
    pub fn layout(&self) -> Option<&TextLayout> {
        self.layout.as_ref()
    }

    /// Target position of the layout origin
    fn text_origin(&self, layout: &TextLayout) -> Point {
        self.coord.origin + layout.aligned_origin(self.coord.size, self.align)
    }

    /// Size of the text, including room for the caret and shadow
    pub fn text_size(&mut self, fonts: &mut FontManager) -> Size {
        self.update(fonts);
        let mut size = self.layout.as_ref().map_or(Size::ZERO, TextLayout::size);

        if self.add_cursor_width {
            size.width += CURSOR_WIDTH;
        }
        if self.shadow {
            if !self.add_cursor_width {
                size.width += 1.0;
            }
            size.height += 1.0;
        }
        size
    }

    /// Caret rectangle for `index` on the target
    pub fn cursor_coord(&mut self, fonts: &mut FontManager, index: usize) -> Rect {
        self.update(fonts);
        let Some(layout) = self.layout.as_ref() else {
            return Rect::ZERO;
        };
        let point = layout.cursor_point(index) + self.text_origin(layout) - self.view_offset;
        Rect::new(point.x, point.y, CURSOR_WIDTH, layout.line_height)
    }

    /// Cursor index under a target position
    pub fn cursor_index(&mut self, fonts: &mut FontManager, point: Point) -> usize {
        self.update(fonts);
        let Some(layout) = self.layout.as_ref() else {
            return 0;
        };
        layout.cursor_index(point - self.text_origin(layout) + self.view_offset)
    }

    /// Quads for the current state, grouped by atlas page
    pub fn build_batches(&mut self, fonts: &mut FontManager) -> TextBatches {
        self.update(fonts);
        let (Some(layout), Some(font)) = (
            self.layout.as_ref(),
            self.font.and_then(|id| fonts.font(id)),
        ) else {
            return TextBatches::default();
        };

        let params = BatchParams {
            origin: self.text_origin(layout),
            clip: self.clip.unwrap_or(self.coord),
            view_offset: self.view_offset,
            selection: self.selection.clone(),
            cursor: self.cursor_visible.then_some(self.cursor),
            colour: self.colour.with_alpha(self.alpha),
            shadow: self.shadow.then(|| self.shadow_colour.with_alpha(self.alpha)),
            invert_select: self.invert_select,
            select_background_normal: self.select_background_normal,
            shift_text: self.shift_text,
        };
        TextBatcher::build(layout, font, &params)
    }
}
