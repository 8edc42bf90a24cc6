//! Text layout engine
//!
//! Turns a string into lines of positioned glyph references in one
//! left-to-right pass. Layout only reads glyphs that are already in the
//! font's table; call [`TrueTypeFont::prepare_string`] first so nothing is
//! rasterized here, and so laying out the same text twice gives the same
//! result.
//!
//! Features:
//! - CR, LF, CR LF and NEL end a line and count as one cursor position
//! - `#RRGGBB` switches the colour of the following glyphs, `##` is a `#`
//! - Tabs advance to the next multiple of the font's tab width
//! - Word wrap at the last break opportunity, with trailing whitespace
//!   hanging past the wrap width

use crate::atlas::{PageId, UvRect};
use crate::font::TrueTypeFont;
use crate::glyph::GlyphInfo;
use scribe_core::{Color, Point, Size};
use std::str::FromStr;
use unicode_linebreak::BreakOpportunity;

/// Where a too-long line may be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakPolicy {
    /// After spaces and tabs only
    #[default]
    Whitespace,
    /// UAX #14 break opportunities (after hyphens, between ideographs, ...)
    UnicodeLineBreak,
}

impl FromStr for BreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitespace" => Ok(BreakPolicy::Whitespace),
            "unicode" | "uax14" => Ok(BreakPolicy::UnicodeLineBreak),
            other => Err(format!("unknown break policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Text alignment inside its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextAlign {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

impl TextAlign {
    pub const fn new(horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub const CENTER: TextAlign = TextAlign::new(HorizontalAlign::Center, VerticalAlign::Center);
}

fn align_offset(free: f32, horizontal: HorizontalAlign) -> f32 {
    match horizontal {
        HorizontalAlign::Left => 0.0,
        HorizontalAlign::Center => (free / 2.0).floor(),
        HorizontalAlign::Right => free,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Distance between line tops; zero or less uses the font height
    pub line_height: f32,
    pub align: TextAlign,
    /// Wrap width, `None` disables word wrap
    pub max_width: Option<f32>,
    pub break_policy: BreakPolicy,
    /// Interpret `#RRGGBB` colour tags
    pub colour_tags: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_height: 0.0,
            align: TextAlign::default(),
            max_width: None,
            break_policy: BreakPolicy::Whitespace,
            colour_tags: true,
        }
    }
}

/// One character placed on a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    /// Pen movement, tab stops applied
    pub advance: f32,
    pub bearing_x: f32,
    /// Line top to glyph top
    pub bearing_y: f32,
    pub width: f32,
    pub height: f32,
    pub page: Option<PageId>,
    pub uv: UvRect,
}

impl PlacedGlyph {
    fn new(ch: char, info: &GlyphInfo) -> Self {
        Self {
            ch,
            advance: info.full_advance(),
            bearing_x: info.bearing_x,
            bearing_y: info.bearing_y,
            width: info.width,
            height: info.height,
            page: info.page,
            uv: info.uv,
        }
    }

    /// Breakable whitespace; no-break spaces count as word characters
    pub fn is_whitespace(&self) -> bool {
        self.ch.is_whitespace() && !matches!(self.ch, '\u{A0}' | '\u{2007}' | '\u{202F}')
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEntry {
    Glyph(PlacedGlyph),
    /// Tint for the glyphs that follow
    Colour(Color),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub top: f32,
    /// Horizontal alignment offset
    pub offset: f32,
    /// Advance width without trailing whitespace
    pub width: f32,
    /// Ended by word wrap rather than a break character
    pub auto_wrap: bool,
    pub entries: Vec<LineEntry>,
}

impl TextLine {
    pub fn glyphs(&self) -> impl Iterator<Item = &PlacedGlyph> {
        self.entries.iter().filter_map(|entry| match entry {
            LineEntry::Glyph(glyph) => Some(glyph),
            LineEntry::Colour(_) => None,
        })
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs().count()
    }

    /// Pen position after every glyph, whitespace included
    pub fn advance(&self) -> f32 {
        self.glyphs().map(|g| g.advance).sum()
    }

    /// Cursor positions taken by this line's terminator
    fn break_len(&self) -> usize {
        usize::from(!self.auto_wrap)
    }
}

/// Laid out text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    /// Widest line
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
    /// Width the lines were aligned within
    pub view_width: f32,
}

impl TextLayout {
    pub fn empty(line_height: f32) -> Self {
        Self {
            lines: Vec::new(),
            width: 0.0,
            height: 0.0,
            line_height,
            view_width: 0.0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Number of cursor positions: glyphs plus explicit line breaks
    pub fn logical_len(&self) -> usize {
        let glyphs: usize = self.lines.iter().map(TextLine::glyph_count).sum();
        let breaks = self
            .lines
            .iter()
            .rev()
            .skip(1)
            .filter(|line| !line.auto_wrap)
            .count();
        glyphs + breaks
    }

    /// Top-left of the caret before the glyph at `index`, relative to the
    /// layout origin. Indices past the end give the end of the text.
    pub fn cursor_point(&self, index: usize) -> Point {
        let mut position = 0;
        let last = self.lines.len().saturating_sub(1);

        for (i, line) in self.lines.iter().enumerate() {
            let mut x = line.offset;
            for glyph in line.glyphs() {
                if position == index {
                    return Point::new(x, line.top);
                }
                x += glyph.advance;
                position += 1;
            }
            // End of a wrapped line is the start of the next one
            if position == index && (!line.auto_wrap || i == last) {
                return Point::new(x, line.top);
            }
            position += line.break_len();
        }

        match self.lines.last() {
            Some(line) => Point::new(line.offset + line.advance(), line.top),
            None => Point::ZERO,
        }
    }

    /// Cursor index closest to `point` (layout coordinates)
    pub fn cursor_index(&self, point: Point) -> usize {
        if self.lines.is_empty() {
            return 0;
        }

        let row = if self.line_height > 0.0 && point.y > 0.0 {
            ((point.y / self.line_height).floor() as usize).min(self.lines.len() - 1)
        } else {
            0
        };

        let mut index: usize = self.lines[..row]
            .iter()
            .map(|line| line.glyph_count() + line.break_len())
            .sum();

        let line = &self.lines[row];
        let mut x = line.offset;
        for glyph in line.glyphs() {
            if point.x < x + glyph.advance / 2.0 {
                return index;
            }
            x += glyph.advance;
            index += 1;
        }
        index
    }

    /// Offset placing the whole block inside `bounds`
    pub fn aligned_origin(&self, bounds: Size, align: TextAlign) -> Point {
        let x = align_offset(bounds.width - self.view_width, align.horizontal);
        let y = match align.vertical {
            VerticalAlign::Top => 0.0,
            VerticalAlign::Center => ((bounds.height - self.height) / 2.0).floor(),
            VerticalAlign::Bottom => bounds.height - self.height,
        };
        Point::new(x, y)
    }
}

/// Line under construction
struct LineBuilder {
    entries: Vec<LineEntry>,
    pen: f32,
    /// Entries from this index on move when the line wraps
    break_at: Option<usize>,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            pen: 0.0,
            break_at: None,
        }
    }

    fn push_colour(&mut self, colour: Color) {
        self.entries.push(LineEntry::Colour(colour));
    }

    fn push_glyph(&mut self, mut glyph: PlacedGlyph, tab_width: f32) {
        if glyph.ch == '\t' {
            glyph.advance = tab_advance(self.pen, tab_width, glyph.advance);
        }
        self.pen += glyph.advance;
        self.entries.push(LineEntry::Glyph(glyph));
    }

    fn mark_break(&mut self) {
        self.break_at = Some(self.entries.len());
    }

    /// Split off everything after the last break opportunity
    fn wrap(&mut self, tab_width: f32) -> Option<LineBuilder> {
        let at = self.break_at.take().filter(|at| *at > 0)?;
        let tail = self.entries.split_off(at);
        self.pen = reflow(&mut self.entries, tab_width);

        let mut next = LineBuilder::new();
        for entry in tail {
            match entry {
                LineEntry::Glyph(glyph) => next.push_glyph(glyph, tab_width),
                LineEntry::Colour(colour) => next.push_colour(colour),
            }
        }
        Some(next)
    }

    fn finish(self, auto_wrap: bool) -> TextLine {
        TextLine {
            top: 0.0,
            offset: 0.0,
            width: content_width(&self.entries),
            auto_wrap,
            entries: self.entries,
        }
    }
}

/// Advance of a tab starting at `pen`
fn tab_advance(pen: f32, tab_width: f32, fallback: f32) -> f32 {
    if tab_width <= 0.0 {
        return fallback;
    }
    ((pen / tab_width).floor() + 1.0) * tab_width - pen
}

/// Recompute tab advances from the line start; returns the final pen
fn reflow(entries: &mut [LineEntry], tab_width: f32) -> f32 {
    let mut pen = 0.0;
    for entry in entries.iter_mut() {
        if let LineEntry::Glyph(glyph) = entry {
            if glyph.ch == '\t' {
                glyph.advance = tab_advance(pen, tab_width, glyph.advance);
            }
            pen += glyph.advance;
        }
    }
    pen
}

/// Pen position after the last non-whitespace glyph
fn content_width(entries: &[LineEntry]) -> f32 {
    let mut pen = 0.0;
    let mut width = 0.0;
    for entry in entries {
        if let LineEntry::Glyph(glyph) = entry {
            pen += glyph.advance;
            if !glyph.is_whitespace() {
                width = pen;
            }
        }
    }
    width
}

/// Byte offsets after which a line may break (UAX #14)
fn unicode_breaks(text: &str) -> Vec<usize> {
    unicode_linebreak::linebreaks(text)
        .filter(|(_, opportunity)| *opportunity == BreakOpportunity::Allowed)
        .map(|(offset, _)| offset)
        .collect()
}

pub struct TextLayoutEngine;

impl TextLayoutEngine {
    /// Lay out `text` with glyphs from `font`.
    ///
    /// A font that failed to load gives an empty layout.
    pub fn layout(text: &str, font: &TrueTypeFont, options: &LayoutOptions) -> TextLayout {
        let line_height = if options.line_height > 0.0 {
            options.line_height
        } else {
            font.default_height() as f32
        };

        let Some(metrics) = font.metrics() else {
            return TextLayout::empty(line_height);
        };
        let tab_width = metrics.tab_width;
        let max_width = options.max_width.filter(|w| *w >= 0.0);

        let unicode = match options.break_policy {
            BreakPolicy::UnicodeLineBreak if max_width.is_some() => unicode_breaks(text),
            _ => Vec::new(),
        };

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut lines = Vec::new();
        let mut line = LineBuilder::new();
        let mut i = 0;

        while i < chars.len() {
            let (offset, ch) = chars[i];
            i += 1;

            match ch {
                '\r' | '\n' | '\u{85}' => {
                    if ch == '\r' && chars.get(i).map(|(_, c)| *c) == Some('\n') {
                        i += 1;
                    }
                    lines.push(std::mem::replace(&mut line, LineBuilder::new()).finish(false));
                    continue;
                }
                '#' if options.colour_tags => {
                    if chars.get(i).map(|(_, c)| *c) == Some('#') {
                        // Literal '#', falls through to glyph placement
                        i += 1;
                    } else if let Some(colour) = text
                        .get(offset + 1..offset + 7)
                        .and_then(Color::from_hex_digits)
                    {
                        line.push_colour(colour);
                        i += 6;
                        continue;
                    }
                }
                _ => {}
            }

            let Some(info) = font.glyph_info(ch) else {
                continue;
            };
            let glyph = PlacedGlyph::new(ch, info);

            if let Some(max) = max_width {
                if !glyph.is_whitespace() && line.pen + glyph.advance > max {
                    if let Some(next) = line.wrap(tab_width) {
                        lines.push(std::mem::replace(&mut line, next).finish(true));
                    }
                }
            }

            let whitespace = glyph.is_whitespace();
            line.push_glyph(glyph, tab_width);

            let end = chars.get(i).map_or(text.len(), |(next, _)| *next);
            let breakable = match options.break_policy {
                BreakPolicy::Whitespace => whitespace,
                BreakPolicy::UnicodeLineBreak => unicode.binary_search(&end).is_ok(),
            };
            if breakable {
                line.mark_break();
            }
        }
        lines.push(line.finish(false));

        let widest = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
        let view_width = max_width.map_or(widest, |max| max.max(widest));
        for (row, line) in lines.iter_mut().enumerate() {
            line.top = row as f32 * line_height;
            line.offset = align_offset(view_width - line.width, options.align.horizontal);
        }

        TextLayout {
            height: lines.len() as f32 * line_height,
            width: widest,
            line_height,
            view_width,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_config, mock_font, mock_font_with, MockFaceScript, MOCK_GLYPH};
    use crate::rasterizer::GlyphMetrics;

    fn prepared(text: &str) -> TrueTypeFont {
        let (mut font, _) = mock_font();
        font.prepare_string(text);
        font
    }

    fn line_text(line: &TextLine) -> String {
        line.glyphs().map(|g| g.ch).collect()
    }

    /// Pen position of every glyph on a line
    fn positions(line: &TextLine) -> Vec<f32> {
        let mut x = 0.0;
        line.glyphs()
            .map(|g| {
                let at = x;
                x += g.advance;
                at
            })
            .collect()
    }

    #[test]
    fn test_tab_stop_scenario() {
        let font = prepared("a\tb");
        let layout = TextLayoutEngine::layout("a\tb", &font, &LayoutOptions::default());

        assert_eq!(layout.lines.len(), 1);
        let line = &layout.lines[0];
        assert_eq!(line.entries.len(), 3);
        assert_eq!(positions(line), vec![0.0, 7.0, 48.0]);

        let glyphs: Vec<_> = line.glyphs().collect();
        // Tab is not drawn
        assert!(glyphs[1].page.is_none());
        assert_eq!(glyphs[1].advance, 41.0);
        // 'b' ink starts at 48 + bearing
        assert_eq!(48.0 + glyphs[2].bearing_x, 49.0);
        assert!(glyphs[2].page.is_some());
    }

    #[test]
    fn test_wrap_at_word_boundary() {
        let font = prepared("hello world");
        // "hello" is 35px, "hello world" is 83px
        let options = LayoutOptions {
            max_width: Some(36.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout("hello world", &font, &options);

        assert_eq!(layout.lines.len(), 2);
        assert_eq!(line_text(&layout.lines[0]), "hello ");
        assert_eq!(line_text(&layout.lines[1]), "world");
        assert!(layout.lines[0].auto_wrap);
        assert!(!layout.lines[1].auto_wrap);
        // Trailing space hangs
        assert_eq!(layout.lines[0].width, 35.0);
        assert_eq!(layout.lines[1].top, 20.0);
    }

    #[test]
    fn test_no_break_space_keeps_words_together() {
        let options = LayoutOptions {
            max_width: Some(30.0),
            ..LayoutOptions::default()
        };

        let font = prepared("ab cd");
        let layout = TextLayoutEngine::layout("ab cd", &font, &options);
        assert_eq!(layout.lines.len(), 2);

        for text in ["ab\u{A0}cd", "ab\u{202F}cd"] {
            let font = prepared(text);
            let layout = TextLayoutEngine::layout(text, &font, &options);
            // No opportunity left, so the whole run overflows on one line
            assert_eq!(layout.lines.len(), 1);
            assert_eq!(line_text(&layout.lines[0]), text);
            assert_eq!(layout.lines[0].width, 35.0);
        }
    }

    #[test]
    fn test_wrap_width_bound() {
        let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
        let font = prepared(text);
        for max in [20.0, 36.0, 50.0, 77.0, 120.0, 200.0] {
            let options = LayoutOptions {
                max_width: Some(max),
                ..LayoutOptions::default()
            };
            let layout = TextLayoutEngine::layout(text, &font, &options);
            for line in &layout.lines {
                let single_word = !line_text(line).trim_end().contains(' ');
                assert!(
                    line.width <= max || single_word,
                    "line {:?} is {}px wide at max {}",
                    line_text(line),
                    line.width,
                    max
                );
            }
            // Nothing lost
            let joined: String = layout.lines.iter().map(line_text).collect();
            assert_eq!(joined, text);
        }
    }

    #[test]
    fn test_unbreakable_word_overflows() {
        let font = prepared("abcdefghij xy");
        let options = LayoutOptions {
            max_width: Some(20.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout("abcdefghij xy", &font, &options);
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(line_text(&layout.lines[0]), "abcdefghij ");
        assert_eq!(layout.lines[0].width, 70.0);
        assert_eq!(line_text(&layout.lines[1]), "xy");
    }

    #[test]
    fn test_unicode_policy_breaks_after_hyphen() {
        let text = "well-known";
        let font = prepared(text);
        let whitespace = LayoutOptions {
            max_width: Some(40.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout(text, &font, &whitespace);
        assert_eq!(layout.lines.len(), 1);

        let unicode = LayoutOptions {
            break_policy: BreakPolicy::UnicodeLineBreak,
            ..whitespace
        };
        let layout = TextLayoutEngine::layout(text, &font, &unicode);
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(line_text(&layout.lines[0]), "well-");
        assert_eq!(line_text(&layout.lines[1]), "known");
    }

    #[test]
    fn test_explicit_breaks() {
        let text = "ab\r\ncd\ne\rf\u{85}g";
        let font = prepared(text);
        let layout = TextLayoutEngine::layout(text, &font, &LayoutOptions::default());

        let lines: Vec<_> = layout.lines.iter().map(line_text).collect();
        assert_eq!(lines, vec!["ab", "cd", "e", "f", "g"]);
        assert!(layout.lines.iter().all(|l| !l.auto_wrap));
        assert_eq!(layout.height, 100.0);
        // 7 glyphs + 4 breaks
        assert_eq!(layout.logical_len(), 11);

        let trailing = TextLayoutEngine::layout("a\n", &font, &LayoutOptions::default());
        assert_eq!(trailing.lines.len(), 2);
    }

    #[test]
    fn test_colour_tags() {
        let text = "a#FF0000b##c#12";
        let font = prepared(text);
        let layout = TextLayoutEngine::layout(text, &font, &LayoutOptions::default());
        let line = &layout.lines[0];

        assert_eq!(line.entries[1], LineEntry::Colour(Color::RED));
        assert_eq!(line_text(line), "ab#c#12");
        assert_eq!(layout.logical_len(), 7);

        let plain = LayoutOptions {
            colour_tags: false,
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout("#FF0000", &font, &plain);
        assert_eq!(line_text(&layout.lines[0]), "#FF0000");
    }

    #[test]
    fn test_tabs_recomputed_after_wrap() {
        let text = "aaaa bbbb\tc";
        let font = prepared(text);
        let options = LayoutOptions {
            max_width: Some(60.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout(text, &font, &options);

        assert_eq!(layout.lines.len(), 2);
        let second = &layout.lines[1];
        assert_eq!(line_text(second), "bbbb\tc");
        // Tab stop measured from the wrapped line start
        assert_eq!(positions(second), vec![0.0, 7.0, 14.0, 21.0, 28.0, 48.0]);
    }

    #[test]
    fn test_alignment_offsets() {
        let text = "ab\nabcd";
        let font = prepared(text);
        let options = LayoutOptions {
            align: TextAlign::new(HorizontalAlign::Center, VerticalAlign::Top),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout(text, &font, &options);
        assert_eq!(layout.width, 28.0);
        assert_eq!(layout.lines[0].offset, 7.0);
        assert_eq!(layout.lines[1].offset, 0.0);

        let right = LayoutOptions {
            align: TextAlign::new(HorizontalAlign::Right, VerticalAlign::Bottom),
            max_width: Some(50.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout(text, &font, &right);
        assert_eq!(layout.lines[0].offset, 36.0);
        assert_eq!(layout.lines[1].offset, 22.0);

        let origin = layout.aligned_origin(Size::new(100.0, 100.0), right.align);
        // Lines are already right-aligned within 50px
        assert_eq!(origin, Point::new(50.0, 60.0));
        assert_eq!(origin.x + layout.lines[1].offset + layout.lines[1].width, 100.0);
    }

    #[test]
    fn test_cursor_round_trip() {
        let text = "ab\ncd";
        let font = prepared(text);
        let layout = TextLayoutEngine::layout(text, &font, &LayoutOptions::default());

        assert_eq!(layout.cursor_point(0), Point::new(0.0, 0.0));
        assert_eq!(layout.cursor_point(2), Point::new(14.0, 0.0));
        assert_eq!(layout.cursor_point(3), Point::new(0.0, 20.0));
        assert_eq!(layout.cursor_point(5), Point::new(14.0, 20.0));
        assert_eq!(layout.cursor_point(99), Point::new(14.0, 20.0));

        assert_eq!(layout.cursor_index(Point::new(2.0, 5.0)), 0);
        assert_eq!(layout.cursor_index(Point::new(5.0, 5.0)), 1);
        assert_eq!(layout.cursor_index(Point::new(50.0, 5.0)), 2);
        assert_eq!(layout.cursor_index(Point::new(8.0, 25.0)), 4);
        assert_eq!(layout.cursor_index(Point::new(0.0, 500.0)), 3);
    }

    #[test]
    fn test_cursor_on_wrapped_line() {
        let font = prepared("hello world");
        let options = LayoutOptions {
            max_width: Some(36.0),
            ..LayoutOptions::default()
        };
        let layout = TextLayoutEngine::layout("hello world", &font, &options);
        // No break character between the lines
        assert_eq!(layout.logical_len(), 11);
        assert_eq!(layout.cursor_point(6), Point::new(0.0, 20.0));
        assert_eq!(layout.cursor_point(5), Point::new(35.0, 0.0));
    }

    #[test]
    fn test_layout_does_not_rasterize() {
        let (mut font, loads) = mock_font();
        font.prepare_string("hello\tworld");
        let before = loads.get();
        let first = TextLayoutEngine::layout("hello\tworld", &font, &LayoutOptions::default());
        let second = TextLayoutEngine::layout("hello\tworld", &font, &LayoutOptions::default());
        assert_eq!(loads.get(), before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unprepared_glyph_uses_substitute() {
        let (font, _) = mock_font();
        let layout = TextLayoutEngine::layout("z", &font, &LayoutOptions::default());
        let glyph = layout.lines[0].glyphs().next().copied().unwrap();
        // Not-defined glyph: advance 5, no bearing
        assert_eq!(glyph.ch, 'z');
        assert_eq!(glyph.advance, 5.0);
    }

    #[test]
    fn test_wide_glyph_override() {
        let script = MockFaceScript::default().with_glyph(
            'W',
            GlyphMetrics {
                width: 12.0,
                advance: 14.0,
                ..MOCK_GLYPH
            },
        );
        let (mut font, _) = mock_font_with(script, mock_config());
        font.prepare_string("WW");
        let layout = TextLayoutEngine::layout("WW", &font, &LayoutOptions::default());
        assert_eq!(layout.width, 28.0);
    }

    #[test]
    fn test_failed_font_gives_empty_layout() {
        let config = crate::FontConfig {
            source: "bad.ttf".into(),
            ..mock_config()
        };
        let (font, _) = mock_font_with(MockFaceScript::default(), config);
        let layout = TextLayoutEngine::layout("abc", &font, &LayoutOptions::default());
        assert!(layout.lines.is_empty());
        assert_eq!(layout.cursor_point(1), Point::ZERO);
    }
}
