//! Glyph atlas management
//!
//! Glyphs are packed into fixed-size square pages with a shelf packer. Every
//! row has the same pitch (font line height plus glyph spacing), so a glyph
//! only needs a horizontal slot. When the row is full the cursor drops to
//! the next row, and when the next row would leave the page a new page is
//! started. Pages are append-only: a slot handed out stays valid until the
//! atlas is released.

use crate::pixel::{PixelFormat, PixelWriter};
use crate::texture::{next_texture_name, TextureBackend, TextureId, TextureUsage};
use crate::{Result, TextError};
use smallvec::SmallVec;

/// Index of a page inside its atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Normalised texture coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl UvRect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Position of an allocated block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasSlot {
    pub page: PageId,
    pub x: u32,
    pub y: u32,
}

/// One square pixel buffer of the atlas
pub struct AtlasPage {
    id: PageId,
    size: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
    dirty: bool,
    texture: Option<TextureId>,
}

impl AtlasPage {
    fn new(id: PageId, size: u32, format: PixelFormat) -> Self {
        Self {
            id,
            size,
            format,
            pixels: vec![0; size as usize * size as usize * format.bytes_per_pixel()],
            dirty: true,
            texture: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// Edge length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        self.size as usize * self.format.bytes_per_pixel()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Backing texture, created on first upload
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Luminance/alpha of the pixel at (`x`, `y`)
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8)> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.pitch() + x as usize * bpp;
        let px = &self.pixels[offset..offset + bpp];
        Some((px[0], px[bpp - 1]))
    }
}

impl std::fmt::Debug for AtlasPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasPage")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("format", &self.format)
            .field("dirty", &self.dirty)
            .field("texture", &self.texture)
            .finish()
    }
}

/// Paged glyph atlas owned by one font
pub struct GlyphAtlas {
    pages: Vec<AtlasPage>,
    /// Page receiving new glyphs
    current: Option<usize>,
    next_x: u32,
    next_y: u32,
    size: u32,
    row_height: u32,
    spacing: u32,
    writer: PixelWriter,
}

impl GlyphAtlas {
    /// Create an empty atlas. No page exists until the first allocation.
    pub fn new(size: u32, row_height: u32, spacing: u32, writer: PixelWriter) -> Self {
        Self {
            pages: Vec::new(),
            current: None,
            next_x: 0,
            next_y: 0,
            size,
            row_height,
            spacing,
            writer,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.size
    }

    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    /// Vertical distance between rows
    pub fn row_pitch(&self) -> u32 {
        self.row_height.saturating_add(self.spacing)
    }

    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    pub fn format(&self) -> PixelFormat {
        self.writer.format()
    }

    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> Option<&AtlasPage> {
        self.pages.get(id.index())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn push_page(&mut self) -> usize {
        let index = self.pages.len();
        let id = PageId(index as u32);
        self.pages
            .push(AtlasPage::new(id, self.size, self.writer.format()));
        self.current = Some(index);
        self.next_x = 0;
        self.next_y = 0;
        tracing::debug!(
            "Created atlas page {} ({}x{}, {:?})",
            index,
            self.size,
            self.size,
            self.writer.format()
        );
        index
    }

    /// Reserve a `width`x`height` block.
    ///
    /// The block always starts at the current cursor; the cursor then moves
    /// right by `width + spacing`.
    pub fn allocate(&mut self, width: u32, height: u32) -> Result<AtlasSlot> {
        if width > self.size {
            return Err(TextError::GlyphTooLarge {
                width,
                height,
                page_size: self.size,
            });
        }

        let pitch = self.row_pitch();
        let page = match self.current {
            Some(page) if self.next_y.saturating_add(pitch) <= self.size => {
                if self.next_x.saturating_add(width) > self.size {
                    self.next_y += pitch;
                    self.next_x = 0;
                    if self.next_y.saturating_add(pitch) > self.size {
                        self.push_page()
                    } else {
                        page
                    }
                } else {
                    page
                }
            }
            _ => self.push_page(),
        };

        let slot = AtlasSlot {
            page: PageId(page as u32),
            x: self.next_x,
            y: self.next_y,
        };
        self.next_x = self.next_x.saturating_add(width).saturating_add(self.spacing);
        Ok(slot)
    }

    /// Height actually written for a glyph placed at `slot`
    fn clipped_height(&self, slot: AtlasSlot, height: u32) -> u32 {
        height
            .min(self.row_height)
            .min(self.size.saturating_sub(slot.y))
    }

    fn uv_for(&self, slot: AtlasSlot, width: u32, height: u32) -> UvRect {
        let size = self.size as f32;
        UvRect::new(
            slot.x as f32 / size,
            slot.y as f32 / size,
            (slot.x + width) as f32 / size,
            (slot.y + height) as f32 / size,
        )
    }

    /// Allocate and solid-fill a block.
    ///
    /// Returns `None` without allocating when the block has no area.
    pub fn insert_fill(
        &mut self,
        width: u32,
        height: u32,
        lum0: u8,
        lum1: u8,
        alpha: u8,
    ) -> Result<Option<(AtlasSlot, UvRect)>> {
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let slot = self.allocate(width, height)?;
        let height = self.clipped_height(slot, height);
        let writer = self.writer;
        let page = &mut self.pages[slot.page.index()];
        let pitch = page.pitch();

        writer.fill(
            &mut page.pixels,
            pitch,
            slot.x as usize,
            slot.y as usize,
            width as usize,
            height as usize,
            lum0,
            lum1,
            alpha,
        );
        page.dirty = true;

        Ok(Some((slot, self.uv_for(slot, width, height))))
    }

    /// Allocate a block and copy tightly packed 8-bit coverage into it.
    ///
    /// The block may be larger than the source; the rest is transparent.
    pub fn insert_bitmap(
        &mut self,
        width: u32,
        height: u32,
        coverage: &[u8],
        src_width: u32,
        src_rows: u32,
    ) -> Result<Option<(AtlasSlot, UvRect)>> {
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let slot = self.allocate(width, height)?;
        let height = self.clipped_height(slot, height);
        let writer = self.writer;
        let page = &mut self.pages[slot.page.index()];
        let pitch = page.pitch();

        writer.blit(
            &mut page.pixels,
            pitch,
            slot.x as usize,
            slot.y as usize,
            width as usize,
            height as usize,
            coverage,
            src_width as usize,
            src_rows as usize,
            src_width as usize,
        );
        page.dirty = true;

        Ok(Some((slot, self.uv_for(slot, width, height))))
    }

    /// Pages written since their last upload
    pub fn dirty_pages(&self) -> SmallVec<[PageId; 4]> {
        self.pages
            .iter()
            .filter(|page| page.dirty)
            .map(|page| page.id)
            .collect()
    }

    /// Upload every dirty page, creating its texture on first use.
    ///
    /// Returns the number of pages uploaded; a second call with no new
    /// writes uploads nothing.
    pub fn upload_dirty(&mut self, backend: &mut dyn TextureBackend) -> Result<usize> {
        let mut uploaded = 0;

        for page in self.pages.iter_mut().filter(|page| page.dirty) {
            let texture = match page.texture {
                Some(texture) => texture,
                None => {
                    let name = next_texture_name();
                    let texture = backend.create_texture(&name);
                    if let Err(e) = backend.allocate(
                        texture,
                        page.size,
                        page.size,
                        TextureUsage::STATIC | TextureUsage::WRITE,
                        page.format,
                    ) {
                        backend.destroy_texture(texture);
                        return Err(e);
                    }
                    page.texture = Some(texture);
                    tracing::debug!("Created texture '{}' for atlas page {}", name, page.id.0);
                    texture
                }
            };

            backend.upload(texture, &page.pixels)?;
            page.dirty = false;
            uploaded += 1;
        }

        if uploaded > 0 {
            tracing::debug!("Uploaded {} atlas page(s)", uploaded);
        }
        Ok(uploaded)
    }

    /// Destroy every page texture and drop all pages
    pub fn release(&mut self, backend: &mut dyn TextureBackend) {
        for page in self.pages.drain(..) {
            if let Some(texture) = page.texture {
                backend.destroy_texture(texture);
            }
        }
        self.current = None;
        self.next_x = 0;
        self.next_y = 0;
    }
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("page_size", &self.size)
            .field("pages", &self.pages.len())
            .field("cursor", &(self.next_x, self.next_y))
            .field("row_pitch", &self.row_pitch())
            .field("writer", &self.writer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::HeadlessBackend;

    fn atlas(size: u32, row_height: u32, spacing: u32) -> GlyphAtlas {
        GlyphAtlas::new(
            size,
            row_height,
            spacing,
            PixelWriter::select(PixelFormat::LuminanceAlpha8, true),
        )
    }

    #[test]
    fn test_shelf_rows_and_pages() {
        // Pitch 11, so 64px fits five rows (0, 11, 22, 33, 44; 55 + 11 > 64)
        let mut atlas = atlas(64, 10, 1);

        let a = atlas.allocate(30, 10).unwrap();
        let b = atlas.allocate(30, 10).unwrap();
        let c = atlas.allocate(30, 10).unwrap();
        assert_eq!((a.page, a.x, a.y), (PageId(0), 0, 0));
        assert_eq!((b.x, b.y), (31, 0));
        // 62 + 30 > 64 wraps to the next row
        assert_eq!((c.x, c.y), (0, 11));

        for _ in 0..7 {
            atlas.allocate(30, 10).unwrap();
        }
        assert_eq!(atlas.page_count(), 1);
        let next = atlas.allocate(30, 10).unwrap();
        assert_eq!((next.page, next.x, next.y), (PageId(1), 0, 0));
    }

    #[test]
    fn test_glyph_wider_than_page() {
        let mut atlas = atlas(32, 10, 1);
        assert!(matches!(
            atlas.allocate(33, 5),
            Err(TextError::GlyphTooLarge { width: 33, page_size: 32, .. })
        ));
        assert_eq!(atlas.page_count(), 0);
    }

    #[test]
    fn test_zero_area_does_not_allocate() {
        let mut atlas = atlas(32, 10, 1);
        assert!(atlas.insert_fill(0, 10, 0xFF, 0xFF, 0xFF).unwrap().is_none());
        assert!(atlas.insert_bitmap(4, 0, &[], 4, 0).unwrap().is_none());
        assert_eq!(atlas.page_count(), 0);
    }

    #[test]
    fn test_page_count_and_no_overlap() {
        let size = 64;
        let mut atlas = atlas(size, 12, 1);
        let (w, h) = (9u32, 12u32);
        let n = 80u32;

        let mut rects: Vec<(PageId, u32, u32)> = Vec::new();
        for _ in 0..n {
            let (slot, uv) = atlas.insert_fill(w, h, 0xFF, 0xFF, 0xFF).unwrap().unwrap();
            assert!(slot.x + w <= size && slot.y + h <= size);
            assert!((uv.width() - w as f32 / size as f32).abs() < 1e-6);
            rects.push((slot.page, slot.x, slot.y));
        }

        let total_area = n * w * h;
        let page_area = size * size;
        let min_pages = total_area.div_ceil(page_area) as usize;
        assert!(atlas.page_count() >= min_pages);

        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                if a.0 != b.0 {
                    continue;
                }
                let disjoint = a.1 + w <= b.1 || b.1 + w <= a.1 || a.2 + h <= b.2 || b.2 + h <= a.2;
                assert!(disjoint, "overlap between {:?} and {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_tall_glyph_clipped_to_row() {
        let mut atlas = atlas(32, 8, 1);
        let (slot, uv) = atlas
            .insert_bitmap(2, 12, &[0xFF; 24], 2, 12)
            .unwrap()
            .unwrap();
        assert_eq!(slot.y, 0);
        assert_eq!(uv.bottom, 8.0 / 32.0);

        let page = &atlas.pages()[0];
        assert_eq!(page.pixel(0, 7), Some((0xFF, 0xFF)));
        // Spacing row below stays empty
        assert_eq!(page.pixel(0, 8), Some((0, 0)));
    }

    #[test]
    fn test_uvs_stable_across_inserts() {
        let mut atlas = atlas(32, 6, 1);
        let (_, first) = atlas.insert_fill(5, 6, 0xFF, 0xFF, 0xFF).unwrap().unwrap();
        for _ in 0..40 {
            atlas.insert_fill(5, 6, 0xFF, 0xFF, 0xFF).unwrap();
        }
        assert!(atlas.page_count() > 1);

        // Slot of the first glyph is still on page 0 at the origin
        assert_eq!(first, UvRect::new(0.0, 0.0, 5.0 / 32.0, 6.0 / 32.0));
        assert_eq!(atlas.pages()[0].pixel(0, 0), Some((0xFF, 0xFF)));
    }

    #[test]
    fn test_upload_dirty_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let mut atlas = atlas(16, 4, 1);
        atlas.insert_fill(3, 4, 0xFF, 0x00, 0x88).unwrap();

        assert_eq!(atlas.dirty_pages().as_slice(), &[PageId(0)]);
        assert_eq!(atlas.upload_dirty(&mut backend).unwrap(), 1);
        assert!(atlas.dirty_pages().is_empty());
        assert_eq!(atlas.upload_dirty(&mut backend).unwrap(), 0);

        let texture = atlas.pages()[0].texture().unwrap();
        let stored = backend.texture(texture).unwrap();
        assert!(stored.name.ends_with("_TrueTypeFont"));
        assert_eq!(stored.pixels, atlas.pages()[0].pixels());

        // New writes reuse the texture
        atlas.insert_fill(3, 4, 0xFF, 0x00, 0x88).unwrap();
        assert_eq!(atlas.upload_dirty(&mut backend).unwrap(), 1);
        assert_eq!(backend.texture_count(), 1);
        assert_eq!(backend.upload_count(), 2);

        atlas.release(&mut backend);
        assert_eq!(backend.texture_count(), 0);
        assert_eq!(atlas.page_count(), 0);
    }

    /// Headless backend whose first `failures` allocations fail
    struct FailingAllocBackend {
        inner: HeadlessBackend,
        failures: u32,
    }

    impl TextureBackend for FailingAllocBackend {
        fn is_format_supported(&self, format: PixelFormat, usage: TextureUsage) -> bool {
            self.inner.is_format_supported(format, usage)
        }

        fn create_texture(&mut self, name: &str) -> TextureId {
            self.inner.create_texture(name)
        }

        fn allocate(
            &mut self,
            id: TextureId,
            width: u32,
            height: u32,
            usage: TextureUsage,
            format: PixelFormat,
        ) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(TextError::TextureError("out of video memory".into()));
            }
            self.inner.allocate(id, width, height, usage, format)
        }

        fn upload(&mut self, id: TextureId, pixels: &[u8]) -> Result<()> {
            self.inner.upload(id, pixels)
        }

        fn destroy_texture(&mut self, id: TextureId) {
            self.inner.destroy_texture(id)
        }
    }

    #[test]
    fn test_failed_allocation_does_not_leak() {
        let mut backend = FailingAllocBackend {
            inner: HeadlessBackend::new(),
            failures: 2,
        };
        let mut atlas = atlas(16, 4, 1);
        atlas.insert_fill(3, 4, 0xFF, 0x00, 0x88).unwrap();

        assert!(atlas.upload_dirty(&mut backend).is_err());
        assert!(atlas.upload_dirty(&mut backend).is_err());
        assert_eq!(backend.inner.texture_count(), 0);
        assert_eq!(atlas.dirty_pages().as_slice(), &[PageId(0)]);

        assert_eq!(atlas.upload_dirty(&mut backend).unwrap(), 1);
        assert_eq!(backend.inner.texture_count(), 1);

        atlas.release(&mut backend);
        assert_eq!(backend.inner.texture_count(), 0);
    }
}
