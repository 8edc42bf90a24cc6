//! Font manager
//!
//! Owns every loaded font together with the data source and face loader
//! used to open them. Fonts are addressed by [`FontId`] and looked up by
//! name, with the empty name and `"Default"` meaning the default font.
//!
//! # Texture uploads
//!
//! Rasterizing glyphs only writes atlas pixels. The manager records which
//! fonts have dirty pages and [`FontManager::flush`] uploads them, once per
//! frame before anything is drawn. Several insertions in the same frame
//! therefore cost a single upload per page.

use crate::font::{FontConfig, PrepareReport, TrueTypeFont};
use crate::rasterizer::{FaceLoader, SwashFaceLoader};
use crate::stream::FontDataSource;
use crate::texture::TextureBackend;
use crate::Result;
use rustc_hash::{FxHashMap, FxHashSet};

/// Name that always resolves to the default font
pub const DEFAULT_FONT_ALIAS: &str = "Default";

/// Handle of a font owned by a [`FontManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

impl FontId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct FontManager {
    fonts: Vec<TrueTypeFont>,
    names: FxHashMap<String, FontId>,
    default_name: String,
    source: Box<dyn FontDataSource>,
    loader: Box<dyn FaceLoader>,
    /// Fonts with pages waiting for upload
    pending: FxHashSet<FontId>,
}

impl FontManager {
    pub fn new(source: impl FontDataSource + 'static, loader: impl FaceLoader + 'static) -> Self {
        Self {
            fonts: Vec::new(),
            names: FxHashMap::default(),
            default_name: DEFAULT_FONT_ALIAS.to_string(),
            source: Box::new(source),
            loader: Box::new(loader),
            pending: FxHashSet::default(),
        }
    }

    /// Manager rasterizing with swash
    pub fn with_source(source: impl FontDataSource + 'static) -> Self {
        Self::new(source, SwashFaceLoader)
    }

    pub fn default_font(&self) -> &str {
        &self.default_name
    }

    pub fn set_default_font(&mut self, name: impl Into<String>) {
        self.default_name = name.into();
    }

    /// Load (or reload) a font under `name`.
    ///
    /// A font that fails to load still gets an id; it answers `None` to
    /// glyph queries.
    pub fn load_font(
        &mut self,
        name: &str,
        config: FontConfig,
        backend: &mut dyn TextureBackend,
    ) -> FontId {
        let font = TrueTypeFont::load(name, config, self.source.as_mut(), self.loader.as_ref(), backend);
        let needs_upload = !font.dirty_pages().is_empty();

        let id = match self.names.get(name).copied() {
            Some(id) => {
                tracing::debug!("Reloading font '{}'", name);
                let slot = &mut self.fonts[id.index()];
                slot.release(backend);
                *slot = font;
                id
            }
            None => {
                let id = FontId(self.fonts.len() as u32);
                self.fonts.push(font);
                self.names.insert(name.to_string(), id);
                id
            }
        };

        if needs_upload {
            self.pending.insert(id);
        } else {
            self.pending.remove(&id);
        }
        id
    }

    /// Resolve a font name.
    ///
    /// The empty name and `"Default"` give the default font. An unknown name
    /// is logged and also gives the default font.
    pub fn get_by_name(&self, name: &str) -> Option<FontId> {
        let is_default = name.is_empty() || name == DEFAULT_FONT_ALIAS;
        if !is_default {
            if let Some(id) = self.names.get(name) {
                return Some(*id);
            }
        }

        let result = self.names.get(&self.default_name).copied();
        if !is_default {
            tracing::error!("Font '{}' not found. Replaced with default font.", name);
        }
        result
    }

    pub fn font(&self, id: FontId) -> Option<&TrueTypeFont> {
        self.fonts.get(id.index())
    }

    pub fn font_mut(&mut self, id: FontId) -> Option<&mut TrueTypeFont> {
        self.fonts.get_mut(id.index())
    }

    /// Font by name, with default fallback
    pub fn get(&self, name: &str) -> Option<&TrueTypeFont> {
        self.get_by_name(name).and_then(|id| self.font(id))
    }

    pub fn fonts(&self) -> impl Iterator<Item = (FontId, &TrueTypeFont)> {
        self.fonts
            .iter()
            .enumerate()
            .map(|(index, font)| (FontId(index as u32), font))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Rasterize the glyphs of `text` and queue the font for upload if any
    /// page became dirty
    pub fn prepare_string(&mut self, id: FontId, text: &str) -> PrepareReport {
        let Some(font) = self.fonts.get_mut(id.index()) else {
            return PrepareReport::default();
        };
        let report = font.prepare_string(text);
        if report.needs_upload() {
            self.pending.insert(id);
        }
        report
    }

    pub fn is_pending(&self, id: FontId) -> bool {
        self.pending.contains(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Upload the dirty pages of every queued font and empty the queue.
    ///
    /// Returns the number of pages uploaded. With nothing queued this does
    /// nothing. On a backend error the failing font and the ones not yet
    /// visited stay queued.
    pub fn flush(&mut self, backend: &mut dyn TextureBackend) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut queue: Vec<FontId> = self.pending.drain().collect();
        queue.sort_unstable();

        let mut uploaded = 0;
        for (position, id) in queue.iter().enumerate() {
            let Some(font) = self.fonts.get_mut(id.index()) else {
                continue;
            };
            match font.prepare_textures(backend) {
                Ok(count) => uploaded += count,
                Err(e) => {
                    self.pending.extend(queue[position..].iter().copied());
                    return Err(e);
                }
            }
        }

        tracing::debug!("Flushed {} font(s), {} page(s)", queue.len(), uploaded);
        Ok(uploaded)
    }

    /// Release every font and forget all names
    pub fn unload_all(&mut self, backend: &mut dyn TextureBackend) {
        for font in &mut self.fonts {
            font.release(backend);
        }
        self.fonts.clear();
        self.names.clear();
        self.pending.clear();
    }
}

impl std::fmt::Debug for FontManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.names.keys().collect();
        names.sort();
        f.debug_struct("FontManager")
            .field("fonts", &names)
            .field("default", &self.default_name)
            .field("pending", &self.pending.len())
            .finish()
    }
}
