//! Texture backend contract
//!
//! The atlas never talks to a GPU directly. Page textures are created,
//! allocated, uploaded and destroyed through [`TextureBackend`], which a
//! renderer implements. [`HeadlessBackend`] keeps everything in memory and is
//! what the CLI and the tests render into.

use crate::pixel::PixelFormat;
use crate::{Result, TextError};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

bitflags! {
    /// How a texture is going to be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Contents rarely change
        const STATIC = 1 << 0;
        /// CPU writes the contents
        const WRITE = 1 << 1;
    }
}

/// Opaque handle returned by [`TextureBackend::create_texture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Process-wide counter for unique page texture names. Starts at zero with
/// the process and is never reset.
static TEXTURE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Next unique page texture name (`"{n}_TrueTypeFont"`)
pub(crate) fn next_texture_name() -> String {
    let n = TEXTURE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_TrueTypeFont", n)
}

/// Renderer-side texture operations used by the glyph atlas
pub trait TextureBackend {
    fn is_format_supported(&self, format: PixelFormat, usage: TextureUsage) -> bool;

    fn create_texture(&mut self, name: &str) -> TextureId;

    fn allocate(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        usage: TextureUsage,
        format: PixelFormat,
    ) -> Result<()>;

    /// Replace the whole texture contents
    fn upload(&mut self, id: TextureId, pixels: &[u8]) -> Result<()>;

    fn destroy_texture(&mut self, id: TextureId);
}

/// A texture held by [`HeadlessBackend`]
#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: Option<PixelFormat>,
    pub pixels: Vec<u8>,
    /// Number of uploads received
    pub uploads: u32,
}

/// In-memory texture backend
#[derive(Debug)]
pub struct HeadlessBackend {
    textures: FxHashMap<TextureId, HeadlessTexture>,
    next_id: u64,
    luminance_alpha: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            textures: FxHashMap::default(),
            next_id: 1,
            luminance_alpha: true,
        }
    }

    /// Backend that only accepts RGBA textures
    pub fn rgba_only() -> Self {
        Self {
            luminance_alpha: false,
            ..Self::new()
        }
    }

    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Total uploads across all live textures
    pub fn upload_count(&self) -> u32 {
        self.textures.values().map(|t| t.uploads).sum()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureBackend for HeadlessBackend {
    fn is_format_supported(&self, format: PixelFormat, _usage: TextureUsage) -> bool {
        match format {
            PixelFormat::LuminanceAlpha8 => self.luminance_alpha,
            PixelFormat::Rgba8 => true,
        }
    }

    fn create_texture(&mut self, name: &str) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(
            id,
            HeadlessTexture {
                name: name.to_string(),
                width: 0,
                height: 0,
                format: None,
                pixels: Vec::new(),
                uploads: 0,
            },
        );
        id
    }

    fn allocate(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        _usage: TextureUsage,
        format: PixelFormat,
    ) -> Result<()> {
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| TextError::TextureError(format!("unknown texture {:?}", id)))?;
        texture.width = width;
        texture.height = height;
        texture.format = Some(format);
        texture.pixels = vec![0; width as usize * height as usize * format.bytes_per_pixel()];
        Ok(())
    }

    fn upload(&mut self, id: TextureId, pixels: &[u8]) -> Result<()> {
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or_else(|| TextError::TextureError(format!("unknown texture {:?}", id)))?;
        if texture.format.is_none() {
            return Err(TextError::TextureError(format!(
                "texture '{}' uploaded before allocation",
                texture.name
            )));
        }
        if pixels.len() != texture.pixels.len() {
            return Err(TextError::TextureError(format!(
                "texture '{}' expects {} bytes, got {}",
                texture.name,
                texture.pixels.len(),
                pixels.len()
            )));
        }
        texture.pixels.copy_from_slice(pixels);
        texture.uploads += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_names_are_unique() {
        let a = next_texture_name();
        let b = next_texture_name();
        assert_ne!(a, b);
        assert!(a.ends_with("_TrueTypeFont"));
    }

    #[test]
    fn test_upload_requires_allocation() {
        let mut backend = HeadlessBackend::new();
        let id = backend.create_texture("page");
        assert!(backend.upload(id, &[0; 4]).is_err());

        backend
            .allocate(id, 2, 1, TextureUsage::STATIC | TextureUsage::WRITE, PixelFormat::LuminanceAlpha8)
            .unwrap();
        backend.upload(id, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.texture(id).unwrap().pixels, vec![1, 2, 3, 4]);
        assert_eq!(backend.upload_count(), 1);

        // Wrong size is rejected
        assert!(backend.upload(id, &[0; 3]).is_err());

        backend.destroy_texture(id);
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn test_rgba_only_backend() {
        let backend = HeadlessBackend::rgba_only();
        let usage = TextureUsage::STATIC | TextureUsage::WRITE;
        assert!(!backend.is_format_supported(PixelFormat::LuminanceAlpha8, usage));
        assert!(backend.is_format_supported(PixelFormat::Rgba8, usage));
    }
}
