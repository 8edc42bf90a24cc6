//! Font manifest handling
//!
//! A manifest (`scribe.toml`) lists directories to search for font files
//! and the fonts to load:
//!
//! ```toml
//! search_paths = ["fonts"]
//! default_font = "Body"
//!
//! [[font]]
//! name = "Body"
//! source = "DejaVuSans.ttf"
//! size = 12
//! antialias = true
//! ```

use anyhow::{Context, Result};
use scribe_text::{FileSystemSource, FontConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level manifest
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FontManifest {
    /// Directories searched for font sources, relative to the manifest
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Font used for empty and unknown names; the first font when unset
    #[serde(default)]
    pub default_font: Option<String>,
    #[serde(default, rename = "font")]
    pub fonts: Vec<FontEntry>,
}

/// One `[[font]]` table
#[derive(Debug, Deserialize, Serialize)]
pub struct FontEntry {
    pub name: String,
    #[serde(flatten)]
    pub config: FontConfig,
}

impl FontManifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let manifest: FontManifest = toml::from_str(content)?;
        if let Some(name) = manifest.duplicate_name() {
            anyhow::bail!("Font '{}' is declared more than once", name);
        }
        Ok(manifest)
    }

    fn duplicate_name(&self) -> Option<&str> {
        self.fonts.iter().enumerate().find_map(|(i, entry)| {
            self.fonts[..i]
                .iter()
                .any(|earlier| earlier.name == entry.name)
                .then_some(entry.name.as_str())
        })
    }

    /// Name of the default font
    pub fn default_font_name(&self) -> Option<&str> {
        self.default_font
            .as_deref()
            .or_else(|| self.fonts.first().map(|entry| entry.name.as_str()))
    }

    /// File source searching `search_paths` (relative to `base`), then
    /// `base` itself
    pub fn source(&self, base: &Path) -> FileSystemSource {
        let roots = self
            .search_paths
            .iter()
            .map(|path| if path.is_absolute() { path.clone() } else { base.join(path) })
            .chain(std::iter::once(base.to_path_buf()));
        FileSystemSource::with_roots(roots)
    }

    /// Manifest with a single antialiased 12pt font
    pub fn starter(name: &str, source: &str) -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            default_font: Some(name.to_string()),
            fonts: vec![FontEntry {
                name: name.to_string(),
                config: FontConfig {
                    source: source.to_string(),
                    size: 12.0,
                    antialias: true,
                    ..FontConfig::default()
                },
            }],
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize manifest")
    }

    /// Write the manifest to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_text::Hinting;

    const MANIFEST: &str = r#"
        search_paths = ["fonts", "/usr/share/fonts"]
        default_font = "Mono"

        [[font]]
        name = "Body"
        source = "Body.ttf"
        size = 12
        antialias = true
        hinting = "disable_all"
        substitute_code = 63

        [[font]]
        name = "Mono"
        source = "Mono.ttf"
        size = 10.5
        tab_width = 32
        texture_size = 512
    "#;

    #[test]
    fn test_parse_manifest() {
        let manifest = FontManifest::from_toml(MANIFEST).unwrap();
        assert_eq!(manifest.fonts.len(), 2);
        assert_eq!(manifest.default_font_name(), Some("Mono"));

        let body = &manifest.fonts[0];
        assert_eq!(body.name, "Body");
        assert_eq!(body.config.size, 12.0);
        assert!(body.config.antialias);
        assert_eq!(body.config.hinting, Hinting::DisableAll);
        assert_eq!(body.config.substitute_code, Some(63));
        // Unset fields keep their defaults
        assert_eq!(body.config.resolution, 96);
        assert_eq!(body.config.texture_size, 256);

        let mono = &manifest.fonts[1];
        assert_eq!(mono.config.tab_width, Some(32.0));
        assert_eq!(mono.config.texture_size, 512);
    }

    #[test]
    fn test_default_font_falls_back_to_first() {
        let manifest = FontManifest::from_toml(
            r#"
            [[font]]
            name = "Only"
            source = "only.ttf"
            "#,
        )
        .unwrap();
        assert_eq!(manifest.default_font_name(), Some("Only"));
        assert!(manifest.search_paths.is_empty());

        let empty = FontManifest::from_toml("").unwrap();
        assert_eq!(empty.default_font_name(), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = FontManifest::from_toml(
            r#"
            [[font]]
            name = "A"
            [[font]]
            name = "A"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_name_rejected() {
        assert!(FontManifest::from_toml("[[font]]\nsource = \"x.ttf\"\n").is_err());
    }

    #[test]
    fn test_round_trip() {
        let manifest = FontManifest::from_toml(MANIFEST).unwrap();
        let text = manifest.to_toml().unwrap();
        let parsed = FontManifest::from_toml(&text).unwrap();
        assert_eq!(parsed.fonts[1].config, manifest.fonts[1].config);
        assert_eq!(parsed.default_font, manifest.default_font);
    }

    #[test]
    fn test_starter_manifest() {
        let manifest = FontManifest::starter("Body", "DejaVuSans.ttf");
        let parsed = FontManifest::from_toml(&manifest.to_toml().unwrap()).unwrap();

        assert_eq!(parsed.default_font_name(), Some("Body"));
        assert_eq!(parsed.search_paths, vec![PathBuf::from(".")]);
        assert_eq!(parsed.fonts.len(), 1);
        assert_eq!(parsed.fonts[0].config.source, "DejaVuSans.ttf");
        assert_eq!(parsed.fonts[0].config.size, 12.0);
        assert!(parsed.fonts[0].config.antialias);
    }

    #[test]
    fn test_load_reports_path() {
        let err = FontManifest::load(Path::new("/nonexistent/scribe.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/scribe.toml"));
    }
}
