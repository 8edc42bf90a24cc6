//! Scribe CLI
//!
//! Inspect font atlases and text layouts from a font manifest.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_text::{
    BreakPolicy, FontId, FontManager, HeadlessBackend, LayoutOptions, LineEntry, PixelFormat,
    TextLayoutEngine, TrueTypeFont,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::FontManifest;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scribe glyph atlas and text layout tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize text and write every atlas page as PNG
    Atlas {
        /// Font manifest
        manifest: PathBuf,

        /// Font name (default font when omitted)
        #[arg(short, long)]
        font: Option<String>,

        /// Text to rasterize
        #[arg(short, long)]
        text: String,

        /// Output directory
        #[arg(short, long, default_value = "atlas")]
        out: PathBuf,
    },

    /// Lay out text and print the lines
    Layout {
        /// Font manifest
        manifest: PathBuf,

        /// Font name (default font when omitted)
        #[arg(short, long)]
        font: Option<String>,

        /// Text to lay out
        #[arg(short, long)]
        text: String,

        /// Wrap width in pixels
        #[arg(short, long)]
        width: Option<f32>,

        /// Where lines may break (whitespace, unicode)
        #[arg(long, default_value = "whitespace")]
        break_policy: String,
    },

    /// List the fonts of a manifest with their metrics
    Info {
        /// Font manifest
        manifest: PathBuf,
    },

    /// Write a starter manifest for one font file
    Init {
        /// Font file, relative to the manifest directory
        source: String,

        /// Manifest to create
        #[arg(short, long, default_value = "scribe.toml")]
        manifest: PathBuf,

        /// Font name
        #[arg(short, long, default_value = "Default")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Atlas {
            manifest,
            font,
            text,
            out,
        } => cmd_atlas(&manifest, font.as_deref(), &text, &out),

        Commands::Layout {
            manifest,
            font,
            text,
            width,
            break_policy,
        } => cmd_layout(&manifest, font.as_deref(), &text, width, &break_policy),

        Commands::Info { manifest } => cmd_info(&manifest),

        Commands::Init {
            source,
            manifest,
            name,
        } => cmd_init(&manifest, &name, &source),
    }
}

/// Load every font of a manifest
fn load_fonts(path: &Path, backend: &mut HeadlessBackend) -> Result<FontManager> {
    let manifest = FontManifest::load(path)?;
    if manifest.fonts.is_empty() {
        anyhow::bail!("{} declares no fonts", path.display());
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut fonts = FontManager::with_source(manifest.source(base));
    if let Some(name) = manifest.default_font_name() {
        fonts.set_default_font(name);
    }

    for entry in &manifest.fonts {
        let id = fonts.load_font(&entry.name, entry.config.clone(), backend);
        if fonts.font(id).is_some_and(|font| !font.is_loaded()) {
            warn!("Font '{}' failed to load", entry.name);
        }
    }

    Ok(fonts)
}

fn resolve_font(fonts: &FontManager, name: Option<&str>) -> Result<FontId> {
    let id = fonts
        .get_by_name(name.unwrap_or(""))
        .context("No such font and no default font")?;
    let font = fonts.font(id).context("Stale font id")?;
    if !font.is_loaded() {
        anyhow::bail!("Font '{}' is not usable", font.name());
    }
    Ok(id)
}

fn cmd_atlas(manifest: &Path, font: Option<&str>, text: &str, out: &Path) -> Result<()> {
    let mut backend = HeadlessBackend::new();
    let mut fonts = load_fonts(manifest, &mut backend)?;
    let id = resolve_font(&fonts, font)?;

    let report = fonts.prepare_string(id, text);
    let uploaded = fonts.flush(&mut backend).context("Failed to upload atlas pages")?;
    info!(
        "Rasterized {} glyph(s), uploaded {} page(s)",
        report.rasterized, uploaded
    );

    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let font = fonts.font(id).context("Stale font id")?;
    let Some(atlas) = font.atlas() else {
        return Ok(());
    };

    for page in atlas.pages() {
        let texture = font
            .page_texture(page.id())
            .and_then(|texture| backend.texture(texture))
            .with_context(|| format!("Page {} was never uploaded", page.id().index()))?;

        let path = out.join(format!("{}_page{}.png", font.name(), page.id().index()));
        write_png(&path, texture.width, texture.height, texture.format, &texture.pixels)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
    pixels: &[u8],
) -> Result<()> {
    let result = match format {
        Some(PixelFormat::LuminanceAlpha8) => {
            image::GrayAlphaImage::from_raw(width, height, pixels.to_vec()).map(|img| img.save(path))
        }
        Some(PixelFormat::Rgba8) => {
            image::RgbaImage::from_raw(width, height, pixels.to_vec()).map(|img| img.save(path))
        }
        None => None,
    };

    result
        .with_context(|| format!("Texture data does not match {}x{}", width, height))?
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn cmd_layout(
    manifest: &Path,
    font: Option<&str>,
    text: &str,
    width: Option<f32>,
    break_policy: &str,
) -> Result<()> {
    let break_policy: BreakPolicy = break_policy.parse().map_err(anyhow::Error::msg)?;

    let mut backend = HeadlessBackend::new();
    let mut fonts = load_fonts(manifest, &mut backend)?;
    let id = resolve_font(&fonts, font)?;
    fonts.prepare_string(id, text);

    let font = fonts.font(id).context("Stale font id")?;
    let options = LayoutOptions {
        max_width: width,
        break_policy,
        ..LayoutOptions::default()
    };
    let layout = TextLayoutEngine::layout(text, font, &options);

    println!(
        "{} line(s), {}x{} px, line height {}",
        layout.lines.len(),
        layout.width,
        layout.height,
        layout.line_height
    );
    for (row, line) in layout.lines.iter().enumerate() {
        let content: String = line
            .entries
            .iter()
            .map(|entry| match entry {
                LineEntry::Glyph(glyph) => glyph.ch.escape_debug().to_string(),
                LineEntry::Colour(colour) => format!(
                    "<#{:02X}{:02X}{:02X}>",
                    (colour.r * 255.0).round() as u8,
                    (colour.g * 255.0).round() as u8,
                    (colour.b * 255.0).round() as u8
                ),
            })
            .collect();
        println!(
            "{:>3}  top {:>6}  offset {:>6}  width {:>7}{}  |{}|",
            row,
            line.top,
            line.offset,
            line.width,
            if line.auto_wrap { " wrap" } else { "     " },
            content
        );
    }

    Ok(())
}

fn cmd_info(manifest: &Path) -> Result<()> {
    let mut backend = HeadlessBackend::new();
    let fonts = load_fonts(manifest, &mut backend)?;

    println!("Default font: {}", fonts.default_font());
    println!();
    for (_, font) in fonts.fonts() {
        print_font(font);
    }

    Ok(())
}

fn cmd_init(manifest: &Path, name: &str, source: &str) -> Result<()> {
    if manifest.exists() {
        anyhow::bail!("{} already exists", manifest.display());
    }

    FontManifest::starter(name, source).save(manifest)?;
    info!("Wrote {}", manifest.display());
    info!("Run `scribe info {}` to check the font", manifest.display());
    Ok(())
}

fn print_font(font: &TrueTypeFont) {
    let config = font.config();
    println!("{}", font.name());
    println!("  source:     {}", config.source);
    println!("  size:       {}pt @ {} dpi", config.size, config.resolution);

    let Some(metrics) = font.metrics() else {
        println!("  status:     failed to load");
        println!();
        return;
    };

    println!("  height:     {} (ascent {}, descent {})", metrics.default_height, metrics.ascent, metrics.descent);
    println!("  space:      {}", metrics.space_width);
    println!("  tab:        {}", metrics.tab_width);
    println!("  format:     {:?}", metrics.format);
    if let Some(substitute) = font.substitute() {
        println!("  substitute: {:?}", substitute);
    }
    println!("  glyphs:     {}", font.glyph_count());
    if let Some(atlas) = font.atlas() {
        println!("  pages:      {} x {}px", atlas.page_count(), atlas.page_size());
    }
    println!();
}
