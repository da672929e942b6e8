//! Title rasterization with fontdue

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use tracing::debug;

use crate::common::color::Argb;

use super::discovery::select_font;

/// Rasterized text as premultiplied BGRA rows (ARGB32 in little-endian memory)
#[derive(Debug, Default)]
pub struct RenderedText {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RenderedText {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A pixel of `color` at `coverage`, premultiplied, in BGRA byte order
fn shade(color: Argb, coverage: u8) -> [u8; 4] {
    let alpha = color.alpha as u32 * coverage as u32 / 255;
    let channel = |v: u8| (v as u32 * alpha / 255) as u8;
    [channel(color.blue), channel(color.green), channel(color.red), alpha as u8]
}

#[derive(Debug)]
pub struct TitleFont {
    font: Font,
    family: String,
    size: f32,
}

impl TitleFont {
    pub fn from_path(path: &Path, family: String, size: f32) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("Failed to read font file: {}", path.display()))?;
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font file '{}': {}", path.display(), e))?;
        debug!(path = %path.display(), family = %family, size, "Loaded title font");
        Ok(Self { font, family, size })
    }

    /// Loads the first installed candidate, falling back to a generic family
    pub fn resolve(candidates: &[&str], fallback: &str, size: f32) -> Result<Self> {
        let found = select_font(candidates, fallback)?;
        Self::from_path(&found.path, found.family, size)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Renders `text` on one line; glyphs that would start past `max_width` are dropped
    pub fn render(&self, text: &str, color: Argb, max_width: usize) -> RenderedText {
        let mut glyphs = Vec::new();
        let mut pen = 0.0f32;
        let mut ascent = 0i32;
        let mut descent = 0i32;

        for ch in text.chars() {
            if pen as usize >= max_width {
                break;
            }
            let (metrics, bitmap) = self.font.rasterize(ch, self.size);
            ascent = ascent.max(metrics.height as i32 + metrics.ymin);
            descent = descent.max(-metrics.ymin);
            glyphs.push((pen as i32 + metrics.xmin, metrics, bitmap));
            pen += metrics.advance_width;
        }

        let width = (pen.ceil() as usize).min(max_width);
        let height = (ascent + descent).max(0) as usize;
        if width == 0 || height == 0 {
            return RenderedText::default();
        }

        let mut data = vec![0u8; width * height * 4];
        for (left, metrics, bitmap) in glyphs {
            let top = ascent - (metrics.height as i32 + metrics.ymin);
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let (px, py) = (left + gx as i32, top + gy as i32);
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let idx = (py as usize * width + px as usize) * 4;
                    data[idx..idx + 4].copy_from_slice(&shade(color, coverage));
                }
            }
        }

        RenderedText { width, height, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::title;

    #[test]
    fn test_shade_premultiplies() {
        let white = Argb::new(255, 255, 255, 255);
        assert_eq!(shade(white, 255), [255, 255, 255, 255]);
        assert_eq!(shade(white, 0), [0, 0, 0, 0]);

        let half_red = Argb::new(128, 255, 0, 0);
        assert_eq!(shade(half_red, 255), [0, 0, 128, 128]);
    }

    #[test]
    fn test_render_fits_width() {
        let Ok(font) = TitleFont::resolve(title::FONT_CANDIDATES, title::FALLBACK_FAMILY, title::FONT_SIZE)
        else {
            return;
        };
        let full = font.render("Notepad - notes.txt", title::COLOR, 1000);
        assert!(!full.is_empty());
        assert_eq!(full.data.len(), full.width * full.height * 4);
        assert!(full.data.chunks(4).any(|px| px[3] > 0));

        let clipped = font.render("Notepad - notes.txt", title::COLOR, 40);
        assert!(clipped.width <= 40);
        assert!(clipped.width < full.width);
        assert_eq!(clipped.data.len(), clipped.width * clipped.height * 4);
    }

    #[test]
    fn test_empty_title_renders_nothing() {
        let Ok(font) = TitleFont::resolve(title::FONT_CANDIDATES, title::FALLBACK_FAMILY, title::FONT_SIZE)
        else {
            return;
        };
        assert!(font.render("", title::COLOR, 400).is_empty());
        assert!(font.render("Notepad", title::COLOR, 0).is_empty());
    }
}
