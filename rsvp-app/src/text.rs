use ab_glyph::{Font, FontVec, Glyph, GlyphId, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{Pixmap, PremultipliedColorU8};
use tracing::info;

/// Common system locations tried when the config names no font.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Rasterizes single lines of text straight into the frame pixmap.
pub struct TextPainter {
    font: FontVec,
}

impl TextPainter {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => FONT_SEARCH_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .context("no usable font found; set font_path in the app config")?,
        };
        let data =
            fs::read(&path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| anyhow!("invalid font file {}", path.display()))?;
        info!(font = %path.display(), "font loaded");
        Ok(Self { font })
    }

    pub fn line_width(&self, text: &str, px: f32) -> f32 {
        let sf = self.font.as_scaled(PxScale::from(px));
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = prev {
                width += sf.kern(prev, id);
            }
            width += sf.h_advance(id);
            prev = Some(id);
        }
        width
    }

    pub fn line_height(&self, px: f32) -> f32 {
        let sf = self.font.as_scaled(PxScale::from(px));
        sf.height() + sf.line_gap()
    }

    /// Draw one line with its horizontal center at `center_x` and its
    /// baseline at `baseline_y`, alpha-blended over the (opaque) canvas.
    pub fn draw_centered(
        &self,
        canvas: &mut Pixmap,
        text: &str,
        px: f32,
        center_x: f32,
        baseline_y: f32,
        color: [u8; 4],
    ) {
        let scale = PxScale::from(px);
        let sf = self.font.as_scaled(scale);

        let mut pen_x = center_x - self.line_width(text, px) / 2.0;
        let mut glyphs = Vec::<Glyph>::new();
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = prev {
                pen_x += sf.kern(prev, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline_y),
            });
            pen_x += sf.h_advance(id);
            prev = Some(id);
        }

        let width = canvas.width() as i32;
        let height = canvas.height() as i32;
        let stride = canvas.width() as usize;
        let dst = canvas.pixels_mut();

        for glyph in glyphs {
            let Some(outline) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x >= width || y >= height {
                    return;
                }
                let alpha = (coverage * color[3] as f32 / 255.0).clamp(0.0, 1.0);
                if alpha <= f32::EPSILON {
                    return;
                }
                let i = y as usize * stride + x as usize;
                let bg = dst[i];
                let inv = 1.0 - alpha;
                let r = (color[0] as f32 * alpha + bg.red() as f32 * inv) as u8;
                let g = (color[1] as f32 * alpha + bg.green() as f32 * inv) as u8;
                let b = (color[2] as f32 * alpha + bg.blue() as f32 * inv) as u8;
                dst[i] = PremultipliedColorU8::from_rgba(r, g, b, 255).unwrap_or(bg);
            });
        }
    }
}
