//! Text measurement used to size columns and rows.
//!
//! Widths are estimated from the average glyph width of a fixed reference
//! font instead of shaping the text: ASCII characters count one glyph,
//! anything else two.

/// Average glyph width, in pixels, of the reference font.
pub const REFERENCE_GLYPH_PX: f64 = 6.0;
/// Added to every measured width so text does not touch the cell border.
pub const WIDTH_PADDING: f64 = 0.1;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.7;

/// Glyph metrics of the reference font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    avg_glyph_px: f64,
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self::new(REFERENCE_GLYPH_PX)
    }
}

impl GlyphMetrics {
    pub fn new(avg_glyph_px: f64) -> Self {
        Self { avg_glyph_px }
    }

    /// Rendered width of the widest line of `text`, in whole pixels.
    pub fn text_width_px(&self, text: &str) -> f64 {
        text.split('\n')
            .map(|line| {
                line.chars()
                    .map(|ch| {
                        if ch.is_ascii() {
                            self.avg_glyph_px
                        } else {
                            self.avg_glyph_px * 2.0
                        }
                    })
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
            .trunc()
    }

    /// Width of `text` in Excel character units, padding included.
    pub fn char_units(&self, text: &str) -> f64 {
        self.text_width_px(text) / self.avg_glyph_px + WIDTH_PADDING
    }
}

/// Number of newline-delimited segments in `text`; an empty string is one line.
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Height in points required by `lines` lines of text at `font_size`.
pub fn text_height(lines: usize, font_size: f64) -> f64 {
    lines as f64 * font_size * LINE_HEIGHT_FACTOR
}

/// Pixel width of a column `width` character units wide.
pub fn col_to_px(width: f64) -> u32 {
    (width * 7.0 + 5.0) as u32
}

/// Pixel height of a row `height` points tall.
pub fn row_to_px(height: f64) -> u32 {
    (height * 96.0 / 72.0) as u32
}
