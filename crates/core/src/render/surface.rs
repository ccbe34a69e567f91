//! The drawing-surface port consumed by the rendering interpreter.
//!
//! Modeled on a 2D canvas context: filled/stroked rectangles, filled text
//! with measurable metrics, bitmap blits, an affine transform composed of
//! translations and rotations, and a handful of string/flag properties.
//! The core never assumes a concrete backend; any renderer implementing
//! [`Surface`] works.

use crate::graphic::Bitmap;

/// Measured dimensions of a text run under the current font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Advance width in pixels.
    pub width: f64,
    /// Distance from the top baseline to the bottom of the em box —
    /// used as the line height for block layout.
    pub descent_height: f64,
}

/// Pixel composition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Draw over existing content.
    #[default]
    SourceOver,
    /// Invert against existing content (`^FR` field reverse).
    Xor,
}

/// Horizontal text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Anchor at the left edge of the run.
    #[default]
    Left,
    /// Anchor at the center of the run.
    Center,
}

/// Vertical text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    /// Anchor at the alphabetic baseline.
    #[default]
    Alphabetic,
    /// Anchor at the top of the em box.
    Top,
}

/// A 2D drawing surface.
///
/// Rectangle parameters follow canvas semantics: negative width/height
/// extend left/up from the anchor point. Transforms compose; the
/// interpreter always reverses its own transforms exactly, so a surface
/// only needs to apply them in order.
pub trait Surface {
    /// Fill a rectangle with the current ink.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    /// Stroke a rectangle outline with the given line width.
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, line_width: f64);

    /// Fill a text run anchored per the current alignment flags.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Measure a text run under the current font.
    fn measure_text(&mut self, text: &str) -> TextMetrics;

    /// Blit a decoded bitmap with its top-left corner at `(x, y)`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, x: f64, y: f64);

    /// Compose a translation onto the current transform.
    fn translate(&mut self, dx: f64, dy: f64);

    /// Compose a clockwise rotation (radians) onto the current transform.
    fn rotate(&mut self, radians: f64);

    /// The current font string (e.g. `"normal 36px monospace"`).
    fn font(&self) -> String;

    /// Replace the current font string.
    fn set_font(&mut self, font: &str);

    /// Set the font stretch (e.g. `"ultra-condensed"`).
    fn set_font_stretch(&mut self, stretch: &str);

    /// The current composition mode.
    fn composite_mode(&self) -> CompositeMode;

    /// Replace the composition mode.
    fn set_composite_mode(&mut self, mode: CompositeMode);

    /// Set horizontal text anchoring.
    fn set_text_align(&mut self, align: TextAlign);

    /// Set vertical text anchoring.
    fn set_text_baseline(&mut self, baseline: TextBaseline);
}

/// First integer embedded in a font string, or 20 when there is none —
/// the working text size used for layout math.
pub(crate) fn font_px(font: &str) -> f64 {
    let digits: String = font
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_px_finds_first_integer() {
        assert_eq!(font_px("normal 36px monospace"), 36.0);
        assert_eq!(font_px("10px sans-serif"), 10.0);
        assert_eq!(font_px("monospace"), 20.0);
    }
}
