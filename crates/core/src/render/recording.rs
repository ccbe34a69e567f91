//! A recording [`Surface`]: captures draw calls instead of rasterizing.
//!
//! Used for dry-run rendering and tests. Text metrics follow a fixed
//! monospace model — advance width is half the font size per character,
//! line height equals the font size — so layout decisions are
//! deterministic without a font backend.

use serde::Serialize;

use crate::graphic::Bitmap;
use crate::render::surface::{
    CompositeMode, Surface, TextAlign, TextBaseline, TextMetrics, font_px,
};

/// One captured drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCall {
    /// A filled rectangle.
    FillRect {
        /// Anchor x.
        x: f64,
        /// Anchor y.
        y: f64,
        /// Width (negative extends left).
        w: f64,
        /// Height (negative extends up).
        h: f64,
    },
    /// A stroked rectangle outline.
    StrokeRect {
        /// Anchor x.
        x: f64,
        /// Anchor y.
        y: f64,
        /// Width.
        w: f64,
        /// Height.
        h: f64,
        /// Stroke line width.
        line_width: f64,
    },
    /// A filled text run.
    FillText {
        /// The text drawn.
        text: String,
        /// Anchor x.
        x: f64,
        /// Anchor y.
        y: f64,
    },
    /// A bitmap blit.
    DrawBitmap {
        /// Bitmap width in pixels.
        width: u32,
        /// Bitmap height in pixels.
        height: u32,
        /// Top-left x.
        x: f64,
        /// Top-left y.
        y: f64,
    },
    /// A transform translation.
    Translate {
        /// Horizontal shift.
        dx: f64,
        /// Vertical shift.
        dy: f64,
    },
    /// A transform rotation.
    Rotate {
        /// Clockwise angle in radians.
        radians: f64,
    },
}

/// A surface that records draw calls.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    calls: Vec<DrawCall>,
    font: String,
    font_stretch: String,
    composite: CompositeMode,
    align: TextAlign,
    baseline: TextBaseline,
}

impl RecordingSurface {
    /// Create a surface with canvas-like defaults.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            font: "10px sans-serif".to_string(),
            font_stretch: "normal".to_string(),
            composite: CompositeMode::SourceOver,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
        }
    }

    /// The captured draw calls, in order.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Consume the surface, yielding the captured calls.
    pub fn into_calls(self) -> Vec<DrawCall> {
        self.calls
    }

    /// The current font stretch.
    pub fn font_stretch(&self) -> &str {
        &self.font_stretch
    }

    /// The current text alignment.
    pub fn text_align(&self) -> TextAlign {
        self.align
    }

    /// The current text baseline.
    pub fn text_baseline(&self) -> TextBaseline {
        self.baseline
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for RecordingSurface {
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(DrawCall::FillRect { x, y, w, h });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, line_width: f64) {
        self.calls.push(DrawCall::StrokeRect {
            x,
            y,
            w,
            h,
            line_width,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.calls.push(DrawCall::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn measure_text(&mut self, text: &str) -> TextMetrics {
        let size = font_px(&self.font);
        TextMetrics {
            width: text.chars().count() as f64 * size / 2.0,
            descent_height: size,
        }
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, x: f64, y: f64) {
        self.calls.push(DrawCall::DrawBitmap {
            width: bitmap.width(),
            height: bitmap.height(),
            x,
            y,
        });
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.calls.push(DrawCall::Translate { dx, dy });
    }

    fn rotate(&mut self, radians: f64) {
        self.calls.push(DrawCall::Rotate { radians });
    }

    fn font(&self) -> String {
        self.font.clone()
    }

    fn set_font(&mut self, font: &str) {
        self.font = font.to_string();
    }

    fn set_font_stretch(&mut self, stretch: &str) {
        self.font_stretch = stretch.to_string();
    }

    fn composite_mode(&self) -> CompositeMode {
        self.composite
    }

    fn set_composite_mode(&mut self, mode: CompositeMode) {
        self.composite = mode;
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }
}
