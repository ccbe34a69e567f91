//! Render-call-scoped configuration state.
//!
//! One [`FieldConfig`] lives for the duration of a single render call and
//! is threaded explicitly through every draw — never stored globally.
//! Symbol options, block size, and text rotation are cleared at the end of
//! every field; module defaults from `^BY` persist until the render call
//! ends.

use crate::command::Symbology;
use crate::render::surface::Surface;

/// Active symbol-type configuration, set by a `^B?` command and consumed
/// by the deferred field-data draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SymbolOptions {
    /// Which symbology to render.
    pub symbology: Symbology,
    /// Symbol height in dots, when the command carries one.
    pub height: Option<u32>,
    /// Print-interpretation-line flag (`Y`/`N`); anything but `N` prints.
    pub line: Option<char>,
    /// Print-interpretation-line-above flag.
    pub line_above: Option<char>,
    /// Row count for Data Matrix sizing.
    pub rows: Option<u32>,
}

/// `^FB` block bounds: width in dots and maximum line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSize {
    pub w: u32,
    pub h: u32,
}

/// Text rotation from a font command's orientation letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Rotation {
    /// `N` — normal.
    #[default]
    Normal,
    /// `R` — rotated 90° clockwise.
    Right,
    /// `I` — inverted 180°.
    Inverted,
    /// `B` — bottom-up reading, 270°.
    Bottom,
}

impl Rotation {
    pub(crate) fn from_letter(letter: char) -> Self {
        match letter {
            'R' => Rotation::Right,
            'I' => Rotation::Inverted,
            'B' => Rotation::Bottom,
            _ => Rotation::Normal,
        }
    }

    /// Bracket a text draw: compose the rotation onto the surface
    /// transform around the text box `(x, y, w, h)`.
    pub(crate) fn apply(self, surface: &mut dyn Surface, x: f64, y: f64, w: f64, h: f64) {
        use std::f64::consts::PI;
        match self {
            Rotation::Normal => {}
            Rotation::Right => {
                surface.translate(x, y);
                surface.rotate(PI / 2.0);
                surface.translate(-x, -y - h);
            }
            Rotation::Inverted => {
                surface.translate(x, y);
                surface.rotate(PI);
                surface.translate(-x - w, -y - h);
            }
            Rotation::Bottom => {
                surface.translate(x, y);
                surface.rotate(PI * 1.5);
                surface.translate(-x - w, -y);
            }
        }
    }

    /// Exactly reverse [`Rotation::apply`] so later draws are unaffected.
    pub(crate) fn reset(self, surface: &mut dyn Surface, x: f64, y: f64, w: f64, h: f64) {
        use std::f64::consts::PI;
        match self {
            Rotation::Normal => {}
            Rotation::Right => {
                surface.translate(x, y + h);
                surface.rotate(-PI / 2.0);
                surface.translate(-x, -y);
            }
            Rotation::Inverted => {
                surface.translate(x + w, y + h);
                surface.rotate(-PI);
                surface.translate(-x, -y);
            }
            Rotation::Bottom => {
                surface.translate(x + w, y);
                surface.rotate(PI * -1.5);
                surface.translate(-x, -y);
            }
        }
    }
}

/// The transient, render-call-scoped configuration store.
///
/// `^BY` also carries a wide/narrow ratio parameter; none of the
/// supported symbologies consume it, so it is not held here.
#[derive(Debug, Default)]
pub(crate) struct FieldConfig {
    pub symbol: Option<SymbolOptions>,
    pub block: Option<BlockSize>,
    pub rotation: Rotation,
    pub module_width: Option<u32>,
    pub bar_height: Option<u32>,
}

impl FieldConfig {
    /// Drop the field-scoped entries at the end of a field. Module
    /// defaults from `^BY` survive until the render call ends.
    pub(crate) fn end_field(&mut self) {
        self.symbol = None;
        self.block = None;
        self.rotation = Rotation::Normal;
    }
}
