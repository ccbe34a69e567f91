//! The command model: a closed tagged union over every supported opcode.
//!
//! Each command is immutable after construction and carries its opcode,
//! its raw parameter text, and a templated flag detected once via the
//! placeholder pattern test. Structural validation happens in the
//! constructors — a violation is the parser's only abort path.
//!
//! The uniform capability surface (`draw`, `write_zpl`,
//! `template_content`) is dispatched by `match` over [`CommandKind`];
//! drawing lives in [`crate::render`].

pub mod field;

use std::collections::BTreeMap;

pub use field::{Field, FieldOrigin, WritingMode};

use crate::error::ParseError;
use crate::graphic::content_hash;
use crate::template::{
    Substitutions, TemplateField, TemplateKind, has_placeholder, placeholder_id,
};

/// Barcode/2D-code symbologies selected by the symbol-type opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Symbology {
    /// `^BC` — Code 128 (bit-exact runs).
    Code128,
    /// `^BE` / `^BU` — EAN-13 / UPC-A (bit-exact runs).
    Ean13,
    /// `^BQ` — QR code (structural placeholder).
    QrCode,
    /// `^BX` — Data Matrix (structural placeholder).
    DataMatrix,
    /// `^BO` — Aztec (structural placeholder).
    Aztec,
}

/// Field modifier commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `^FR` — invert field color against what is already drawn.
    Reverse,
    /// `^FB` — switch the field's writing mode to a wrapped block.
    Block,
}

/// Basic shape commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `^GB` — box.
    Box,
    /// `^GC` — circle.
    Circle,
    /// `^GD` — diagonal line.
    Diagonal,
    /// `^GE` — ellipse.
    Ellipse,
}

/// The variant payload of a [`Command`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CommandKind {
    /// A closed `^FO ... ^FS` field with its children.
    Field(Field),
    /// `^FD` — field data.
    FieldData,
    /// `^SN` — serial data (accepted, drawn as a successful no-op).
    SerialData,
    /// `^A` shorthand or `^CF` — font selection.
    Font,
    /// `^BY` — module width/ratio/height defaults.
    ModuleSize,
    /// A symbol-type command.
    Symbol(Symbology),
    /// `^FR` / `^FB`.
    Modifier(Modifier),
    /// `^GB` / `^GC` / `^GD` / `^GE`.
    Shape(Shape),
    /// `^GF` — graphics field. `hash` is the payload content hash, absent
    /// when the payload is templated.
    Graphic {
        /// Content hash of the non-templated payload.
        hash: Option<u32>,
    },
    /// `^FX` — comment.
    Comment,
    /// `^PQ` — print quantity.
    PrintQuantity,
    /// `^PW` — print width.
    PrintWidth,
    /// `^PO` — print orientation.
    PrintOrientation,
    /// Any other opcode: kept, but permanently fails to draw.
    Unknown,
}

/// One parsed command: opcode, raw parameter text, templated flag, variant.
#[derive(Debug, Clone)]
pub struct Command {
    opcode: String,
    raw: String,
    templated: bool,
    kind: CommandKind,
}

impl Command {
    fn new(opcode: &str, raw: &str, kind: CommandKind) -> Self {
        Self {
            opcode: opcode.to_string(),
            raw: raw.to_string(),
            templated: has_placeholder(raw),
            kind,
        }
    }

    // ── Constructors (one per opcode family) ────────────────────────────

    /// `^A` shorthand (`shorthand = true`) or `^CF`.
    pub(crate) fn font(cmd: &str, shorthand: bool) -> Self {
        if shorthand {
            Self::new("A", cmd[1..].trim_end(), CommandKind::Font)
        } else {
            Self::new("CF", cmd[2..].trim_end(), CommandKind::Font)
        }
    }

    /// `^BY`.
    pub(crate) fn module_size(cmd: &str) -> Self {
        Self::new("BY", cmd[2..].trim_end(), CommandKind::ModuleSize)
    }

    /// `^BC` / `^BE` / `^BU` / `^BQ` / `^BX` / `^BO`.
    pub(crate) fn symbol(cmd: &str, opcode: &str) -> Result<Self, ParseError> {
        let (symbology, max_params) = match opcode {
            "BC" => (Symbology::Code128, 6),
            "BE" | "BU" => (Symbology::Ean13, 6),
            "BQ" => (Symbology::QrCode, 5),
            "BX" => (Symbology::DataMatrix, 8),
            "BO" => (Symbology::Aztec, 6),
            _ => unreachable!("symbol() called with non-symbol opcode {opcode}"),
        };
        let raw = cmd[2..].trim_end();
        require_params(opcode, raw, 0, max_params)?;
        Ok(Self::new(opcode, raw, CommandKind::Symbol(symbology)))
    }

    /// `^FR` / `^FB`.
    pub(crate) fn modifier(cmd: &str, opcode: &str) -> Self {
        let modifier = if opcode == "FR" {
            Modifier::Reverse
        } else {
            Modifier::Block
        };
        Self::new(opcode, &cmd[2..], CommandKind::Modifier(modifier))
    }

    /// `^GB` / `^GC` / `^GD` / `^GE`.
    pub(crate) fn shape(cmd: &str, opcode: &str) -> Result<Self, ParseError> {
        let shape = match opcode {
            "GB" => Shape::Box,
            "GC" => Shape::Circle,
            "GD" => Shape::Diagonal,
            "GE" => Shape::Ellipse,
            _ => unreachable!("shape() called with non-shape opcode {opcode}"),
        };
        let raw = cmd[2..].trim_end();
        if shape == Shape::Box {
            require_params(opcode, raw, 2, 5)?;
        }
        Ok(Self::new(opcode, raw, CommandKind::Shape(shape)))
    }

    /// `^FD`. Raw text is kept verbatim — whitespace is data.
    pub(crate) fn field_data(cmd: &str) -> Self {
        Self::new("FD", &cmd[2..], CommandKind::FieldData)
    }

    /// `^SN`.
    pub(crate) fn serial_data(cmd: &str) -> Self {
        Self::new("SN", &cmd[2..], CommandKind::SerialData)
    }

    /// `^GF`. Computes the payload content hash unless templated.
    pub(crate) fn graphic(cmd: &str) -> Self {
        let raw = &cmd[2..];
        let hash = (!has_placeholder(raw)).then(|| content_hash(raw));
        Self::new("GF", raw, CommandKind::Graphic { hash })
    }

    /// `^FX`.
    pub(crate) fn comment(cmd: &str) -> Self {
        Self::new("FX", cmd[2..].trim_end(), CommandKind::Comment)
    }

    /// `^PQ`.
    pub(crate) fn print_quantity(cmd: &str) -> Self {
        Self::new("PQ", cmd[2..].trim_end(), CommandKind::PrintQuantity)
    }

    /// `^PW`. The parameter must be all digits or a placeholder.
    pub(crate) fn print_width(cmd: &str) -> Result<Self, ParseError> {
        let raw = cmd[2..].trim_end();
        require_params("PW", raw, 1, 1)?;
        let param = raw.trim();
        let digits = !param.is_empty() && param.bytes().all(|b| b.is_ascii_digit());
        if !digits && !has_placeholder(param) {
            return Err(ParseError::InvalidWidth {
                raw: param.to_string(),
            });
        }
        Ok(Self::new("PW", raw, CommandKind::PrintWidth))
    }

    /// `^PO`. The parameter must be `N` or `I`.
    pub(crate) fn print_orientation(cmd: &str) -> Result<Self, ParseError> {
        let raw = cmd[2..].trim_end();
        require_params("PO", raw, 1, 1)?;
        let param = raw.trim();
        if !(param == "N" || param == "I") {
            return Err(ParseError::InvalidOrientation {
                raw: cmd.to_string(),
            });
        }
        Ok(Self::new("PO", raw, CommandKind::PrintOrientation))
    }

    /// Any unrecognized opcode. Parsing keeps it; drawing always fails.
    pub(crate) fn unknown(cmd: &str, opcode: &str) -> Self {
        Self::new(opcode, cmd[opcode.len()..].trim_end(), CommandKind::Unknown)
    }

    /// A closed field from [`field::FieldBuilder`]; the templated flag was
    /// frozen as the OR of the children.
    pub(crate) fn closed_field(raw: String, templated: bool, field: Field) -> Self {
        Self {
            opcode: "FO".to_string(),
            raw,
            templated,
            kind: CommandKind::Field(field),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The opcode, without the `^` marker.
    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    /// Raw parameter text as written (opcode stripped).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the raw text (or, for a field, any child) carries a
    /// placeholder.
    pub fn is_templated(&self) -> bool {
        self.templated
    }

    /// The variant payload.
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// The command as source text, `^` marker included.
    pub fn text(&self) -> String {
        format!("^{}{}", self.opcode, self.raw)
    }

    /// Comma-separated parameters, whitespace-trimmed.
    pub(crate) fn params(&self) -> impl Iterator<Item = &str> {
        self.raw.split(',').map(str::trim)
    }

    // ── Template content ────────────────────────────────────────────────

    /// The template descriptor for this command alone (fields aggregate
    /// through [`Command::collect_template_fields`]).
    pub fn template_content(&self) -> Option<TemplateField> {
        if !self.templated {
            return None;
        }
        let id = placeholder_id(&self.raw)?;
        let kind = match self.kind {
            CommandKind::PrintQuantity | CommandKind::PrintWidth => TemplateKind::Number,
            CommandKind::Graphic { .. } => TemplateKind::Image,
            _ => TemplateKind::Text,
        };
        Some(TemplateField {
            id: id.to_string(),
            kind,
        })
    }

    /// Collect template descriptors into `out`, descending into fields.
    pub(crate) fn collect_template_fields(&self, out: &mut BTreeMap<String, TemplateField>) {
        match &self.kind {
            CommandKind::Field(field) => {
                for child in field.children() {
                    child.collect_template_fields(out);
                }
            }
            _ => {
                if let Some(descriptor) = self.template_content() {
                    out.insert(descriptor.id.clone(), descriptor);
                }
            }
        }
    }

    // ── Stringification ─────────────────────────────────────────────────

    /// Write the command back as text. Templated commands resolve through
    /// the substitution map with literal fallback; a field re-wraps its
    /// children between `^FO<x>,<y>` and `^FS` with the global offset
    /// applied.
    pub(crate) fn write_zpl(&self, out: &mut String, subs: &Substitutions, offsets: [i32; 3]) {
        match &self.kind {
            CommandKind::Field(field) => {
                let [x, y, _] = field.origin().adjusted(offsets);
                out.push_str("^FO");
                out.push_str(&x.to_string());
                out.push(',');
                out.push_str(&y.to_string());
                for child in field.children() {
                    child.write_zpl(out, subs, offsets);
                }
                out.push_str("^FS");
            }
            _ => {
                out.push('^');
                out.push_str(&self.opcode);
                let text = if self.templated {
                    subs.resolve(&self.raw)
                } else {
                    &self.raw
                };
                out.push_str(text);
            }
        }
    }
}

/// Enforce parameter-count bounds the way the grammar counts them: the raw
/// text split on commas, an empty text counting as one empty parameter.
fn require_params(opcode: &str, raw: &str, min: usize, max: usize) -> Result<(), ParseError> {
    let count = raw.split(',').count();
    if count < min || count > max {
        return Err(ParseError::ParameterCount {
            opcode: opcode.to_string(),
            raw: raw.to_string(),
        });
    }
    Ok(())
}
