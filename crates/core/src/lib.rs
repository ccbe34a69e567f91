//! zpl-preview core library.
//!
//! Parses a subset of ZPL II label code into a structured document, then
//! either renders the document onto a pluggable 2D drawing surface or
//! serializes it back to text — with `${placeholder}` template
//! substitution and predicate-gated section rendering along the way.
//!
//! The main entry points are [`parse_stream`] / [`parse_label`] for
//! parsing, [`Label::render`] for drawing, and [`Label::stringify`] for
//! text reconstruction.

#![warn(missing_docs)]

/// Code128 and EAN-13/UPC-A run-length pattern generation.
pub mod barcode;
/// The command model: tagged union over all supported opcodes.
pub mod command;
/// Error taxonomy: parse aborts vs per-command render failures.
pub mod error;
/// Envelope/command tokenizer and the label parser.
pub mod grammar;
/// Monochrome graphics codec, content hashing, bitmap cache.
pub mod graphic;
/// The label document and streams of labels.
pub mod label;
/// The rendering interpreter and its surface port.
pub mod render;
/// Template placeholders, values, and section predicates.
pub mod template;

// ── Convenience re-exports ──────────────────────────────────────────────
// Flat imports for the common entry points; full module paths remain
// available for everything else.

// Parser
pub use grammar::parser::{parse_label, parse_stream};

// Document model
pub use command::{Command, CommandKind, Field, FieldOrigin, Symbology, WritingMode};
pub use label::{CommandRange, Label, Stream};

// Errors
pub use error::{ParseError, RenderError, StringifyError};

// Rendering
pub use render::Outcome;
pub use render::recording::{DrawCall, RecordingSurface};
pub use render::surface::{CompositeMode, Surface, TextAlign, TextBaseline, TextMetrics};

// Graphics
pub use graphic::{
    Bitmap, BitmapCache, BitmapDecoder, CodecDecoder, ImageAsset, ImageFormatError,
};

// Templates
pub use template::{Expression, TemplateField, TemplateKind, TemplateValue, TemplateValues};
