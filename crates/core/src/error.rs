//! Error taxonomy for the preview pipeline.
//!
//! Three families, mirroring how failures propagate:
//!
//! - [`ParseError`] — structural errors that abort the whole parse and yield
//!   no partially-usable document.
//! - [`RenderError`] — per-command failures caught by the interpreter and
//!   converted into error outcomes; sibling commands still execute.
//! - [`StringifyError`] — precondition violations on serialization.
//!
//! Malformed `^GF` payloads are covered by
//! [`ImageFormatError`](crate::graphic::ImageFormatError), which converts
//! into a [`RenderError`] — an image problem is never a parse abort.

use crate::barcode::BarcodeError;
use crate::graphic::ImageFormatError;

/// A structural error that aborts parsing.
///
/// Every variant retains the offending opcode or source text for diagnostics.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Label body text does not begin with a `^` command marker.
    #[error("invalid data at [0]: {snippet:?}")]
    InvalidStart {
        /// The first few characters of the offending body.
        snippet: String,
    },

    /// A `^` marker appeared less than two characters after the previous one.
    #[error("invalid command start marker \"^\" at: {context:?}")]
    MarkerTooClose {
        /// Source text around the offending marker.
        context: String,
    },

    /// The label body ends on a `^` marker with no command after it.
    #[error("leftover command start marker \"^\" at offset {offset}")]
    DanglingMarker {
        /// Byte offset of the dangling marker.
        offset: usize,
    },

    /// A command opcode shorter than two characters (and not the `A`
    /// shorthand) was encountered.
    #[error("invalid command - must be either \"A\" or 2 characters - found \"^{opcode}\"")]
    InvalidOpcode {
        /// The rejected opcode text.
        opcode: String,
    },

    /// A field-scoped command appeared outside a `^FO` field.
    #[error("command ^{opcode} is invalid outside of a ^FO field")]
    FieldRequired {
        /// Opcode of the offending command.
        opcode: String,
    },

    /// A label-scoped command appeared inside a `^FO` field.
    #[error("command ^{opcode} cannot be used inside a ^FO field")]
    FieldInvalid {
        /// Opcode of the offending command.
        opcode: String,
    },

    /// A section separator (`--`) appeared inside a field.
    #[error("section separators are only supported at top level")]
    SectionInField,

    /// A command carried fewer or more parameters than its grammar allows.
    #[error("invalid parameter count in \"^{opcode}{raw}\"")]
    ParameterCount {
        /// Opcode of the offending command.
        opcode: String,
        /// Raw parameter text as written.
        raw: String,
    },

    /// `^FO` origin parameters were missing or non-numeric.
    #[error("invalid ^FO command: {raw:?}")]
    InvalidOrigin {
        /// Raw parameter text as written.
        raw: String,
    },

    /// `^PO` carried a value other than `N` or `I`.
    #[error("invalid parameter in \"^PO\" command - expected either \"I\" or \"N\" - found {raw:?}")]
    InvalidOrientation {
        /// Raw parameter text as written.
        raw: String,
    },

    /// `^PW` carried a value that is neither digits nor a placeholder.
    #[error("invalid parameter in \"^PW\" command - expected number - found {raw:?}")]
    InvalidWidth {
        /// Raw parameter text as written.
        raw: String,
    },

    /// A section range closed with a start index past its end index.
    #[error("invalid section range {start}..{end}")]
    InvalidRange {
        /// First command index of the range.
        start: usize,
        /// One-past-last command index of the range.
        end: usize,
    },
}

/// A recoverable, per-command rendering failure.
///
/// The interpreter catches these and converts them into error outcomes; a
/// single bad command never aborts the rest of the label or field.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The command's opcode is not part of the supported grammar.
    #[error("unknown command")]
    UnknownCommand,

    /// A templated image placeholder had no bound value.
    #[error("templated image is undefined")]
    UnboundImage,

    /// A `^GF` payload could not be decoded.
    #[error(transparent)]
    ImageFormat(#[from] ImageFormatError),

    /// Barcode input rejected by the pattern generator.
    #[error(transparent)]
    Barcode(#[from] BarcodeError),
}

/// Serialization was requested on a document that cannot produce one.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StringifyError {
    /// The label did not parse cleanly; there is no valid text form.
    #[error("invalid label can't be stringified")]
    InvalidLabel,
}
