//! The label parser: a two-state machine (top level ⇄ in field) over the
//! tokenized command stream.
//!
//! Commands validate themselves at construction; any structural violation
//! aborts the whole parse — there is no partially-usable document. Unknown
//! opcodes never abort: they are kept as permanently-failing placeholders.

use tracing::warn;

use crate::command::{Command, CommandKind, field::FieldBuilder};
use crate::error::ParseError;
use crate::graphic::{decode_graphic, parse_graphic};
use crate::grammar::lexer::{split_commands, split_labels};
use crate::label::{CommandRange, Label, Stream};

/// Parse a whole input blob into a [`Stream`] of labels.
///
/// Each `^XA ... ^XZ` envelope becomes one label; the stream is valid iff
/// it is non-empty and every label parsed cleanly.
pub fn parse_stream(input: &str) -> Result<Stream, ParseError> {
    let mut labels = Vec::new();
    for body in split_labels(input) {
        labels.push(parse_label(body)?);
    }
    Ok(Stream::new(labels))
}

/// Parse one label body (the text between `^XA` and `^XZ`).
pub fn parse_label(body: &str) -> Result<Label, ParseError> {
    let commands = split_commands(body)?;
    LabelParser::new().run(&commands)
}

// ── State machine ───────────────────────────────────────────────────────

struct LabelParser {
    label: Label,
    /// `Some` while between `^FO` and `^FS` — the `InField` state.
    field: Option<FieldBuilder>,
    /// Open section: `name[,predicate]` spec text and its start index.
    section: Option<(String, usize)>,
}

impl LabelParser {
    fn new() -> Self {
        Self {
            label: Label::new(),
            field: None,
            section: None,
        }
    }

    fn run(mut self, commands: &[&str]) -> Result<Label, ParseError> {
        for cmd in commands {
            self.dispatch(cmd)?;
        }
        if self.field.take().is_some() {
            // A field left open at label end is not a structural error;
            // its commands are discarded.
            warn!("field left open at label end; its commands are discarded");
        }
        self.close_section(None)?;
        self.label.mark_valid();
        Ok(self.label)
    }

    fn dispatch(&mut self, cmd: &str) -> Result<(), ParseError> {
        // The single-letter `A` shorthand claims every command starting
        // with 'A'; it is only meaningful inside a field.
        if cmd.starts_with('A') {
            if self.field.is_none() {
                return Err(ParseError::FieldRequired {
                    opcode: "Ax".to_string(),
                });
            }
            self.push_in_field(Command::font(cmd, true));
            return Ok(());
        }

        let Some(opcode) = cmd.get(0..2) else {
            return Err(ParseError::InvalidOpcode {
                opcode: cmd.to_string(),
            });
        };

        match opcode {
            // Comment: valid in either scope.
            "FX" => self.push_either(Command::comment(cmd)),

            // Symbol types: field only.
            "BC" | "BE" | "BO" | "BQ" | "BU" | "BX" => {
                self.require_field(opcode)?;
                let command = Command::symbol(cmd, opcode)?;
                self.push_in_field(command);
            }

            // Module size: applies to the active collection.
            "BY" => self.push_either(Command::module_size(cmd)),

            // Default font: field-local override or label-level default.
            "CF" => self.push_either(Command::font(cmd, false)),

            "FO" => {
                if self.field.is_some() {
                    return Err(ParseError::FieldInvalid {
                        opcode: "FO".to_string(),
                    });
                }
                self.field = Some(FieldBuilder::open(cmd)?);
            }

            "FS" => {
                let builder = self.field.take().ok_or(ParseError::FieldRequired {
                    opcode: "FS".to_string(),
                })?;
                self.label.push(builder.close());
            }

            "FR" | "FB" => {
                self.require_field(opcode)?;
                self.push_in_field(Command::modifier(cmd, opcode));
            }

            "FD" => {
                self.require_field(opcode)?;
                self.push_in_field(Command::field_data(cmd));
            }

            "GB" | "GC" | "GD" | "GE" => {
                self.require_field(opcode)?;
                let command = Command::shape(cmd, opcode)?;
                self.push_in_field(command);
            }

            "GF" => {
                self.require_field(opcode)?;
                let command = Command::graphic(cmd);
                self.warm_bitmap_cache(&command);
                self.push_in_field(command);
            }

            "PO" => {
                self.require_top_level(opcode)?;
                let command = Command::print_orientation(cmd)?;
                self.label.push(command);
            }

            "PQ" => {
                self.require_top_level(opcode)?;
                self.label.push(Command::print_quantity(cmd));
            }

            "PW" => {
                self.require_top_level(opcode)?;
                let command = Command::print_width(cmd)?;
                self.label.push(command);
            }

            "SN" => {
                self.require_field(opcode)?;
                self.push_in_field(Command::serial_data(cmd));
            }

            // Section separator (non-standard extension).
            "--" => {
                if self.field.is_some() {
                    return Err(ParseError::SectionInField);
                }
                let spec = cmd[2..].trim();
                self.close_section((!spec.is_empty()).then(|| spec.to_string()))?;
            }

            _ => {
                if !cmd.trim().is_empty() {
                    self.push_either(Command::unknown(cmd, opcode));
                }
            }
        }
        Ok(())
    }

    /// Close the currently open named section (if any), then open `next`.
    fn close_section(&mut self, next: Option<String>) -> Result<(), ParseError> {
        if let Some((spec, start)) = self.section.take() {
            let range = CommandRange::from_spec(start, self.label.commands().len(), &spec)?;
            self.label.push_section(range);
        }
        if let Some(spec) = next {
            self.section = Some((spec, self.label.commands().len()));
        }
        Ok(())
    }

    /// Decode a non-templated `^GF` payload into the label's bitmap cache.
    ///
    /// A malformed payload is not a parse abort — the failure surfaces as
    /// an error outcome when the command is drawn.
    fn warm_bitmap_cache(&mut self, command: &Command) {
        let CommandKind::Graphic { hash: Some(hash) } = command.kind() else {
            return;
        };
        if self.label.bitmaps().contains(*hash) {
            return;
        }
        match parse_graphic(command.raw()) {
            Ok(def) => {
                self.label.bitmaps_mut().insert(*hash, decode_graphic(&def));
            }
            Err(err) => {
                warn!(error = %err, "malformed ^GF payload; deferring failure to render");
            }
        }
    }

    fn require_field(&self, opcode: &str) -> Result<(), ParseError> {
        if self.field.is_none() {
            return Err(ParseError::FieldRequired {
                opcode: opcode.to_string(),
            });
        }
        Ok(())
    }

    fn require_top_level(&self, opcode: &str) -> Result<(), ParseError> {
        if self.field.is_some() {
            return Err(ParseError::FieldInvalid {
                opcode: opcode.to_string(),
            });
        }
        Ok(())
    }

    fn push_in_field(&mut self, command: Command) {
        let Some(builder) = self.field.as_mut() else {
            unreachable!("push_in_field outside a field — dispatch guard missing");
        };
        builder.push(command);
    }

    /// Append to the open field if one exists, otherwise to the label.
    fn push_either(&mut self, command: Command) {
        match self.field.as_mut() {
            Some(builder) => builder.push(command),
            None => self.label.push(command),
        }
    }
}
