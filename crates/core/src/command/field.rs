//! Field container: a positioned group of commands bounded by `^FO`/`^FS`.

use crate::command::{Command, CommandKind};
use crate::error::ParseError;

/// A field's origin coordinates as written in the source — never offset.
///
/// The global offset is applied at render/stringify time only and does not
/// mutate stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOrigin {
    coords: [i32; 3],
}

impl FieldOrigin {
    pub(crate) fn new(x: i32, y: i32, z: i32) -> Self {
        Self { coords: [x, y, z] }
    }

    /// Stored x coordinate.
    pub fn x(&self) -> i32 {
        self.coords[0]
    }

    /// Stored y coordinate.
    pub fn y(&self) -> i32 {
        self.coords[1]
    }

    /// Stored z coordinate.
    pub fn z(&self) -> i32 {
        self.coords[2]
    }

    /// Position with the global offset applied to x and y; z is not
    /// translated.
    pub fn adjusted(&self, offsets: [i32; 3]) -> [i32; 3] {
        [
            self.coords[0] + offsets[0],
            self.coords[1] + offsets[1],
            self.coords[2],
        ]
    }
}

/// How field data text is laid out inside a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingMode {
    /// Single line at the origin.
    Inline,
    /// Word-wrapped within the `^FB` block bounds.
    Block,
}

/// A closed `^FO ... ^FS` field: an origin plus its ordered child commands.
///
/// Fields exist only fully formed — the parser assembles them through
/// [`FieldBuilder`] and the templated flag and writing mode freeze when the
/// builder closes.
#[derive(Debug, Clone)]
pub struct Field {
    origin: FieldOrigin,
    children: Vec<Command>,
    writing_mode: Option<WritingMode>,
    text_field: bool,
}

impl Field {
    /// The field origin as written in the source.
    pub fn origin(&self) -> &FieldOrigin {
        &self.origin
    }

    /// Child commands in source order.
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Layout mode, frozen at close. `None` for symbol fields.
    pub fn writing_mode(&self) -> Option<WritingMode> {
        self.writing_mode
    }

    /// Whether the field carries no symbol-type command.
    pub fn is_text_field(&self) -> bool {
        self.text_field
    }
}

/// Parser-internal accumulator for an open field.
///
/// This is the only way to construct a [`Field`], which guarantees the
/// close-once invariant: `close` consumes the builder.
#[derive(Debug)]
pub(crate) struct FieldBuilder {
    origin: FieldOrigin,
    raw: String,
    children: Vec<Command>,
}

impl FieldBuilder {
    /// Open a field from the text of a `^FO` command (opcode included).
    ///
    /// Requires 2–3 all-digit parameters (`x,y[,z]`).
    pub(crate) fn open(cmd: &str) -> Result<Self, ParseError> {
        let raw = &cmd[2..];
        let params: Vec<Option<i32>> = raw
            .split(',')
            .map(|p| {
                let p = p.trim();
                (!p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                    .then(|| p.parse().ok())
                    .flatten()
            })
            .collect();
        if !(2..=3).contains(&params.len()) || params.iter().any(Option::is_none) {
            return Err(ParseError::InvalidOrigin {
                raw: cmd.to_string(),
            });
        }
        let x = params[0].unwrap_or(0);
        let y = params[1].unwrap_or(0);
        let z = params.get(2).copied().flatten().unwrap_or(0);
        Ok(Self {
            origin: FieldOrigin::new(x, y, z),
            raw: raw.to_string(),
            children: Vec::new(),
        })
    }

    /// Append a child command.
    pub(crate) fn push(&mut self, command: Command) {
        self.children.push(command);
    }

    /// Close the field: freeze the templated flag (logical OR of the
    /// children) and the writing mode, and wrap into a [`Command`].
    pub(crate) fn close(self) -> Command {
        let templated = self.children.iter().any(Command::is_templated);
        let text_field = !self
            .children
            .iter()
            .any(|c| matches!(c.kind(), CommandKind::Symbol(_)));
        let writing_mode = text_field.then(|| {
            let block = self
                .children
                .iter()
                .any(|c| matches!(c.kind(), CommandKind::Modifier(super::Modifier::Block)));
            if block {
                WritingMode::Block
            } else {
                WritingMode::Inline
            }
        });
        Command::closed_field(
            self.raw,
            templated,
            Field {
                origin: self.origin,
                children: self.children,
                writing_mode,
                text_field,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_requires_two_or_three_numbers() {
        assert!(FieldBuilder::open("FO10,20").is_ok());
        assert!(FieldBuilder::open("FO10,20,1").is_ok());
        assert!(FieldBuilder::open("FO10").is_err());
        assert!(FieldBuilder::open("FO10,20,1,2").is_err());
        assert!(FieldBuilder::open("FO10,abc").is_err());
        assert!(FieldBuilder::open("FO").is_err());
    }

    #[test]
    fn origin_tolerates_parameter_whitespace() {
        let builder = FieldBuilder::open("FO10, 20\n").unwrap();
        assert_eq!(builder.origin.x(), 10);
        assert_eq!(builder.origin.y(), 20);
        assert_eq!(builder.origin.z(), 0);
    }

    #[test]
    fn adjusted_translates_x_and_y_only() {
        let origin = FieldOrigin::new(10, 20, 3);
        assert_eq!(origin.adjusted([5, -7, 9]), [15, 13, 3]);
    }

    #[test]
    fn empty_field_is_inline_text() {
        let field_cmd = FieldBuilder::open("FO1,2").unwrap().close();
        let CommandKind::Field(field) = field_cmd.kind() else {
            panic!("expected a field command");
        };
        assert!(field.is_text_field());
        assert_eq!(field.writing_mode(), Some(WritingMode::Inline));
        assert!(!field_cmd.is_templated());
    }
}
