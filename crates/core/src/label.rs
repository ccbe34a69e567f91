//! The label document: command sequence, section ranges, template
//! registry, bitmap cache, and global offset.

use std::collections::BTreeMap;

use crate::command::Command;
use crate::error::{ParseError, StringifyError};
use crate::graphic::{BitmapCache, BitmapDecoder, ImageFormatError};
use crate::render::{Outcome, RenderPass, render_commands, surface::Surface};
use crate::template::{
    Expression, Substitutions, TemplateField, TemplateValue, TemplateValues,
};

/// A named, optionally predicated, contiguous slice of a label's top-level
/// command list.
#[derive(Debug, Clone)]
pub struct CommandRange {
    start: usize,
    end: usize,
    name: String,
    predicate: Option<Expression>,
}

impl CommandRange {
    /// Build a range from a separator spec (`name[,predicate]`).
    pub(crate) fn from_spec(start: usize, end: usize, spec: &str) -> Result<Self, ParseError> {
        if start > end {
            return Err(ParseError::InvalidRange { start, end });
        }
        let (name, predicate) = match spec.split_once(',') {
            Some((name, predicate)) => (name, Some(Expression::parse(predicate))),
            None => (spec, None),
        };
        Ok(Self {
            start,
            end,
            name: name.to_string(),
            predicate,
        })
    }

    /// An implicit unnamed range covering a gap; always matches.
    fn implicit(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            name: "<root>".to_string(),
            predicate: None,
        }
    }

    /// First command index covered.
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last command index covered.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The section name (`<root>` for implicit gap ranges).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the predicate against the supplied values. A range without
    /// a predicate always matches.
    pub fn matches(&self, values: &TemplateValues) -> bool {
        self.predicate.as_ref().is_none_or(|p| p.matches(values))
    }
}

/// One printable document bounded by `^XA ... ^XZ`.
#[derive(Debug, Clone, Default)]
pub struct Label {
    commands: Vec<Command>,
    sections: Vec<CommandRange>,
    bitmaps: BitmapCache,
    offsets: [i32; 3],
    valid: bool,
}

impl Label {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub(crate) fn push_section(&mut self, range: CommandRange) {
        self.sections.push(range);
    }

    pub(crate) fn mark_valid(&mut self) {
        self.valid = true;
    }

    pub(crate) fn bitmaps_mut(&mut self) -> &mut BitmapCache {
        &mut self.bitmaps
    }

    /// The top-level command list, in source order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The named section ranges, in declaration order.
    pub fn sections(&self) -> &[CommandRange] {
        &self.sections
    }

    /// The content-addressed cache of decoded bitmaps.
    pub fn bitmaps(&self) -> &BitmapCache {
        &self.bitmaps
    }

    /// Evict a decoded bitmap by content hash.
    pub fn forget_bitmap(&mut self, hash: u32) -> bool {
        self.bitmaps.forget(hash)
    }

    /// Whether parsing completed without a structural error.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The render-time global offset `(x, y, z)`.
    pub fn global_offset(&self) -> (i32, i32, i32) {
        (self.offsets[0], self.offsets[1], self.offsets[2])
    }

    /// Partially update the global offset; unspecified axes are retained.
    ///
    /// The offset translates field origins at render/stringify time only —
    /// stored coordinates never change.
    pub fn set_global_offset(&mut self, x: Option<i32>, y: Option<i32>, z: Option<i32>) {
        if let Some(x) = x {
            self.offsets[0] = x;
        }
        if let Some(y) = y {
            self.offsets[1] = y;
        }
        if let Some(z) = z {
            self.offsets[2] = z;
        }
    }

    /// Every distinct template placeholder in the label, keyed by
    /// identifier.
    pub fn template_fields(&self) -> BTreeMap<String, TemplateField> {
        let mut out = BTreeMap::new();
        for command in &self.commands {
            command.collect_template_fields(&mut out);
        }
        out
    }

    /// Decode and register the bitmaps for every image-kind value, through
    /// the supplied decoder port.
    ///
    /// This is the only suspension point around rendering: the synchronous
    /// render pass itself never awaits. Already-cached hashes are skipped,
    /// so identical encodings share one decoded bitmap.
    pub async fn register_images(
        &mut self,
        values: &TemplateValues,
        decoder: &dyn BitmapDecoder,
    ) -> Result<(), ImageFormatError> {
        for (_, value) in values.iter() {
            let TemplateValue::Image(asset) = value else {
                continue;
            };
            if self.bitmaps.contains(asset.content_hash()) {
                continue;
            }
            let bitmap = decoder.decode(asset.encoded()).await?;
            self.bitmaps.insert(asset.content_hash(), bitmap);
        }
        Ok(())
    }

    /// The auto-completed range set: declared sections in order, with any
    /// index gap covered by an implicit always-matching range.
    pub fn auto_ranges(&self) -> Vec<CommandRange> {
        let mut ranges = Vec::new();
        let mut at = 0usize;
        for range in &self.sections {
            if at < range.start {
                ranges.push(CommandRange::implicit(at, range.start));
            }
            at = range.end;
            ranges.push(range.clone());
        }
        if at < self.commands.len() {
            ranges.push(CommandRange::implicit(at, self.commands.len()));
        }
        ranges
    }

    /// Render the label onto a surface, substituting `values`.
    ///
    /// When sections exist, ranges whose predicate rejects `values` are
    /// skipped. Returns one outcome per drawn command, with fields
    /// expanding to one outcome plus one per child.
    pub fn render(&self, surface: &mut dyn Surface, values: &TemplateValues) -> Vec<Outcome> {
        let mut pass = RenderPass {
            subs: Substitutions::for_render(values),
            cache: &self.bitmaps,
            cfg: Default::default(),
        };
        if self.sections.is_empty() {
            return render_commands(surface, &self.commands, &mut pass, self.offsets);
        }
        let mut outcomes = Vec::new();
        for range in self.auto_ranges() {
            if range.start >= range.end || !range.matches(values) {
                continue;
            }
            outcomes.extend(render_commands(
                surface,
                &self.commands[range.start..range.end],
                &mut pass,
                self.offsets,
            ));
        }
        outcomes
    }

    /// Reconstruct the label's text, substituting `values` and mirroring
    /// [`Label::render`]'s range filtering.
    ///
    /// Fails fast when the label is not valid.
    pub fn stringify(&self, values: &TemplateValues) -> Result<String, StringifyError> {
        if !self.valid {
            return Err(StringifyError::InvalidLabel);
        }
        let subs = Substitutions::for_stringify(values);
        let mut body = String::new();
        let write_slice = |body: &mut String, commands: &[Command]| {
            for command in commands {
                if !body.is_empty() {
                    body.push('\n');
                }
                command.write_zpl(body, &subs, self.offsets);
            }
        };
        if self.sections.is_empty() {
            write_slice(&mut body, &self.commands);
        } else {
            for range in self.auto_ranges() {
                if !range.matches(values) {
                    continue;
                }
                write_slice(&mut body, &self.commands[range.start..range.end]);
            }
        }
        if body.is_empty() {
            return Ok("^XA\n^XZ".to_string());
        }
        Ok(format!("^XA\n{body}\n^XZ"))
    }
}

/// An ordered list of labels parsed from one input blob.
#[derive(Debug, Clone, Default)]
pub struct Stream {
    labels: Vec<Label>,
}

impl Stream {
    pub(crate) fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// The parsed labels, in input order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Mutable access to the parsed labels (offset updates, image
    /// registration).
    pub fn labels_mut(&mut self) -> &mut [Label] {
        &mut self.labels
    }

    /// Valid iff non-empty and every label is valid.
    pub fn is_valid(&self) -> bool {
        !self.labels.is_empty() && self.labels.iter().all(Label::is_valid)
    }
}

impl IntoIterator for Stream {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.into_iter()
    }
}
