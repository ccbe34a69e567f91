//! The rendering interpreter.
//!
//! Walks a label's command list, drives the barcode generator and the
//! graphics codec, and emits draw calls against a [`Surface`] plus one
//! [`Outcome`] per command. Failures are caught per command — a single bad
//! command never aborts the rest of the label or field.
//!
//! Within a field, children are evaluated in two passes: every command
//! except the field data runs first so configuration commands (font,
//! symbol type, block size) can populate the config store; the field data
//! runs last against the final configuration, regardless of where it
//! appeared in the source. This mirrors the protocol's real semantics.

pub(crate) mod context;
pub mod recording;
pub mod surface;
pub(crate) mod text;

use serde::Serialize;
use tracing::{debug, warn};

use crate::barcode;
use crate::command::{Command, CommandKind, Field, Modifier, Shape, Symbology, WritingMode};
use crate::error::RenderError;
use crate::graphic::{BitmapCache, content_hash, decode_graphic, parse_graphic};
use crate::render::context::{BlockSize, FieldConfig, Rotation, SymbolOptions};
use crate::render::surface::{CompositeMode, Surface, TextAlign, TextBaseline, font_px};
use crate::render::text::measure_text_block;
use crate::template::Substitutions;

/// Font applied to symbol fields that set no field-specific font.
const FALLBACK_SYMBOL_FONT: &str = "normal 36px monospace";

/// The result of drawing one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// The command as source text.
    pub command: String,
    /// Whether the draw succeeded.
    pub ok: bool,
    /// Failure reason when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Outcome {
    fn success(command: String) -> Self {
        Self {
            command,
            ok: true,
            reason: None,
        }
    }

    fn failure(command: String, reason: impl ToString) -> Self {
        Self {
            command,
            ok: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// State for one render call: substitutions, the label's bitmap cache,
/// and the transient config store.
pub(crate) struct RenderPass<'a> {
    pub(crate) subs: Substitutions,
    pub(crate) cache: &'a BitmapCache,
    pub(crate) cfg: FieldConfig,
}

/// Render a slice of top-level commands, flattening field outcomes.
pub(crate) fn render_commands(
    surface: &mut dyn Surface,
    commands: &[Command],
    pass: &mut RenderPass<'_>,
    offsets: [i32; 3],
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
        if let CommandKind::Field(field) = command.kind() {
            outcomes.extend(draw_field(command, field, surface, pass, offsets));
        } else {
            let result = draw_command(command, surface, pass, None);
            outcomes.push(outcome_of(command, result));
        }
    }
    outcomes
}

fn outcome_of(command: &Command, result: Result<(), RenderError>) -> Outcome {
    match result {
        Ok(()) => Outcome::success(command.text()),
        Err(err) => Outcome::failure(command.text(), err),
    }
}

// ── Field evaluation ────────────────────────────────────────────────────

fn draw_field(
    field_cmd: &Command,
    field: &Field,
    surface: &mut dyn Surface,
    pass: &mut RenderPass<'_>,
    offsets: [i32; 3],
) -> Vec<Outcome> {
    surface.set_text_baseline(TextBaseline::Top);
    let saved_composite = surface.composite_mode();
    let mut restore_font = surface.font();
    let mut has_field_font = false;
    let origin = field.origin().adjusted(offsets);
    let is_text = field.is_text_field();

    let mut outcomes = Vec::with_capacity(field.children().len() + 1);
    outcomes.push(Outcome::success(field_cmd.text()));
    let mut deferred: Option<(usize, &Command)> = None;

    // Pass 1: everything except the field data.
    for child in field.children() {
        if matches!(child.kind(), CommandKind::FieldData) {
            deferred = Some((outcomes.len(), child));
            outcomes.push(Outcome::success(child.text()));
            continue;
        }
        if matches!(child.kind(), CommandKind::Font) && child.opcode() == "CF" {
            // ^CF inside a field changes the label default font, but must
            // not leak into a symbol field's barcode-text measurement.
            let before = surface.font();
            let result = draw_command(child, surface, pass, Some(origin));
            restore_font = surface.font();
            if !is_text {
                surface.set_font(&before);
            }
            outcomes.push(outcome_of(child, result));
            continue;
        }
        let result = draw_command(child, surface, pass, Some(origin));
        if matches!(child.kind(), CommandKind::Font) && child.opcode() == "A" {
            has_field_font = true;
        }
        outcomes.push(outcome_of(child, result));
    }

    if !is_text && !has_field_font {
        surface.set_font(FALLBACK_SYMBOL_FONT);
    }

    // Pass 2: field data against the final configuration.
    if let Some((index, data)) = deferred {
        let block = if field.writing_mode() == Some(WritingMode::Block) {
            pass.cfg.block
        } else {
            None
        };
        let rotation = if is_text {
            pass.cfg.rotation
        } else {
            Rotation::Normal
        };
        let result = draw_field_data(data, surface, pass, origin, block, rotation);
        outcomes[index] = outcome_of(data, result);
    }

    surface.set_font(&restore_font);
    surface.set_composite_mode(saved_composite);
    pass.cfg.end_field();
    outcomes
}

// ── Per-command drawing ─────────────────────────────────────────────────

fn draw_command(
    command: &Command,
    surface: &mut dyn Surface,
    pass: &mut RenderPass<'_>,
    origin: Option<[i32; 3]>,
) -> Result<(), RenderError> {
    let origin = origin.unwrap_or([0, 0, 0]);
    match command.kind() {
        // Successful no-ops: accepted, nothing to draw.
        CommandKind::Comment
        | CommandKind::SerialData
        | CommandKind::PrintQuantity
        | CommandKind::PrintWidth
        | CommandKind::PrintOrientation => Ok(()),

        CommandKind::Unknown => {
            debug!(opcode = command.opcode(), raw = command.raw(), "unknown command drawn");
            Err(RenderError::UnknownCommand)
        }

        CommandKind::Font => {
            draw_font(command, surface, &mut pass.cfg);
            Ok(())
        }

        CommandKind::ModuleSize => {
            draw_module_size(command, &mut pass.cfg);
            Ok(())
        }

        CommandKind::Symbol(symbology) => {
            pass.cfg.symbol = Some(symbol_options(command, *symbology));
            Ok(())
        }

        CommandKind::Modifier(Modifier::Reverse) => {
            surface.set_composite_mode(CompositeMode::Xor);
            Ok(())
        }

        CommandKind::Modifier(Modifier::Block) => {
            let params: Vec<&str> = command.params().collect();
            pass.cfg.block = Some(BlockSize {
                w: params.first().and_then(|p| parse_u32(p)).unwrap_or(0),
                h: params.get(1).and_then(|p| parse_u32(p)).unwrap_or(1),
            });
            Ok(())
        }

        CommandKind::Shape(Shape::Box) => {
            draw_box(command, surface, origin);
            Ok(())
        }

        // Circle, diagonal, and ellipse are accepted without geometry.
        CommandKind::Shape(_) => Ok(()),

        CommandKind::Graphic { hash } => draw_graphic(command, *hash, surface, pass, origin),

        // Field data is drawn by the field's deferred pass; a field also
        // never reaches here (`render_commands` dispatches it).
        CommandKind::FieldData | CommandKind::Field(_) => Ok(()),
    }
}

fn draw_font(command: &Command, surface: &mut dyn Surface, cfg: &mut FieldConfig) {
    let mut params = command.params();
    let first = params.next().unwrap_or("");
    let height = params.next().and_then(parse_u32);

    let mut rotation = 'N';
    let helvetica = if command.opcode() == "A" {
        // Shorthand packs font id and orientation: ^A0N,36,36
        let mut chars = first.chars();
        let id = chars.next();
        if let Some(c) = chars.next()
            && matches!(c, 'B' | 'I' | 'N' | 'R')
        {
            rotation = c;
        }
        id == Some('0')
    } else {
        parse_u32(first) == Some(0)
    };

    let (family, stretch) = if helvetica {
        ("Helvetica", "ultra-condensed")
    } else {
        ("monospace", "normal")
    };
    if let Some(h) = height {
        surface.set_font(&format!("normal {h}px {family}"));
    }
    surface.set_font_stretch(stretch);
    cfg.rotation = Rotation::from_letter(rotation);
}

fn draw_module_size(command: &Command, cfg: &mut FieldConfig) {
    let params: Vec<&str> = command.params().collect();
    if let Some(w) = params.first().and_then(|p| parse_u32(p)).filter(|&w| w > 0) {
        cfg.module_width = Some(w);
    }
    // The second parameter is the wide/narrow ratio; no supported
    // symbology consumes it.
    if let Some(h) = params.get(2).and_then(|p| parse_u32(p)).filter(|&h| h > 0) {
        cfg.bar_height = Some(h);
    }
}

fn symbol_options(command: &Command, symbology: Symbology) -> SymbolOptions {
    let params: Vec<&str> = command.params().collect();
    match symbology {
        Symbology::Code128 | Symbology::Ean13 => SymbolOptions {
            symbology,
            height: params.get(1).and_then(|p| parse_u32(p)),
            line: params.get(2).and_then(|p| p.chars().next()),
            line_above: params.get(3).and_then(|p| p.chars().next()),
            rows: None,
        },
        Symbology::DataMatrix => SymbolOptions {
            symbology,
            height: params.get(1).and_then(|p| parse_u32(p)),
            line: None,
            line_above: None,
            rows: params.get(4).and_then(|p| parse_u32(p)),
        },
        Symbology::QrCode | Symbology::Aztec => SymbolOptions {
            symbology,
            height: None,
            line: None,
            line_above: None,
            rows: None,
        },
    }
}

fn draw_box(command: &Command, surface: &mut dyn Surface, origin: [i32; 3]) {
    let params: Vec<&str> = command.params().collect();
    let w = params.first().and_then(|p| parse_u32(p)).unwrap_or(0);
    let h = params.get(1).and_then(|p| parse_u32(p)).unwrap_or(0);
    let sw = params
        .get(2)
        .and_then(|p| parse_u32(p))
        .filter(|&t| t > 0)
        .unwrap_or(1);
    let x = f64::from(origin[0]);
    let y = f64::from(origin[1]);
    if sw < h / 2 || sw < w / 2 {
        // Outline inset by half the stroke so it stays inside the bounds.
        let half = f64::from(sw >> 1);
        surface.stroke_rect(
            x + half,
            y + half,
            f64::from(w) - f64::from(sw),
            f64::from(h) - f64::from(sw),
            f64::from(sw),
        );
    } else {
        // The stroke would cover the whole shape.
        surface.fill_rect(x, y, f64::from(w), f64::from(h));
    }
}

fn draw_graphic(
    command: &Command,
    hash: Option<u32>,
    surface: &mut dyn Surface,
    pass: &RenderPass<'_>,
    origin: [i32; 3],
) -> Result<(), RenderError> {
    let x = f64::from(origin[0]);
    let y = f64::from(origin[1]);
    let (hash, encoded) = if command.is_templated() {
        let image = pass
            .subs
            .image(command.raw())
            .ok_or(RenderError::UnboundImage)?;
        (image.hash, image.encoded.as_str())
    } else {
        (
            hash.unwrap_or_else(|| content_hash(command.raw())),
            command.raw(),
        )
    };

    if let Some(bitmap) = pass.cache.get(hash) {
        surface.draw_bitmap(&bitmap, x, y);
        return Ok(());
    }

    // The cache is warmed at parse time and image registration; reaching
    // this path means a caller skipped one of those steps.
    warn!(hash, "no cached bitmap for ^GF; decoding on demand");
    let bitmap = decode_graphic(&parse_graphic(encoded)?);
    surface.draw_bitmap(&bitmap, x, y);
    Ok(())
}

// ── Field data ──────────────────────────────────────────────────────────

fn draw_field_data(
    command: &Command,
    surface: &mut dyn Surface,
    pass: &RenderPass<'_>,
    origin: [i32; 3],
    block: Option<BlockSize>,
    rotation: Rotation,
) -> Result<(), RenderError> {
    let cfg = &pass.cfg;
    let mut y = f64::from(origin[1]);
    let mut text_x = f64::from(origin[0]);
    let text = pass.subs.resolve(command.raw());
    let skip_draw = text.starts_with("${");

    if skip_draw {
        // Unbound placeholder: no symbol, but keep the literal text where
        // the human-readable line would have been.
        if let Some(sym) = &cfg.symbol {
            y += f64::from(sym.height.or(cfg.bar_height).unwrap_or(10));
            text_x += f64::from(cfg.module_width.unwrap_or(2) >> 1);
        }
    } else if let Some(sym) = &cfg.symbol {
        let (w, h) = render_symbol(surface, sym, cfg, origin, text)?;
        if !matches!(sym.symbology, Symbology::Code128 | Symbology::Ean13) {
            // Only the linear symbologies print their text.
            return Ok(());
        }
        y += h + 10.0;
        text_x += w / 2.0;
        surface.set_text_align(TextAlign::Center);
    }

    if cfg.symbol.as_ref().and_then(|s| s.line) != Some('N') {
        if let Some(block) = block {
            let layout = measure_text_block(surface, block, text);
            let top = y;
            let total = layout.lines.len() as f64 * layout.line_height;
            rotation.apply(surface, text_x, top, f64::from(block.w), total);
            for line in &layout.lines {
                surface.fill_text(line, text_x, y);
                y += layout.line_height;
            }
            rotation.reset(surface, text_x, top, f64::from(block.w), total);
        } else {
            let measured = surface.measure_text(text);
            rotation.apply(surface, text_x, y, measured.width, measured.descent_height);
            surface.fill_text(text, text_x, y);
            rotation.reset(surface, text_x, y, measured.width, measured.descent_height);
        }
    }

    if cfg.symbol.as_ref().and_then(|s| s.line_above) == Some('Y') {
        let size = font_px(&surface.font());
        surface.fill_text(text, text_x, f64::from(origin[1]) - size);
    }

    surface.set_text_align(TextAlign::Left);
    Ok(())
}

// ── Symbol rendering ────────────────────────────────────────────────────

/// Draw a symbol at the field origin; returns its `(width, height)`.
///
/// Code128 and EAN-13/UPC-A are bit-exact through the pattern generator.
/// QR, Data Matrix, and Aztec render structural placeholders sized from
/// the configured height and module count.
fn render_symbol(
    surface: &mut dyn Surface,
    sym: &SymbolOptions,
    cfg: &FieldConfig,
    origin: [i32; 3],
    text: &str,
) -> Result<(f64, f64), RenderError> {
    let x = f64::from(origin[0]);
    let y = f64::from(origin[1]);
    let module = f64::from(cfg.module_width.unwrap_or(2));
    let height = f64::from(sym.height.or(cfg.bar_height).unwrap_or(10));

    match sym.symbology {
        Symbology::Code128 => {
            let runs = barcode::code128_runs(text);
            draw_runs(surface, &runs, x, y, module, height);
            Ok((f64::from(barcode::run_span(&runs)) * module, height))
        }
        Symbology::Ean13 => {
            let runs = barcode::ean13_runs(text)?;
            draw_runs(surface, &runs, x, y, module, height);
            // An EAN-13 symbol always spans 95 modules.
            Ok((f64::from(barcode::EAN13_MODULES) * module, height))
        }
        Symbology::QrCode | Symbology::Aztec => {
            surface.fill_rect(x, y, height, height);
            Ok((height, height))
        }
        Symbology::DataMatrix => Ok(draw_datamatrix(surface, sym, cfg, x, y, text)),
    }
}

/// Draw alternating bar/space runs (bars at even indices) left to right.
fn draw_runs(surface: &mut dyn Surface, runs: &[u8], x0: f64, y: f64, module: f64, height: f64) {
    let mut x = x0;
    let mut i = 0;
    while i < runs.len() {
        let bar = f64::from(runs[i]) * module;
        surface.fill_rect(x, y, bar, height);
        let space = runs
            .get(i + 1)
            .map_or(0.0, |&r| f64::from(r) * module);
        x += bar + space;
        i += 2;
    }
}

/// Structurally approximate Data Matrix: solid "L" finder on the left and
/// bottom edges, dashed pattern on the top and right.
fn draw_datamatrix(
    surface: &mut dyn Surface,
    sym: &SymbolOptions,
    cfg: &FieldConfig,
    x: f64,
    y: f64,
    text: &str,
) -> (f64, f64) {
    let required = datamatrix_modules(text.chars().count());
    let rows = sym.rows.filter(|&r| r > 0).unwrap_or(required);
    let module = match sym.height.filter(|&h| h > 0) {
        Some(h) => f64::from(h),
        None => {
            let size = cfg.bar_height.unwrap_or(10);
            (f64::from(size) / f64::from(rows)).floor().max(1.0)
        }
    };
    let side = module * f64::from(rows);

    surface.fill_rect(x, y, module, side);
    surface.fill_rect(x + module, y + side, side - module, -module);
    let mut i = i64::from(rows) - 1;
    while i > 1 {
        let fi = i as f64;
        surface.fill_rect(x + fi * module, y, -module, module);
        surface.fill_rect(x + side, y + (fi - 1.0) * module, -module, -module);
        i -= 2;
    }
    (side, side)
}

/// Approximate symbol size in modules for a payload length — close enough
/// for placeholder geometry.
fn datamatrix_modules(len: usize) -> u32 {
    const MAX_DATA: [usize; 9] = [3, 5, 8, 12, 18, 22, 30, 36, 44];
    for (i, &cap) in MAX_DATA.iter().enumerate() {
        if len <= cap {
            return 8 + (i as u32) * 2 + 2;
        }
    }
    8 + 2
}

fn parse_u32(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::render::recording::RecordingSurface;

    #[test]
    fn module_size_updates_typed_defaults() {
        let mut cfg = FieldConfig::default();
        draw_module_size(&Command::module_size("BY3,2,80"), &mut cfg);
        assert_eq!(cfg.module_width, Some(3));
        assert_eq!(cfg.bar_height, Some(80));
    }

    #[test]
    fn partial_module_size_keeps_earlier_values() {
        let mut cfg = FieldConfig::default();
        draw_module_size(&Command::module_size("BY2,3,40"), &mut cfg);
        draw_module_size(&Command::module_size("BY4"), &mut cfg);
        assert_eq!(cfg.module_width, Some(4));
        assert_eq!(cfg.bar_height, Some(40));
    }

    #[test]
    fn module_size_ignores_non_numeric_parameters() {
        let mut cfg = FieldConfig::default();
        draw_module_size(&Command::module_size("BYx,y,z"), &mut cfg);
        assert_eq!(cfg.module_width, None);
        assert_eq!(cfg.bar_height, None);
    }

    #[test]
    fn end_field_clears_field_scope_but_keeps_module_defaults() {
        let mut cfg = FieldConfig::default();
        draw_module_size(&Command::module_size("BY3,2,80"), &mut cfg);
        cfg.rotation = Rotation::Right;
        cfg.block = Some(BlockSize { w: 10, h: 2 });
        cfg.symbol = Some(symbol_options(
            &Command::symbol("BCN,50", "BC").unwrap(),
            Symbology::Code128,
        ));
        cfg.end_field();
        assert!(cfg.symbol.is_none());
        assert!(cfg.block.is_none());
        assert_eq!(cfg.rotation, Rotation::Normal);
        assert_eq!(cfg.module_width, Some(3));
        assert_eq!(cfg.bar_height, Some(80));
    }

    #[test]
    fn font_command_sets_family_stretch_and_rotation() {
        let mut cfg = FieldConfig::default();
        let mut surface = RecordingSurface::new();
        draw_font(&Command::font("A0B,28,28", true), &mut surface, &mut cfg);
        assert_eq!(surface.font(), "normal 28px Helvetica");
        assert_eq!(surface.font_stretch(), "ultra-condensed");
        assert_eq!(cfg.rotation, Rotation::Bottom);

        draw_font(&Command::font("CFA,20", false), &mut surface, &mut cfg);
        assert_eq!(surface.font(), "normal 20px monospace");
        assert_eq!(surface.font_stretch(), "normal");
        assert_eq!(cfg.rotation, Rotation::Normal);
    }

    #[test]
    fn font_without_height_keeps_the_current_font() {
        let mut cfg = FieldConfig::default();
        let mut surface = RecordingSurface::new();
        draw_font(&Command::font("A0N", true), &mut surface, &mut cfg);
        assert_eq!(surface.font(), "10px sans-serif");
    }
}
