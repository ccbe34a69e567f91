//! Interpreter behavior: outcome reporting, deferred field data, symbol
//! geometry, graphics, sections, and the global offset.

mod common;

use common::{failures, label};
use zpl_preview_core::{
    CodecDecoder, CompositeMode, DrawCall, ImageAsset, RecordingSurface, Surface,
    TemplateValues, parse_label,
};

fn fill_rects(calls: &[DrawCall]) -> Vec<(f64, f64, f64, f64)> {
    calls
        .iter()
        .filter_map(|c| match c {
            DrawCall::FillRect { x, y, w, h } => Some((*x, *y, *w, *h)),
            _ => None,
        })
        .collect()
}

fn texts(calls: &[DrawCall]) -> Vec<(&str, f64, f64)> {
    calls
        .iter()
        .filter_map(|c| match c {
            DrawCall::FillText { text, x, y } => Some((text.as_str(), *x, *y)),
            _ => None,
        })
        .collect()
}

// ── Outcomes ────────────────────────────────────────────────────────────

#[test]
fn fields_expand_to_one_outcome_plus_children() {
    let l = label("^PQ1^FO1,1^A0N,20,20^FDhi^FS^PW100");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    // ^PQ, field (1 + 2 children), ^PW
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.len() >= l.commands().len());
    assert!(outcomes.iter().all(|o| o.ok));
    assert_eq!(outcomes[1].command, "^FO1,1");
}

#[test]
fn unknown_command_fails_without_aborting() {
    let l = label("^QQ1^PQ1");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].ok);
    assert_eq!(outcomes[0].reason.as_deref(), Some("unknown command"));
    assert!(outcomes[1].ok);
}

#[test]
fn outcomes_serialize_for_external_consumers() {
    let l = label("^QQ1^PQ1");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    let json = serde_json::to_value(&outcomes).unwrap();
    assert_eq!(json[0]["ok"], false);
    assert_eq!(json[0]["reason"], "unknown command");
    // Successful outcomes omit the reason key entirely.
    assert_eq!(json[1], serde_json::json!({"command": "^PQ1", "ok": true}));
}

#[test]
fn bad_command_inside_field_keeps_siblings() {
    // 5 digits is not a valid EAN payload; the sibling outcomes survive.
    let l = label("^FO0,0^BEN,40^FD12345^FS^PQ1");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert_eq!(outcomes.len(), 4);
    let failed = failures(&outcomes);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].command, "^FD12345");
    assert_eq!(
        failed[0].reason.as_deref(),
        Some("input is not valid EAN-13 or UPC-A")
    );
    assert!(outcomes[3].ok, "^PQ after the field still renders");
}

// ── Text fields ─────────────────────────────────────────────────────────

#[test]
fn inline_text_draws_at_the_adjusted_origin() {
    let l = label("^FO10,20^FDhi^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(texts(surface.calls()), vec![("hi", 10.0, 20.0)]);
}

#[test]
fn field_data_is_drawn_against_the_final_configuration() {
    // The font command comes after ^FD in the source; its rotation must
    // still apply to the text draw.
    let l = label("^FO0,0^FDx^A0R,20,20^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    let rotated = surface.calls().iter().any(|c| {
        matches!(c, DrawCall::Rotate { radians } if (radians - std::f64::consts::FRAC_PI_2).abs() < 1e-9)
    });
    assert!(rotated, "deferred ^FD should see the ^A rotation: {:?}", surface.calls());
}

#[test]
fn rotation_is_exactly_reversed() {
    let l = label("^FO5,5^FDx^A0I,20,20^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    let net: f64 = surface
        .calls()
        .iter()
        .filter_map(|c| match c {
            DrawCall::Rotate { radians } => Some(*radians),
            _ => None,
        })
        .sum();
    assert!(net.abs() < 1e-9, "rotations must cancel, net {net}");
    let (dx, dy): (f64, f64) = surface
        .calls()
        .iter()
        .filter_map(|c| match c {
            DrawCall::Translate { dx, dy } => Some((*dx, *dy)),
            _ => None,
        })
        .fold((0.0, 0.0), |(ax, ay), (dx, dy)| (ax + dx, ay + dy));
    assert!(dx.abs() < 1e-9 && dy.abs() < 1e-9, "translations must cancel");
}

#[test]
fn block_mode_wraps_and_stacks_lines() {
    // Default 10px font: 5px per character. Width 40 fits "one two".
    let l = label("^FO0,0^FB40,3^FDone two three^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(
        texts(surface.calls()),
        vec![("one two", 0.0, 0.0), ("three", 0.0, 10.0)]
    );
}

#[test]
fn substituted_text_is_drawn() {
    let l = label("^FO0,0^FD${name}^FS");
    let mut values = TemplateValues::new();
    values.set_text("name", "Acme");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &values);
    assert_eq!(texts(surface.calls()), vec![("Acme", 0.0, 0.0)]);
}

// ── Barcodes ────────────────────────────────────────────────────────────

#[test]
fn code128_draws_exact_runs() {
    // line flag N suppresses the human-readable text.
    let l = label("^FO0,0^BCN,50,N,N^FD000000^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    let rects = fill_rects(surface.calls());
    // 5 symbols × 6 runs + 7-run stop = 37 runs → 19 bars.
    assert_eq!(rects.len(), 19);
    // Start code C is 211232: first bar 2 modules × default module width 2.
    assert_eq!(rects[0], (0.0, 0.0, 4.0, 50.0));
    assert!(texts(surface.calls()).is_empty());
}

#[test]
fn code128_prints_text_below_by_default() {
    let l = label("^FO0,0^BCN,50^FD000000^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    let drawn = texts(surface.calls());
    assert_eq!(drawn.len(), 1);
    let (text, x, y) = drawn[0];
    assert_eq!(text, "000000");
    // Below the 50-dot symbol plus the fixed 10-dot gap, centered.
    assert_eq!(y, 60.0);
    assert!(x > 0.0);
}

#[test]
fn ean13_draws_thirty_bars() {
    let l = label("^FO0,0^BEN,40,N,N^FD5901234123457^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    let rects = fill_rects(surface.calls());
    assert_eq!(rects.len(), 30);
    assert_eq!(rects[0], (0.0, 0.0, 2.0, 40.0));
}

#[test]
fn module_width_from_by_applies_to_symbols() {
    let l = label("^BY3^FO0,0^BCN,50,N,N^FD000000^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    let rects = fill_rects(surface.calls());
    assert_eq!(rects[0].2, 6.0, "2-module bar at 3 dots per module");
}

#[test]
fn qr_renders_a_placeholder_square() {
    let l = label("^BY2,3,60^FO10,10^BQN,2,5^FDpayload^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    // Height comes from the ^BY default; QR carries no height of its own.
    assert_eq!(fill_rects(surface.calls()), vec![(10.0, 10.0, 60.0, 60.0)]);
    // Placeholder symbologies never print text.
    assert!(texts(surface.calls()).is_empty());
}

#[test]
fn datamatrix_renders_finder_geometry() {
    let l = label("^FO0,0^BXN,4,200,10,10^FDdata^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    let rects = fill_rects(surface.calls());
    // Solid left edge: module 4, rows 10 → side 40.
    assert_eq!(rects[0], (0.0, 0.0, 4.0, 40.0));
    assert!(rects.len() > 2);
}

// ── Placeholders ────────────────────────────────────────────────────────

#[test]
fn unbound_placeholder_skips_symbol_but_shows_literal() {
    let l = label("^FO5,5^BCN,30^FD${code}^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    assert!(fill_rects(surface.calls()).is_empty(), "no bars drawn");
    // The literal lands where the interpretation line would have been:
    // x + module_width/2, y + symbol height.
    assert_eq!(texts(surface.calls()), vec![("${code}", 6.0, 35.0)]);
}

// ── Graphics fields ─────────────────────────────────────────────────────

#[test]
fn gf_draws_the_cached_bitmap() {
    let l = label("^FO3,4^GFA,8,8,1,ff:::::::^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    assert_eq!(
        surface.calls(),
        &[DrawCall::DrawBitmap {
            width: 8,
            height: 8,
            x: 3.0,
            y: 4.0
        }]
    );
}

#[test]
fn malformed_gf_fails_at_render_not_parse() {
    let l = label("^FO0,0^GFB,8,8,1,ff^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    let failed = failures(&outcomes);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].reason.as_deref(),
        Some("unsupported graphics mode \"B\"")
    );
}

#[test]
fn templated_image_renders_after_registration() {
    let mut l = label("^FO0,0^GF${logo}^FS");
    let mut values = TemplateValues::new();
    values.set_image("logo", ImageAsset::new("A,8,8,1,ff:::::::"));
    futures::executor::block_on(l.register_images(&values, &CodecDecoder)).unwrap();
    assert_eq!(l.bitmaps().len(), 1);

    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &values);
    assert!(failures(&outcomes).is_empty());
    assert!(matches!(
        surface.calls()[0],
        DrawCall::DrawBitmap { width: 8, height: 8, .. }
    ));
}

#[test]
fn unbound_templated_image_is_an_error_outcome() {
    let l = label("^FO0,0^GF${logo}^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    let failed = failures(&outcomes);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].reason.as_deref(),
        Some("templated image is undefined")
    );
}

#[test]
fn two_placeholders_with_identical_encodings_share_one_bitmap() {
    let mut l = label("^FO0,0^GF${a}^FS^FO0,20^GF${b}^FS");
    let mut values = TemplateValues::new();
    values.set_image("a", ImageAsset::new("A,8,8,1,ff:::::::"));
    values.set_image("b", ImageAsset::new("A,8,8,1,ff:::::::"));
    futures::executor::block_on(l.register_images(&values, &CodecDecoder)).unwrap();
    assert_eq!(l.bitmaps().len(), 1);
}

// ── Field state restoration ─────────────────────────────────────────────

#[test]
fn reverse_field_composite_is_restored() {
    let l = label("^FO0,0^FR^FDx^FS");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert!(failures(&outcomes).is_empty());
    assert_eq!(surface.composite_mode(), CompositeMode::SourceOver);
}

#[test]
fn field_font_does_not_leak_out_of_the_field() {
    let l = label("^FO0,0^A0N,36,36^FDx^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(surface.font(), "10px sans-serif");
}

#[test]
fn cf_inside_a_text_field_persists() {
    let l = label("^FO0,0^CF0,30^FDx^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(surface.font(), "normal 30px Helvetica");
}

#[test]
fn cf_inside_a_symbol_field_does_not_leak_into_measurement() {
    // The CF still becomes the label default after the field, but the
    // barcode text inside the field keeps the fallback font.
    let l = label("^FO0,0^BCN,50^CF0,30^FD000000^FS");
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(surface.font(), "normal 30px Helvetica");
}

// ── Sections and offsets ────────────────────────────────────────────────

#[test]
fn section_predicates_filter_rendering() {
    let l = label("^--base^PQ1^--extra,@qty=5^PW100");
    let mut surface = RecordingSurface::new();
    let outcomes = l.render(&mut surface, &TemplateValues::new());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].command, "^PQ1");

    let mut values = TemplateValues::new();
    values.set_text("qty", "5");
    let outcomes = l.render(&mut surface, &values);
    assert_eq!(outcomes.len(), 2);

    let mut values = TemplateValues::new();
    values.set_text("qty", "4");
    let outcomes = l.render(&mut surface, &values);
    assert_eq!(outcomes.len(), 1);
}

#[test]
fn global_offset_translates_field_origins_at_render_time() {
    let mut l = label("^FO10,10^FDx^FS");
    l.set_global_offset(Some(5), Some(7), None);
    let mut surface = RecordingSurface::new();
    l.render(&mut surface, &TemplateValues::new());
    assert_eq!(texts(surface.calls()), vec![("x", 15.0, 17.0)]);
    // Stored coordinates are untouched.
    assert_eq!(parse_label("^FO10,10^FDx^FS").unwrap().commands()[0].raw(), "10,10");
}

#[test]
fn partial_offset_update_retains_other_axes() {
    let mut l = label("^FO0,0^FDx^FS");
    l.set_global_offset(Some(3), None, None);
    l.set_global_offset(None, Some(4), None);
    assert_eq!(l.global_offset(), (3, 4, 0));
}
