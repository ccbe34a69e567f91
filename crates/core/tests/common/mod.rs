//! Shared helpers for `zpl_preview_core` integration tests.

#![allow(unreachable_pub)]

use zpl_preview_core::{Command, Label, Outcome, parse_label};

/// Parse a label body, panicking with the error on failure.
#[allow(dead_code)]
pub fn label(body: &str) -> Label {
    parse_label(body).unwrap_or_else(|e| panic!("label should parse: {e}"))
}

/// Top-level opcodes in order.
#[allow(dead_code)]
pub fn opcodes(label: &Label) -> Vec<&str> {
    label.commands().iter().map(Command::opcode).collect()
}

/// The outcomes that failed.
#[allow(dead_code)]
pub fn failures(outcomes: &[Outcome]) -> Vec<&Outcome> {
    outcomes.iter().filter(|o| !o.ok).collect()
}
