//! Envelope and command tokenizer.
//!
//! Two passes over raw input text. The first extracts non-overlapping
//! `^XA ... ^XZ` label bodies; text outside an envelope is ignored. The
//! second splits one body into marker-stripped command substrings,
//! enforcing the marker spacing rules.
//!
//! Both passes scan bytes directly: every delimiter (`^`, `X`, `A`, `Z`)
//! is ASCII, and UTF-8 continuation bytes (0x80–0xBF) never match an ASCII
//! comparison, so byte indexing cannot split a multi-byte character at a
//! marker position.

use crate::error::ParseError;

/// Extract the bodies of all `^XA ... ^XZ` envelopes, in order.
///
/// Bodies are trimmed of surrounding whitespace. An unterminated `^XA`
/// (no matching `^XZ`) is ignored, as is any text between envelopes.
pub fn split_labels(input: &str) -> Vec<&str> {
    let mut bodies = Vec::new();
    let mut rest = input;
    while let Some(open) = rest.find("^XA") {
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("^XZ") else {
            break;
        };
        bodies.push(after_open[..close].trim());
        rest = &after_open[close + 3..];
    }
    bodies
}

/// Split a label body into command substrings, markers stripped.
///
/// Rules:
/// - a non-empty body must begin with `^`;
/// - every later `^` must come at least two characters after the previous
///   marker, otherwise the marker is invalid;
/// - a trailing `^` with nothing after it is a leftover marker.
pub fn split_commands(body: &str) -> Result<Vec<&str>, ParseError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    if !body.starts_with('^') {
        return Err(ParseError::InvalidStart {
            snippet: clip(body, 0, 3).to_string(),
        });
    }

    let bytes = body.as_bytes();
    let mut commands = Vec::new();
    let mut start = 0usize;
    for head in 1..bytes.len() {
        if bytes[head] != b'^' {
            continue;
        }
        if head < start + 2 {
            return Err(ParseError::MarkerTooClose {
                context: clip(body, start, head + 3).to_string(),
            });
        }
        commands.push(&body[start + 1..head]);
        start = head;
    }
    // The final marker owns the remainder of the body.
    let tail = &body[start + 1..];
    if tail.is_empty() {
        return Err(ParseError::DanglingMarker { offset: start });
    }
    commands.push(tail);
    Ok(commands)
}

/// Slice `[from..to)` clamped to the string length and snapped forward to a
/// UTF-8 character boundary.
fn clip(s: &str, from: usize, to: usize) -> &str {
    let mut end = to.min(s.len());
    while end < s.len() && !s.is_char_boundary(end) {
        end += 1;
    }
    &s[from..end]
}
