//! Greedy block layout for `^FB` text fields.

use crate::render::context::BlockSize;
use crate::render::surface::Surface;

/// The measured line set for a block-mode field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextBlock {
    pub line_height: f64,
    pub lines: Vec<String>,
}

/// Lay text out within a block: fixed pixel width, maximum line count.
///
/// The text is first split on the explicit hard-break marker `\&` (capped
/// at the line budget); if every part fits the width those become the
/// lines. Otherwise words wrap greedily by measured width. A first word
/// wider than the available width degrades to an empty line set.
pub(crate) fn measure_text_block(
    surface: &mut dyn Surface,
    block: BlockSize,
    text: &str,
) -> TextBlock {
    if block.h < 1 {
        return TextBlock {
            line_height: 0.0,
            lines: Vec::new(),
        };
    }
    let avail = f64::from(block.w);
    let max_lines = block.h as usize;
    let whole = surface.measure_text(text);
    let line_height = whole.descent_height.ceil();
    if whole.width <= avail {
        return TextBlock {
            line_height,
            lines: vec![text.to_string()],
        };
    }

    let segments: Vec<&str> = text.split("\\&").take(max_lines).collect();
    if segments
        .iter()
        .all(|s| surface.measure_text(s).width <= avail)
    {
        return TextBlock {
            line_height,
            lines: segments.iter().map(|s| (*s).to_string()).collect(),
        };
    }

    // Greedy word wrap across the hard-break segments.
    let space_width = surface.measure_text(" ").width;
    let mut lines: Vec<String> = Vec::new();
    let mut first_word = true;
    'segments: for segment in &segments {
        let mut current = String::new();
        let mut current_width = 0.0f64;
        for word in segment.split_whitespace() {
            let word_width = surface.measure_text(word).width;
            if first_word {
                first_word = false;
                if word_width > avail {
                    // Nothing can fit on the first line; give up entirely.
                    return TextBlock {
                        line_height,
                        lines: Vec::new(),
                    };
                }
            }
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
                continue;
            }
            let extended = current_width + space_width + word_width;
            if extended <= avail {
                current.push(' ');
                current.push_str(word);
                current_width = extended;
            } else {
                lines.push(std::mem::take(&mut current));
                if lines.len() >= max_lines {
                    break 'segments;
                }
                current.push_str(word);
                current_width = word_width;
            }
        }
        if !current.is_empty() {
            lines.push(current);
            if lines.len() >= max_lines {
                break;
            }
        }
    }

    TextBlock { line_height, lines }
}
