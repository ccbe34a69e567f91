//! Run-length pattern generation for Code128 and EAN-13/UPC-A symbols.
//!
//! All output is expressed as run lengths in modules: alternating
//! bar/space widths starting with a bar. Renderers multiply by the
//! configured module width; the tables themselves are resolution-free.
//!
//! Code128 patterns are stored packed: each of the 107 symbol values is a
//! `u16` encoding six runs as 2-bit fields (run length − 1), least
//! significant pair first. Unpacking is memoized — the same values recur
//! across many labels.

use std::sync::OnceLock;

/// Barcode input rejected by the generator.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarcodeError {
    /// EAN-13/UPC-A input must be 12 or 13 digits.
    #[error("input is not valid EAN-13 or UPC-A")]
    InvalidEan,
}

// ── Code128 ─────────────────────────────────────────────────────────────

/// Start code for character mode (code set B).
pub const CODE128_START_B: u16 = 104;
/// Start code for numeric mode (code set C).
pub const CODE128_START_C: u16 = 105;
/// Value switching an in-progress numeric symbol to code set B.
const CODE128_SWITCH_B: u16 = 100;

/// The fixed 7-run stop pattern (bars at even indices).
pub const CODE128_STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

/// Packed bar/space widths for Code128 values 0–106.
///
/// Derived from the Wikipedia Code 128 width strings (e.g. `212222`) by
/// `runs.map(|r| r - 1).fold(0, |acc, r, i| acc + (r << (i * 2)))`.
const CODE128_PACKED: [u16; 107] = [
    1361, 1301, 341, 2372, 1412, 1352, 2132, 1172, 1112, 2117,
    1157, 1097, 1616, 1556, 596, 1376, 1316, 356, 101, 1541,
    581, 1121, 1061, 530, 1346, 1286, 326, 1106, 1046, 86,
    2321, 401, 281, 2432, 2312, 392, 2192, 2072, 152, 2177,
    2057, 137, 2576, 656, 536, 2336, 416, 296, 290, 641,
    521, 2081, 161, 545, 2306, 386, 266, 2066, 146, 26,
    50, 197, 11, 3392, 1472, 3332, 452, 1292, 332, 3152,
    1232, 3092, 212, 1052, 92, 77, 3077, 35, 1037, 56,
    1856, 1796, 836, 1136, 1076, 116, 1091, 1031, 71, 785,
    305, 275, 2816, 896, 776, 2096, 176, 2051, 131, 800,
    560, 770, 515, 1217, 3137, 1601, 41,
];

fn unpack(packed: u16) -> [u8; 6] {
    let mut runs = [0u8; 6];
    for (i, run) in runs.iter_mut().enumerate() {
        *run = ((packed >> (i * 2)) & 0b11) as u8 + 1;
    }
    runs
}

/// Six bar/space runs for a Code128 symbol value, or `None` when the value
/// is outside the table.
pub fn code128_pattern(value: u16) -> Option<[u8; 6]> {
    static PATTERNS: OnceLock<Vec<[u8; 6]>> = OnceLock::new();
    let table = PATTERNS.get_or_init(|| CODE128_PACKED.iter().map(|&p| unpack(p)).collect());
    table.get(usize::from(value)).copied()
}

/// The symbol values of a Code128 encoding, before pattern expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    /// Start code: 104 (character mode) or 105 (numeric mode).
    pub start: u16,
    /// Data values, including any mode-switch codes.
    pub values: Vec<u16>,
    /// `(start + Σ value·(i+1)) mod 103`.
    pub checksum: u16,
}

/// Encode text as Code128 symbol values.
///
/// Mode selection: an all-digit payload longer than 3 characters uses
/// numeric mode (digits packed two at a time); an odd leftover digit
/// forces a switch to character mode for the final digit. Everything else
/// uses character mode, one value per character (code point − 32).
///
/// Returns `None` for empty input.
pub fn code128_values(text: &str) -> Option<Code128> {
    if text.is_empty() {
        return None;
    }
    let numeric = text.len() > 3 && text.bytes().all(|b| b.is_ascii_digit());
    let start = if numeric {
        CODE128_START_C
    } else {
        CODE128_START_B
    };

    let mut values: Vec<u16> = Vec::new();
    if numeric {
        let digits = text.as_bytes();
        let pairs = digits.len() / 2;
        for i in 0..pairs {
            let hi = u16::from(digits[i * 2] - b'0');
            let lo = u16::from(digits[i * 2 + 1] - b'0');
            values.push(hi * 10 + lo);
        }
        if digits.len() % 2 == 1 {
            values.push(CODE128_SWITCH_B);
            values.push(u16::from(digits[digits.len() - 1]) - 32);
        }
    } else {
        for c in text.chars() {
            // Characters below the code set B range have no value; clamp to
            // the table start so they degrade to value 0 rather than wrap.
            let value = (c as u32).saturating_sub(32).min(u32::from(u16::MAX)) as u16;
            values.push(value);
        }
    }

    let weighted: u32 = values
        .iter()
        .enumerate()
        .map(|(i, &v)| u32::from(v) * (i as u32 + 1))
        .sum();
    let checksum = ((u32::from(start) + weighted) % 103) as u16;

    Some(Code128 {
        start,
        values,
        checksum,
    })
}

/// Flat alternating bar/space run lengths for a Code128 encoding of `text`
/// (bars at even indices), including start code, checksum, and the 7-run
/// stop pattern. Empty for empty input.
///
/// Values without a table entry are skipped, not expanded.
pub fn code128_runs(text: &str) -> Vec<u8> {
    let Some(code) = code128_values(text) else {
        return Vec::new();
    };
    let mut runs = Vec::with_capacity((code.values.len() + 2) * 6 + 7);
    let symbols = std::iter::once(code.start)
        .chain(code.values.iter().copied())
        .chain(std::iter::once(code.checksum));
    for value in symbols {
        if let Some(pattern) = code128_pattern(value) {
            runs.extend_from_slice(&pattern);
        }
    }
    runs.extend_from_slice(&CODE128_STOP);
    runs
}

// ── EAN-13 / UPC-A ──────────────────────────────────────────────────────

/// Parity selection per leading digit: 1 = L-code (forward runs),
/// 2 = G-code (mirrored runs), for digits 2–7 of the left half.
const EAN13_PARITY: [[u8; 6]; 10] = [
    [1, 1, 1, 1, 1, 1],
    [1, 1, 2, 1, 2, 2],
    [1, 1, 2, 2, 1, 2],
    [1, 1, 2, 2, 2, 1],
    [1, 2, 1, 1, 2, 2],
    [1, 2, 2, 1, 1, 2],
    [1, 2, 2, 2, 1, 1],
    [1, 2, 1, 2, 1, 2],
    [1, 2, 1, 2, 2, 1],
    [1, 2, 2, 1, 2, 1],
];

/// Base 4-run widths per digit; mirrored in place for G-coded positions.
const EAN13_RUNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Total module span of an EAN-13 symbol (fixed by the standard).
pub const EAN13_MODULES: u32 = 95;

/// The fixed 59-run layout of an EAN-13/UPC-A symbol: 3-run start guard,
/// 24-run left half, 5-run center guard, 24-run right half, 3-run end
/// guard.
///
/// Input must be 12 digits (UPC-A, zero-padded to 13) or 13 digits.
pub fn ean13_runs(text: &str) -> Result<[u8; 59], BarcodeError> {
    if !(text.len() == 12 || text.len() == 13) || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BarcodeError::InvalidEan);
    }
    let mut digits = [0u8; 13];
    let pad = 13 - text.len();
    for (i, b) in text.bytes().enumerate() {
        digits[pad + i] = b - b'0';
    }

    let mut runs = [0u8; 59];
    runs[0..3].copy_from_slice(&[1, 1, 1]);
    runs[27..32].copy_from_slice(&[1, 1, 1, 1, 1]);
    runs[56..59].copy_from_slice(&[1, 1, 1]);

    let parity = EAN13_PARITY[usize::from(digits[0])];
    for i in 0..6 {
        let base = EAN13_RUNS[usize::from(digits[i + 1])];
        let at = 3 + i * 4;
        if parity[i] == 1 {
            runs[at..at + 4].copy_from_slice(&base);
        } else {
            runs[at..at + 4].copy_from_slice(&[base[3], base[2], base[1], base[0]]);
        }
    }
    for i in 0..6 {
        let base = EAN13_RUNS[usize::from(digits[i + 7])];
        let at = 32 + i * 4;
        runs[at..at + 4].copy_from_slice(&base);
    }
    Ok(runs)
}

/// Sum of a run sequence, in modules.
pub fn run_span(runs: &[u8]) -> u32 {
    runs.iter().map(|&r| u32::from(r)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Code128 ─────────────────────────────────────────────────────────

    #[test]
    fn value_zero_unpacks_to_212222() {
        assert_eq!(code128_pattern(0), Some([2, 1, 2, 2, 2, 2]));
    }

    #[test]
    fn out_of_table_value_is_none() {
        assert_eq!(code128_pattern(107), None);
    }

    #[test]
    fn every_pattern_spans_eleven_modules() {
        for value in 0..107u16 {
            let pattern = code128_pattern(value).unwrap();
            assert_eq!(
                run_span(&pattern),
                11,
                "value {value} spans {:?}",
                pattern
            );
        }
        assert_eq!(run_span(&CODE128_STOP), 13);
    }

    #[test]
    fn numeric_mode_packs_digit_pairs() {
        let code = code128_values("000000").unwrap();
        assert_eq!(code.start, CODE128_START_C);
        assert_eq!(code.values, vec![0, 0, 0]);
        assert_eq!(code.checksum, 105 % 103);
    }

    #[test]
    fn odd_digit_count_switches_to_character_mode() {
        let code = code128_values("12345").unwrap();
        assert_eq!(code.start, CODE128_START_C);
        // 12, 34, switch-to-B, '5' − 32
        assert_eq!(code.values, vec![12, 34, 100, u16::from(b'5') - 32]);
    }

    #[test]
    fn short_digits_use_character_mode() {
        let code = code128_values("123").unwrap();
        assert_eq!(code.start, CODE128_START_B);
        assert_eq!(
            code.values,
            vec![
                u16::from(b'1') - 32,
                u16::from(b'2') - 32,
                u16::from(b'3') - 32
            ]
        );
    }

    #[test]
    fn checksum_weights_positions_from_one() {
        // (105 + 12·1 + 34·2 + 100·3 + 21·4) mod 103 = 569 mod 103 = 54
        let code = code128_values("12345").unwrap();
        assert_eq!(code.checksum, 54);
    }

    #[test]
    fn empty_input_encodes_nothing() {
        assert!(code128_values("").is_none());
        assert!(code128_runs("").is_empty());
    }

    #[test]
    fn runs_cover_start_data_checksum_stop() {
        let runs = code128_runs("000000");
        // start + 3 values + checksum = 5 symbols × 6 runs, + 7-run stop
        assert_eq!(runs.len(), 5 * 6 + 7);
        assert_eq!(&runs[runs.len() - 7..], &CODE128_STOP);
        // total span: 5 symbols × 11 modules + 13-module stop
        assert_eq!(run_span(&runs), 5 * 11 + 13);
    }

    // ── EAN-13 ──────────────────────────────────────────────────────────

    #[test]
    fn ean13_shape() {
        let runs = ean13_runs("5901234123457").unwrap();
        assert_eq!(runs.len(), 59);
        assert_eq!(&runs[0..3], &[1, 1, 1]);
        assert_eq!(&runs[27..32], &[1, 1, 1, 1, 1]);
        assert_eq!(&runs[56..59], &[1, 1, 1]);
        assert_eq!(run_span(&runs), EAN13_MODULES);
    }

    #[test]
    fn ean13_left_half_uses_parity_table() {
        let runs = ean13_runs("5901234123457").unwrap();
        // Leading digit 5 → parity [1,2,2,1,1,2]; first left digit is 9.
        assert_eq!(&runs[3..7], &EAN13_RUNS[9]);
        // Second left digit 0 is G-coded (mirrored).
        assert_eq!(&runs[7..11], &[1, 1, 2, 3]);
    }

    #[test]
    fn upca_is_zero_padded() {
        let upc = ean13_runs("036000291452").unwrap();
        let ean = ean13_runs("0036000291452").unwrap();
        assert_eq!(upc, ean);
    }

    #[test]
    fn rejects_bad_lengths_and_characters() {
        assert_eq!(ean13_runs(""), Err(BarcodeError::InvalidEan));
        assert_eq!(ean13_runs("12345"), Err(BarcodeError::InvalidEan));
        assert_eq!(ean13_runs("59012341234570"), Err(BarcodeError::InvalidEan));
        assert_eq!(ean13_runs("59012341234ab"), Err(BarcodeError::InvalidEan));
    }

    #[test]
    fn every_ean_digit_spans_seven_modules() {
        for digit in &EAN13_RUNS {
            assert_eq!(run_span(digit), 7);
        }
    }
}
