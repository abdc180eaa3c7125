//! Glyph table for the 16-segment character cells and the gear digit.
//!
//! Cell layout, MSB first: eight outer/middle segments, the shared lamp bit
//! (always skipped), the decimal point, then six diagonal segments.

use crate::frame::Pattern;

const fn glyph_pattern(cells: &str) -> Pattern {
    Pattern::parse(cells)
}

/// The blank glyph.
pub const BLANK: Pattern = glyph_pattern("00000000 0000000");

/// Looks up a character, returning `None` when it has no glyph.
pub fn lookup(c: char) -> Option<Pattern> {
    // Lowercase k has its own shape; every other letter is case-insensitive.
    if c == 'k' {
        return Some(glyph_pattern("00000000 0011110"));
    }

    let pattern = match c.to_ascii_uppercase() {
        ' ' => BLANK,
        '0' => glyph_pattern("00111111 0100100"),
        '1' => glyph_pattern("00000110 0000100"),
        '2' => glyph_pattern("11011011 0000000"),
        '3' => glyph_pattern("10001111 0000000"),
        '4' => glyph_pattern("11100110 0000000"),
        '5' => glyph_pattern("11101101 0000000"),
        '6' => glyph_pattern("11111101 0000000"),
        '7' => glyph_pattern("00000001 0010100"),
        '8' => glyph_pattern("11111111 0000000"),
        '9' => glyph_pattern("11100111 0000000"),
        'A' => glyph_pattern("11110111 0000000"),
        'B' => glyph_pattern("10001111 0010010"),
        'C' => glyph_pattern("00111001 0000000"),
        'D' => glyph_pattern("00001111 0010010"),
        'E' => glyph_pattern("01111001 0000000"),
        'F' => glyph_pattern("01110001 0000000"),
        'G' => glyph_pattern("10111101 0000000"),
        'H' => glyph_pattern("11110110 0000000"),
        'I' => glyph_pattern("00001001 0010010"),
        'J' => glyph_pattern("00011110 0000000"),
        'K' => glyph_pattern("01110000 0001100"),
        'L' => glyph_pattern("00111000 0000000"),
        'M' => glyph_pattern("00110110 0000101"),
        'N' => glyph_pattern("00110110 0001001"),
        'O' => glyph_pattern("00111111 0000000"),
        'P' => glyph_pattern("11110011 0000000"),
        'Q' => glyph_pattern("00111111 0001000"),
        'R' => glyph_pattern("11110011 0001000"),
        'S' => glyph_pattern("10001101 0000001"),
        'T' => glyph_pattern("00000001 0010010"),
        'U' => glyph_pattern("00111110 0000000"),
        'V' => glyph_pattern("00110000 0100100"),
        'W' => glyph_pattern("00110110 0101000"),
        'X' => glyph_pattern("00000000 0101101"),
        'Y' => glyph_pattern("00000000 0010101"),
        'Z' => glyph_pattern("00001001 0100100"),
        '-' => glyph_pattern("11000000 0000000"),
        '+' => glyph_pattern("11000000 0010010"),
        _ => return None,
    };
    Some(pattern)
}

/// Returns the glyph for a character, blank if it has none.
pub fn glyph(c: char) -> Pattern {
    lookup(c).unwrap_or(BLANK)
}

/// Gear digit with every segment off (active-low).
pub const GEAR_BLANK: Pattern = Pattern::parse("1111111");

/// Returns the active-low gear digit pattern.
///
/// `-1` shows reverse, `0` neutral and `1..=9` the gear number. Anything
/// else blanks the digit.
pub fn gear_pattern(gear: Option<i32>) -> Pattern {
    match gear {
        Some(-1) => Pattern::parse("1001100"),
        Some(0) => Pattern::parse("1001000"),
        Some(1) => Pattern::parse("1111001"),
        Some(2) => Pattern::parse("0100100"),
        Some(3) => Pattern::parse("0110000"),
        Some(4) => Pattern::parse("0011001"),
        Some(5) => Pattern::parse("0010010"),
        Some(6) => Pattern::parse("0000011"),
        Some(7) => Pattern::parse("1111000"),
        Some(8) => Pattern::parse("0000000"),
        Some(9) => Pattern::parse("0011000"),
        _ => GEAR_BLANK,
    }
}
