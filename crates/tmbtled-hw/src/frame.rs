//! Frame store for the cluster's 160-bit state.
//!
//! The device is driven by a single 20-byte frame. Bit 0 is the most
//! significant bit of byte 0 and bits run left to right, MSB first, through
//! the buffer. Every lamp, segment and digit lives in a named [`BitRange`].

use crate::protocol::Side;

/// Number of addressable bits in a frame.
pub const FRAME_BITS: usize = 160;

/// Size of the packed frame in bytes.
pub const FRAME_SIZE: usize = FRAME_BITS / 8;

/// Offset of the decimal point inside a character cell.
pub const DECIMAL_POINT_OFFSET: usize = 9;

/// Frame the device expects after power-up.
///
/// Byte 0 carries the mode nibble, bit 32 must stay set for the left display
/// to light, and byte 11 blanks the active-low gear digit and gear dot.
pub const DEFAULT_FRAME: [u8; FRAME_SIZE] = [
    0x04, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// A fixed-width segment pattern.
///
/// Cells are either on, off, or skipped. Skipped cells leave the underlying
/// frame bit untouched, which lets character glyphs pass over the lamp bits
/// that share a character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    bits: u32,
    care: u32,
    len: u8,
}

impl Pattern {
    /// Parses a pattern from `'1'`, `'0'` and `' '` (skip) cells.
    pub const fn parse(cells: &str) -> Self {
        let bytes = cells.as_bytes();
        assert!(bytes.len() <= 32, "pattern longer than 32 cells");

        let mut bits = 0u32;
        let mut care = 0u32;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'1' => {
                    bits |= 1 << i;
                    care |= 1 << i;
                }
                b'0' => care |= 1 << i,
                b' ' => {}
                _ => panic!("pattern cells must be '0', '1' or ' '"),
            }
            i += 1;
        }

        Self {
            bits,
            care,
            len: bytes.len() as u8,
        }
    }

    /// Number of cells in the pattern.
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if the pattern has no cells.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the cell value, or `None` for a skip cell or past the end.
    pub const fn cell(&self, offset: usize) -> Option<bool> {
        if offset >= self.len as usize || self.care & (1 << offset) == 0 {
            None
        } else {
            Some(self.bits & (1 << offset) != 0)
        }
    }
}

/// Named ranges of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitRange {
    RevLights1,
    LeftBlue,
    RevLights2,
    LeftChar1,
    LeftChar2,
    LeftTimeSpacer,
    LeftChar3,
    LeftRed,
    LeftChar4,
    LeftYellow,
    GearDot,
    Gear,
    RightChar1,
    RightYellow,
    RightChar2,
    RightTimeSpacer,
    RightChar3,
    RightRed,
    RightChar4,
    RightBlue,
    RevLightsGreen,
    RevLightsRed1,
    RevLightsRed2,
    RevLightsBlue,
}

impl BitRange {
    /// Every named range.
    pub const ALL: [BitRange; 24] = [
        BitRange::RevLights1,
        BitRange::LeftBlue,
        BitRange::RevLights2,
        BitRange::LeftChar1,
        BitRange::LeftChar2,
        BitRange::LeftTimeSpacer,
        BitRange::LeftChar3,
        BitRange::LeftRed,
        BitRange::LeftChar4,
        BitRange::LeftYellow,
        BitRange::GearDot,
        BitRange::Gear,
        BitRange::RightChar1,
        BitRange::RightYellow,
        BitRange::RightChar2,
        BitRange::RightTimeSpacer,
        BitRange::RightChar3,
        BitRange::RightRed,
        BitRange::RightChar4,
        BitRange::RightBlue,
        BitRange::RevLightsGreen,
        BitRange::RevLightsRed1,
        BitRange::RevLightsRed2,
        BitRange::RevLightsBlue,
    ];

    /// Returns the inclusive `(start, end)` bit indices.
    pub const fn span(self) -> (usize, usize) {
        match self {
            BitRange::RevLights1 => (8, 15),
            BitRange::LeftBlue => (16, 16),
            BitRange::RevLights2 => (17, 23),
            BitRange::LeftChar1 => (24, 39),
            BitRange::LeftChar2 => (40, 55),
            BitRange::LeftTimeSpacer => (48, 48),
            BitRange::LeftChar3 => (56, 71),
            BitRange::LeftRed => (64, 64),
            BitRange::LeftChar4 => (72, 87),
            BitRange::LeftYellow => (80, 80),
            BitRange::GearDot => (88, 88),
            BitRange::Gear => (89, 95),
            BitRange::RightChar1 => (96, 111),
            BitRange::RightYellow => (104, 104),
            BitRange::RightChar2 => (112, 127),
            BitRange::RightTimeSpacer => (120, 120),
            BitRange::RightChar3 => (128, 143),
            BitRange::RightRed => (136, 136),
            BitRange::RightChar4 => (144, 159),
            BitRange::RightBlue => (152, 152),
            BitRange::RevLightsGreen => (11, 15),
            BitRange::RevLightsRed1 => (8, 10),
            BitRange::RevLightsRed2 => (22, 23),
            BitRange::RevLightsBlue => (17, 21),
        }
    }

    /// Number of bits in the range.
    pub const fn width(self) -> usize {
        let (start, end) = self.span();
        end - start + 1
    }

    /// Returns the character cell `index` (0-3) of a display side.
    pub fn char_cell(side: Side, index: usize) -> Self {
        const LEFT: [BitRange; 4] = [
            BitRange::LeftChar1,
            BitRange::LeftChar2,
            BitRange::LeftChar3,
            BitRange::LeftChar4,
        ];
        const RIGHT: [BitRange; 4] = [
            BitRange::RightChar1,
            BitRange::RightChar2,
            BitRange::RightChar3,
            BitRange::RightChar4,
        ];
        match side {
            Side::Left => LEFT[index.min(3)],
            Side::Right => RIGHT[index.min(3)],
        }
    }

    /// Returns the time spacer (colon) lamp of a display side.
    pub fn time_spacer(side: Side) -> Self {
        match side {
            Side::Left => BitRange::LeftTimeSpacer,
            Side::Right => BitRange::RightTimeSpacer,
        }
    }

    /// Returns the range name used in logs and configuration.
    pub fn name(self) -> &'static str {
        match self {
            BitRange::RevLights1 => "revLights1",
            BitRange::LeftBlue => "leftBlue",
            BitRange::RevLights2 => "revLights2",
            BitRange::LeftChar1 => "leftChar1",
            BitRange::LeftChar2 => "leftChar2",
            BitRange::LeftTimeSpacer => "leftTimeSpacer",
            BitRange::LeftChar3 => "leftChar3",
            BitRange::LeftRed => "leftRed",
            BitRange::LeftChar4 => "leftChar4",
            BitRange::LeftYellow => "leftYellow",
            BitRange::GearDot => "gearDot",
            BitRange::Gear => "gear",
            BitRange::RightChar1 => "rightChar1",
            BitRange::RightYellow => "rightYellow",
            BitRange::RightChar2 => "rightChar2",
            BitRange::RightTimeSpacer => "rightTimeSpacer",
            BitRange::RightChar3 => "rightChar3",
            BitRange::RightRed => "rightRed",
            BitRange::RightChar4 => "rightChar4",
            BitRange::RightBlue => "rightBlue",
            BitRange::RevLightsGreen => "revLightsGreen",
            BitRange::RevLightsRed1 => "revLightsRed1",
            BitRange::RevLightsRed2 => "revLightsRed2",
            BitRange::RevLightsBlue => "revLightsBlue",
        }
    }
}

impl std::fmt::Display for BitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The cluster state as a 160-bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_FRAME,
        }
    }
}

impl Frame {
    /// Creates a frame holding the device default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame from raw bytes.
    pub fn from_bytes(bytes: [u8; FRAME_SIZE]) -> Self {
        Self { bytes }
    }

    #[inline]
    fn get_index(&self, index: usize) -> bool {
        self.bytes[index / 8] & (0x80 >> (index % 8)) != 0
    }

    #[inline]
    fn set_index(&mut self, index: usize, on: bool) {
        let mask = 0x80 >> (index % 8);
        if on {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    /// Reads bit `index` of a range. Indices past the range width read as off.
    pub fn bit(&self, range: BitRange, index: usize) -> bool {
        if index >= range.width() {
            return false;
        }
        self.get_index(range.span().0 + index)
    }

    /// Sets bit `index` of a range. Indices past the range width are ignored.
    pub fn set_bit(&mut self, range: BitRange, index: usize, on: bool) {
        if index >= range.width() {
            return;
        }
        self.set_index(range.span().0 + index, on);
    }

    /// Inverts bit `index` of a range. Indices past the range width are ignored.
    pub fn flip_bit(&mut self, range: BitRange, index: usize) {
        if index >= range.width() {
            return;
        }
        let absolute = range.span().0 + index;
        let on = self.get_index(absolute);
        self.set_index(absolute, !on);
    }

    /// Writes a segment pattern into a range.
    ///
    /// The pattern is truncated to the range width. When more than
    /// [`DECIMAL_POINT_OFFSET`] cells land in the range, the decimal point
    /// cell is forced to `decimal_point`.
    pub fn write(&mut self, range: BitRange, pattern: Pattern, decimal_point: bool) {
        let start = range.span().0;
        let len = pattern.len().min(range.width());

        for offset in 0..len {
            if let Some(on) = pattern.cell(offset) {
                self.set_index(start + offset, on);
            }
        }

        if len > DECIMAL_POINT_OFFSET {
            self.set_index(start + DECIMAL_POINT_OFFSET, decimal_point);
        }
    }

    /// Packs the frame into its transmittable byte form.
    pub fn pack(&self) -> [u8; FRAME_SIZE] {
        self.bytes
    }
}
