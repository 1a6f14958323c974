//! Decoding of scanner input reports into text.
//!
//! The scanner emulates a boot protocol keyboard and sends one 8-byte report per keystroke:
//!
//! ```text
//! [0, 0, 11, 0, 0, 0, 0, 0]   h
//! [0, 0, 23, 0, 0, 0, 0, 0]   t
//! [0, 0,  0, 0, 0, 0, 0, 0]   idle, no key
//! [2, 0, 51, 0, 0, 0, 0, 0]   :  (';' with shift)
//! ```
//!
//! Only byte 0 (modifier) and byte 2 (first usage code) are looked at. Usage codes are the
//! keyboard page of the HID Usage Tables: https://www.usb.org/sites/default/files/documents/hut1_12v2.pdf

use derive_more::{AsRef, From};

use crate::constants::{HID_REPORT_SIZE, SHIFT_MODIFIER};

/// Glyph the scanner's escape key decodes to.
pub const ESCAPE_GLYPH: &str = "\u{E01B}";

/// Glyph that terminates a scanned line.
pub const NEWLINE_GLYPH: &str = "\n";

/// Usage code to `[unshifted, shifted]` glyph pairs, sorted by code.
///
/// 100 and 103 are not standard US layout keys but this scanner sends them.
static GLYPH_TABLE: [(u8, [&str; 2]); 56] = [
    (0, ["", ""]),
    (4, ["a", "A"]),
    (5, ["b", "B"]),
    (6, ["c", "C"]),
    (7, ["d", "D"]),
    (8, ["e", "E"]),
    (9, ["f", "F"]),
    (10, ["g", "G"]),
    (11, ["h", "H"]),
    (12, ["i", "I"]),
    (13, ["j", "J"]),
    (14, ["k", "K"]),
    (15, ["l", "L"]),
    (16, ["m", "M"]),
    (17, ["n", "N"]),
    (18, ["o", "O"]),
    (19, ["p", "P"]),
    (20, ["q", "Q"]),
    (21, ["r", "R"]),
    (22, ["s", "S"]),
    (23, ["t", "T"]),
    (24, ["u", "U"]),
    (25, ["v", "V"]),
    (26, ["w", "W"]),
    (27, ["x", "X"]),
    (28, ["y", "Y"]),
    (29, ["z", "Z"]),
    (30, ["1", "!"]),
    (31, ["2", "@"]),
    (32, ["3", "#"]),
    (33, ["4", "$"]),
    (34, ["5", "%"]),
    (35, ["6", "^"]),
    (36, ["7", "&"]),
    (37, ["8", "*"]),
    (38, ["9", "("]),
    (39, ["0", ")"]),
    (40, [NEWLINE_GLYPH, NEWLINE_GLYPH]),
    (41, [ESCAPE_GLYPH, ESCAPE_GLYPH]),
    (42, ["\x08", "\x08"]),
    (43, ["\t", "\t"]),
    (44, [" ", " "]),
    (45, ["_", "_"]),
    (46, ["=", "+"]),
    (47, ["[", "{"]),
    (48, ["]", "}"]),
    (49, ["\\", "|"]),
    (50, ["#", "~"]),
    (51, [";", ":"]),
    (52, ["'", "\""]),
    (53, ["`", "~"]),
    (54, [",", "<"]),
    (55, [".", ">"]),
    (56, ["/", "?"]),
    (100, ["\\", "|"]),
    (103, ["=", "="]),
];

/// Looks up the `[unshifted, shifted]` glyphs of a usage code.
pub fn glyphs(usage: u8) -> Option<&'static [&'static str; 2]> {
    GLYPH_TABLE
        .binary_search_by_key(&usage, |&(code, _)| code)
        .ok()
        .map(|i| &GLYPH_TABLE[i].1)
}

/// Usage codes that have an entry in the glyph table, in ascending order.
pub fn mapped_usages() -> impl Iterator<Item = u8> {
    GLYPH_TABLE.iter().map(|&(code, _)| code)
}

/// One raw input report as read from the scanner's interrupt endpoint.
#[derive(Debug, Default, Eq, PartialEq, Clone, Copy, From, AsRef)]
pub struct HidReport([u8; HID_REPORT_SIZE]);

impl HidReport {
    pub const fn new(bytes: [u8; HID_REPORT_SIZE]) -> Self {
        HidReport(bytes)
    }

    pub fn modifier(&self) -> u8 {
        self.0[0]
    }

    pub fn usage(&self) -> u8 {
        self.0[2]
    }

    /// Exact comparison against [`SHIFT_MODIFIER`]; other modifier bits do not count.
    pub fn is_shifted(&self) -> bool {
        self.modifier() == SHIFT_MODIFIER
    }

    /// No key held.
    pub fn is_idle(&self) -> bool {
        self.usage() == 0
    }

    /// Decodes this report. See [`decode`].
    pub fn decode(&self) -> &'static str {
        let shift = if self.is_shifted() { 1 } else { 0 };
        glyphs(self.usage()).map_or("", |pair| pair[shift])
    }
}

/// Converts one report to the glyph it types, or `""` when its usage code has no mapping.
pub fn decode(report: &[u8; HID_REPORT_SIZE]) -> &'static str {
    HidReport::new(*report).decode()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(modifier: u8, usage: u8) -> [u8; HID_REPORT_SIZE] {
        [modifier, 0, usage, 0, 0, 0, 0, 0]
    }

    #[test]
    fn table_is_sorted_and_unique() {
        let codes: Vec<u8> = mapped_usages().collect();
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_mapped_code_decodes_both_shift_states() {
        for code in mapped_usages() {
            let pair = glyphs(code).unwrap();
            assert_eq!(decode(&report(0, code)), pair[0], "code {}", code);
            assert_eq!(decode(&report(2, code)), pair[1], "code {}", code);
        }
    }

    #[test]
    fn unmapped_codes_decode_to_empty() {
        let mapped: Vec<u8> = mapped_usages().collect();
        for code in (0..=255u8).filter(|c| !mapped.contains(c)) {
            for &modifier in &[0u8, 2, 0x20, 0xff] {
                assert_eq!(decode(&report(modifier, code)), "", "code {}", code);
            }
        }
    }

    #[test]
    fn idle_report_decodes_through_table_entry() {
        assert_eq!(glyphs(0), Some(&["", ""]));
        assert_eq!(decode(&[0; HID_REPORT_SIZE]), "");
        assert!(HidReport::new([0; HID_REPORT_SIZE]).is_idle());
    }

    #[test]
    fn letters_digits_and_symbols() {
        assert_eq!(decode(&report(0, 4)), "a");
        assert_eq!(decode(&report(2, 29)), "Z");
        assert_eq!(decode(&report(0, 39)), "0");
        assert_eq!(decode(&report(2, 30)), "!");
        assert_eq!(decode(&report(2, 51)), ":");
        assert_eq!(decode(&report(2, 52)), "\"");
        assert_eq!(decode(&report(0, 40)), NEWLINE_GLYPH);
        assert_eq!(decode(&report(2, 41)), ESCAPE_GLYPH);
        assert_eq!(decode(&report(0, 42)), "\u{8}");
        assert_eq!(decode(&report(0, 43)), "\t");
        assert_eq!(decode(&report(0, 44)), " ");
    }

    #[test]
    fn vendor_codes_are_kept() {
        assert_eq!(decode(&report(0, 100)), "\\");
        assert_eq!(decode(&report(2, 100)), "|");
        assert_eq!(decode(&report(0, 103)), "=");
        assert_eq!(decode(&report(2, 103)), "=");
    }

    #[test]
    fn only_exact_modifier_two_shifts() {
        // Right shift (0x20), left shift + ctrl (0x03) and both shifts (0x22) stay unshifted.
        for &modifier in &[0x01u8, 0x03, 0x20, 0x22, 0xff] {
            assert_eq!(decode(&report(modifier, 4)), "a", "modifier {:#04x}", modifier);
        }
        assert_eq!(decode(&report(0x02, 4)), "A");
    }

    #[test]
    fn only_bytes_zero_and_two_matter() {
        let plain = report(2, 51);
        let noisy = [2, 0xaa, 51, 4, 5, 6, 7, 0xff];
        assert_eq!(decode(&plain), decode(&noisy));

        let plain = report(0, 11);
        let noisy = [0, 1, 11, 23, 19, 40, 0, 9];
        assert_eq!(decode(&plain), decode(&noisy));
    }

    #[test]
    fn report_accessors() {
        let r = HidReport::from([2, 0, 51, 0, 0, 0, 0, 0]);
        assert_eq!(r.modifier(), 2);
        assert_eq!(r.usage(), 51);
        assert!(r.is_shifted());
        assert!(!r.is_idle());
        assert_eq!(r.decode(), ":");
        assert_eq!(r.as_ref(), &[2, 0, 51, 0, 0, 0, 0, 0]);
    }
}
