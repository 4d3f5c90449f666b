//! Built-in dictionaries.

use crate::Dictionary;

/// Row words of the original ArUco layout. A set bit (MSB = leftmost cell)
/// is a white cell; each row carries two bits of the marker id.
const ARUCO_ORIGINAL_WORDS: [u8; 4] = [0x10, 0x17, 0x09, 0x0e];

const fn aruco_original_code(id: usize) -> u64 {
    let mut code = 0u64;
    let mut y = 0;
    while y < 5 {
        let word = ARUCO_ORIGINAL_WORDS[(id >> (2 * (4 - y))) & 0x3];
        let mut x = 0;
        while x < 5 {
            let white = (word >> (4 - x)) & 1 == 1;
            if !white {
                code |= 1u64 << (y * 5 + x);
            }
            x += 1;
        }
        y += 1;
    }
    code
}

const fn aruco_original_codes() -> [u64; 1024] {
    let mut codes = [0u64; 1024];
    let mut id = 0;
    while id < 1024 {
        codes[id] = aruco_original_code(id);
        id += 1;
    }
    codes
}

static ARUCO_ORIGINAL_CODES: [u64; 1024] = aruco_original_codes();

/// The original ArUco dictionary: 1024 markers of 5x5 bits.
pub const DICT_ARUCO_ORIGINAL: Dictionary = Dictionary {
    name: "DICT_ARUCO_ORIGINAL",
    marker_size: 5,
    max_correction_bits: 0,
    codes: &ARUCO_ORIGINAL_CODES,
};

/// Names accepted by [`builtin_dictionary`].
pub const BUILTIN_DICTIONARY_NAMES: &[&str] = &["DICT_ARUCO_ORIGINAL"];

/// Look up a built-in dictionary by name. The `DICT_` prefix is optional and
/// matching ignores ASCII case.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    let upper = name.trim().to_ascii_uppercase();
    let key = upper.strip_prefix("DICT_").unwrap_or(&upper);
    match key {
        "ARUCO_ORIGINAL" => Some(DICT_ARUCO_ORIGINAL),
        _ => None,
    }
}
