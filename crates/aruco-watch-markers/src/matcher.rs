//! Dictionary matching over the four marker rotations.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that `observed == rotate_code_u64(dict_code, n, rotation)`.
    pub rotation: u8,
    /// Hamming distance between the observed and the rotated dictionary code.
    pub hamming: u8,
}

/// Brute-force matcher for a fixed dictionary.
///
/// All four rotations of every code are precomputed, so a lookup is
/// `4 * len` XOR/popcounts; for 1024 markers that is well below the cost of
/// sampling the quad.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher accepting codes within `max_hamming` bit errors.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64, "{} bits do not fit a u64", dict.bit_count());
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&code| [0u8, 1, 2, 3].map(|rot| rotate_code_u64(code, n, rot)))
            .collect();
        Self {
            dict,
            max_hamming,
            rotated,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties go to the lower id, then the
    /// lower rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rotation, &candidate) in rots.iter().enumerate() {
                let hamming = (observed ^ candidate).count_ones();
                if hamming > self.max_hamming as u32 {
                    continue;
                }
                if best.is_some_and(|b| hamming >= b.hamming as u32) {
                    continue;
                }
                let m = Match {
                    id: id as u32,
                    rotation: rotation as u8,
                    hamming: hamming as u8,
                };
                if hamming == 0 {
                    return Some(m);
                }
                best = Some(m);
            }
        }
        best
    }
}

/// Rotate a row-major `n x n` code (`idx = y * n + x`) by `rot` quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_ARUCO_ORIGINAL;

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0x01b3_c5d7_u64;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code_u64(r, 5, 1);
        }
        assert_eq!(r, code);
        assert_eq!(
            rotate_code_u64(rotate_code_u64(code, 5, 1), 5, 1),
            rotate_code_u64(code, 5, 2)
        );
    }

    #[test]
    fn finds_rotated_code() {
        let dict = DICT_ARUCO_ORIGINAL;
        let matcher = Matcher::new(dict, 0);
        let observed = rotate_code_u64(dict.codes[300], dict.marker_size, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(
            m,
            Match {
                id: 300,
                rotation: 3,
                hamming: 0
            }
        );
    }

    #[test]
    fn respects_hamming_budget() {
        let dict = DICT_ARUCO_ORIGINAL;
        let one_off = dict.codes[7] ^ (1 << 12);

        assert!(Matcher::new(dict, 0).match_code(one_off).is_none());

        let m = Matcher::new(dict, 1).match_code(one_off).expect("match");
        assert_eq!(m.id, 7);
        assert_eq!(m.hamming, 1);
    }

    #[test]
    fn all_black_is_not_a_marker() {
        let matcher = Matcher::new(DICT_ARUCO_ORIGINAL, 0);
        assert!(matcher.match_code((1 << 25) - 1).is_none());
    }
}
