//! Dictionary metadata and packed marker codes.

/// A fixed ArUco-style dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Canonical name, e.g. `DICT_ARUCO_ORIGINAL`.
    pub name: &'static str,
    /// Marker side length in inner bits.
    pub marker_size: usize,
    /// Maximum number of bit errors the dictionary is designed to correct.
    pub max_correction_bits: u8,
    /// One `u64` per marker id holding the inner `marker_size x marker_size`
    /// bits in row-major order, **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of markers (valid ids are `0..len()`).
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Packed code of marker `id`.
    #[inline]
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Whether the inner bit at column `x`, row `y` of `code` is black.
    #[inline]
    pub fn bit(&self, code: u64, x: usize, y: usize) -> bool {
        (code >> (y * self.marker_size + x)) & 1 == 1
    }
}
