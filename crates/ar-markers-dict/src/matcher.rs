//! Dictionary matching under 90-degree rotations.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeMatch {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that `observed == rotate_code(dict_code, rotation)`,
    /// in 90-degree clockwise steps.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

/// Matcher for one fixed dictionary.
///
/// Rotated variants of every code are precomputed once; lookup is a
/// brute-force scan over ids and rotations, which for a 50-symbol dictionary
/// is a few hundred XOR/popcounts per candidate quad.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher for the given dictionary and Hamming budget.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        assert!(
            dict.bit_count() <= 64,
            "marker_size {} implies {} bits > 64 (unsupported)",
            dict.marker_size,
            dict.bit_count()
        );

        let rotated = dict
            .codes
            .iter()
            .map(|&base| {
                [0u8, 1, 2, 3].map(|rot| rotate_code(base, dict.marker_size, rot))
            })
            .collect();

        Self {
            dict,
            max_hamming,
            rotated,
        }
    }

    /// Dictionary used by this matcher.
    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    /// Find the best match within the Hamming budget.
    pub fn match_code(&self, observed: u64) -> Option<CodeMatch> {
        let mut best: Option<CodeMatch> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_none_or(|b| hamming < b.hamming) {
                    best = Some(CodeMatch {
                        id: id as u32,
                        rotation: rot as u8,
                        hamming,
                    });
                    if hamming == 0 {
                        return best;
                    }
                }
            }
        }

        best
    }
}

/// Rotate a row-major packed code (`idx = y * n + x`) by `rot` 90-degree
/// clockwise steps.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
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
            let bit = (code >> (sy * n + sx)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}
