//! Embedded built-in dictionary.
//!
//! The marker set is a 6×6, 50-symbol dictionary. Code values are the first
//! 50 entries of the AprilTag 36h11 family (row-major bit packing, black = 1),
//! which gives a minimum inter-code Hamming distance of 11 across rotations.

#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

#[rustfmt::skip]
const DICT_6X6_50_CODES: [u64; 50] = [
    0x000047b7310b, 0x0009c712bec7, 0x0001127334c1, 0x000b3db82789,
    0x000e495c72d1, 0x000e169b7d93, 0x000159a190a5, 0x000da3830123,
    0x000f1c8dce3d, 0x0002ed68409c, 0x000357ef0a86, 0x000dafad93d8,
    0x000578c43c14, 0x000cf961b690, 0x000884a6edf2, 0x000c43c36636,
    0x000a7e06756e, 0x000fc40927ec, 0x0007310cb972, 0x00098ee86e5d,
    0x00005dd5d489, 0x0008f0355b05, 0x000ca5f7444f, 0x000baaf19871,
    0x0002619d07b5, 0x000a91fed663, 0x00017b9a5baf, 0x00042b5e4e65,
    0x00027f93ad96, 0x000ada726312, 0x000ff07d6180, 0x0004edee1dc3,
    0x0000a5047c3b, 0x0007a222a935, 0x0004992deb27, 0x0009094865c6,
    0x0000ccebe54a, 0x00096caf7ad6, 0x0006f8b31646, 0x000a77b1d878,
    0x000dcdbe966a, 0x0008e6bd84c9, 0x0006a656ed19, 0x00075317b841,
    0x0008ad3d20af, 0x0006efdc697d, 0x0002764204c8, 0x00054c6d469a,
    0x000434aa4d58, 0x00023d80a0ae,
];

/// The 6×6, 50-symbol dictionary used by the AR session.
pub const DICT_6X6_50: Dictionary = Dictionary {
    name: "DICT_6X6_50",
    marker_size: 6,
    max_correction_bits: 5,
    codes: &DICT_6X6_50_CODES,
};

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name {
        "DICT_6X6_50" => Some(DICT_6X6_50),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::rotate_code;

    #[test]
    fn builtin_lookup_by_name() {
        let dict = builtin_dictionary("DICT_6X6_50").expect("builtin dict");
        assert_eq!(dict.marker_size, 6);
        assert_eq!(dict.len(), 50);
        assert!(builtin_dictionary("DICT_9X9_1000").is_none());
    }

    #[test]
    fn codes_are_unique_under_rotation() {
        let dict = DICT_6X6_50;
        for (i, &a) in dict.codes.iter().enumerate() {
            for &b in &dict.codes[i + 1..] {
                for rot in 0..4 {
                    assert_ne!(a, rotate_code(b, dict.marker_size, rot));
                }
            }
        }
    }

    #[test]
    fn codes_fit_bit_count() {
        for &c in DICT_6X6_50.codes {
            assert_eq!(c >> DICT_6X6_50.bit_count(), 0);
        }
    }
}
