/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all copies or
 * substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/// Packing, parsing and legality of the one-byte CBOR item header.
///
/// The initial byte of every item is `(major << 5) | short_count`. `short_count` either carries a
/// literal count (0..=23), selects how many following bytes hold the count (24/25/26/27), marks
/// an indefinite-length container (31, legal only for bytes/text/array/map/special), or is
/// reserved and always illegal (28/29/30).

/// One of the eight CBOR major types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MajorType {
    /// Major type 0: unsigned integer.
    Uint,
    /// Major type 1: negative integer.
    Nint,
    /// Major type 2: byte string.
    Bytes,
    /// Major type 3: text string.
    Text,
    /// Major type 4: array.
    Array,
    /// Major type 5: map.
    Map,
    /// Major type 6: tag.
    Tag,
    /// Major type 7: simple value, boolean, null, undefined, float, or break.
    Special,
}

impl MajorType {
    /// Recover the major type from the top three bits of an initial byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte >> 5 {
            0 => MajorType::Uint,
            1 => MajorType::Nint,
            2 => MajorType::Bytes,
            3 => MajorType::Text,
            4 => MajorType::Array,
            5 => MajorType::Map,
            6 => MajorType::Tag,
            _ => MajorType::Special,
        }
    }

    fn bits(self) -> u8 {
        match self {
            MajorType::Uint => 0,
            MajorType::Nint => 1,
            MajorType::Bytes => 2,
            MajorType::Text => 3,
            MajorType::Array => 4,
            MajorType::Map => 5,
            MajorType::Tag => 6,
            MajorType::Special => 7,
        }
    }

    /// `true` for the major types that may legally use short-count 31 (indefinite length).
    fn allows_indefinite(self) -> bool {
        matches!(
            self,
            MajorType::Bytes | MajorType::Text | MajorType::Array | MajorType::Map | MajorType::Special
        )
    }
}

/// The literal short-count values that select a following 1/2/4/8-byte count field.
pub const SHORT_COUNT_1_BYTE: u8 = 24;
pub const SHORT_COUNT_2_BYTE: u8 = 25;
pub const SHORT_COUNT_4_BYTE: u8 = 26;
pub const SHORT_COUNT_8_BYTE: u8 = 27;
/// Indefinite-length marker / break byte short-count.
pub const SHORT_COUNT_INDEFINITE: u8 = 31;
/// The literal break byte, `0xFF`: major type 7, short-count 31.
pub const BREAK: u8 = 0xFF;

/// Pack a major type and short-count into an initial byte. `short_count` is masked to 5 bits.
pub fn pack(major: MajorType, short_count: u8) -> u8 {
    (major.bits() << 5) | (short_count & 0x1F)
}

/// Whether `short_count` is a legal additional-information value for `major`.
///
/// Short-counts 28, 29 and 30 are reserved and always illegal. Short-count 31 (indefinite
/// length) is legal only for bytes, text, array, map and special; major types 0 (uint), 1 (nint)
/// and 6 (tag) never allow it.
pub fn is_legal(major: MajorType, short_count: u8) -> bool {
    match short_count {
        28..=30 => false,
        SHORT_COUNT_INDEFINITE => major.allows_indefinite(),
        _ => true,
    }
}

/// The smallest short-count whose range can represent `count` (0..=23 literal, else the
/// width-selector for a following 1/2/4/8-byte field).
pub fn minimal_short_count(count: u64) -> u8 {
    if count <= 23 {
        count as u8
    } else if count <= u8::MAX as u64 {
        SHORT_COUNT_1_BYTE
    } else if count <= u16::MAX as u64 {
        SHORT_COUNT_2_BYTE
    } else if count <= u32::MAX as u64 {
        SHORT_COUNT_4_BYTE
    } else {
        SHORT_COUNT_8_BYTE
    }
}

/// Number of additional bytes following the initial byte that this short-count implies, for the
/// count-width forms. `0` for a literal short-count, indefinite length, or a reserved value.
pub fn count_width(short_count: u8) -> usize {
    match short_count {
        SHORT_COUNT_1_BYTE => 1,
        SHORT_COUNT_2_BYTE => 2,
        SHORT_COUNT_4_BYTE => 4,
        SHORT_COUNT_8_BYTE => 8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_short_counts_always_illegal() {
        for major in [
            MajorType::Uint,
            MajorType::Nint,
            MajorType::Bytes,
            MajorType::Text,
            MajorType::Array,
            MajorType::Map,
            MajorType::Tag,
            MajorType::Special,
        ] {
            assert!(!is_legal(major, 28));
            assert!(!is_legal(major, 29));
            assert!(!is_legal(major, 30));
        }
    }

    #[test]
    fn indefinite_length_only_for_strings_containers_and_special() {
        assert!(!is_legal(MajorType::Uint, 31));
        assert!(!is_legal(MajorType::Nint, 31));
        assert!(!is_legal(MajorType::Tag, 31));
        assert!(is_legal(MajorType::Bytes, 31));
        assert!(is_legal(MajorType::Text, 31));
        assert!(is_legal(MajorType::Array, 31));
        assert!(is_legal(MajorType::Map, 31));
        assert!(is_legal(MajorType::Special, 31));
    }

    #[test]
    fn minimal_width_selection_matches_byte_ranges() {
        assert_eq!(minimal_short_count(0), 0);
        assert_eq!(minimal_short_count(23), 23);
        assert_eq!(minimal_short_count(24), SHORT_COUNT_1_BYTE);
        assert_eq!(minimal_short_count(u8::MAX as u64), SHORT_COUNT_1_BYTE);
        assert_eq!(minimal_short_count(u8::MAX as u64 + 1), SHORT_COUNT_2_BYTE);
        assert_eq!(minimal_short_count(u16::MAX as u64), SHORT_COUNT_2_BYTE);
        assert_eq!(minimal_short_count(u16::MAX as u64 + 1), SHORT_COUNT_4_BYTE);
        assert_eq!(minimal_short_count(u32::MAX as u64), SHORT_COUNT_4_BYTE);
        assert_eq!(minimal_short_count(u32::MAX as u64 + 1), SHORT_COUNT_8_BYTE);
        assert_eq!(minimal_short_count(u64::MAX), SHORT_COUNT_8_BYTE);
    }

    #[test]
    fn pack_round_trips_major_type() {
        let byte = pack(MajorType::Array, 5);
        assert_eq!(MajorType::from_byte(byte), MajorType::Array);
        assert_eq!(byte & 0x1F, 5);
    }
}
