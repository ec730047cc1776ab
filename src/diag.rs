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
/// # CBOR diagnostic notation
///
/// Renders a decoded (or hand-built) [`Item`] tree as RFC 8949 §8 diagnostic notation, e.g.
/// `{1: "a", 2: [1, 2, 3]}`. This exists for debugging and test-failure output; the decoder and
/// encoder never consult it. Byte strings are rendered as `h'...'` hex. Indefinite-length
/// information is not recoverable from a decoded tree and so is never printed: every container
/// prints in its definite-length form regardless of how it was originally encoded.
use std::io;
use std::io::Write;

use crate::item::{Item, ItemKind};

/// Write `item`'s diagnostic notation to `out`.
pub fn write_diag(item: &Item<'_>, out: &mut dyn Write) -> io::Result<()> {
    diag_item(item, out)
}

/// `item`'s diagnostic notation as an owned `String`.
pub fn to_diag_string(item: &Item<'_>) -> String {
    let mut buf = Vec::new();
    // A `Vec<u8>` sink never fails, so the only possible error is one diag_item cannot produce.
    write_diag(item, &mut buf).expect("writing to a Vec<u8> cannot fail");
    String::from_utf8(buf).expect("diagnostic notation is always valid UTF-8")
}

fn diag_item(item: &Item<'_>, out: &mut dyn Write) -> io::Result<()> {
    match &item.kind {
        ItemKind::Invalid => write!(out, "<invalid>"),
        ItemKind::Uint64(n) => write!(out, "{}", n),
        ItemKind::Int64(n) => write!(out, "{}", n),
        ItemKind::Bytes(b) => diag_bytes(b, out),
        ItemKind::String(s) => write!(out, "\"{}\"", escape_text(String::from_utf8_lossy(s).as_ref())),
        ItemKind::Array(arr) => {
            write!(out, "[")?;
            for (i, elem) in arr.items.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                diag_item(elem, out)?;
            }
            write!(out, "]")
        }
        ItemKind::Map(m) => {
            write!(out, "{{")?;
            for (i, (k, v)) in m.keys.iter().zip(m.values.iter()).enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                diag_item(k, out)?;
                write!(out, ": ")?;
                diag_item(v, out)?;
            }
            write!(out, "}}")
        }
        ItemKind::Tag(t) => {
            write!(out, "{}(", t.tag)?;
            diag_item(t.item, out)?;
            write!(out, ")")
        }
        ItemKind::Boolean(b) => write!(out, "{}", b),
        ItemKind::Null => write!(out, "null"),
        ItemKind::Undefined => write!(out, "undefined"),
        ItemKind::Float16(bits) => write!(out, "{}", half::f16::from_bits(*bits)),
        ItemKind::Float32(f) => write!(out, "{}", f),
        ItemKind::Float64(f) => write!(out, "{}", f),
        ItemKind::Simple(v) => write!(out, "simple({})", v),
    }
}

fn diag_bytes(b: &[u8], out: &mut dyn Write) -> io::Result<()> {
    write!(out, "h'")?;
    for byte in b {
        write!(out, "{:02x}", byte)?;
    }
    write!(out, "'")
}

fn escape_text(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpArena;
    use crate::decode::Decoder;

    #[test]
    fn renders_map_with_array_value() {
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        // {1: [1, 2, 3]}
        let input = [0xa1, 0x01, 0x83, 0x01, 0x02, 0x03];
        let item = decoder.decode_exact(&input).unwrap();
        assert_eq!(to_diag_string(item), "{1: [1, 2, 3]}");
    }

    #[test]
    fn renders_byte_string_as_hex() {
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        let input = [0x43, 0x01, 0x02, 0x03];
        let item = decoder.decode_exact(&input).unwrap();
        assert_eq!(to_diag_string(item), "h'010203'");
    }

    #[test]
    fn renders_tag_and_negative_integer() {
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        // tag 1 (epoch) wrapping -1
        let input = [0xc1, 0x20];
        let item = decoder.decode_exact(&input).unwrap();
        assert_eq!(to_diag_string(item), "1(-1)");
    }

    #[test]
    fn escapes_quotes_and_backslashes_in_text() {
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        // text string: a"b\c
        let input = [0x64, 0x61, 0x22, 0x62, 0x5c];
        let item = decoder.decode_exact(&input).unwrap();
        assert_eq!(to_diag_string(item), "\"a\\\"b\\\\\"");
    }
}
