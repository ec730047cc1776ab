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
/// # CBOR encoder
///
/// Walks an [`Item`] tree and writes its canonical binary form through a caller-supplied
/// [`EncodeSink`]. Every count (string length, array/map size, tag number) is emitted using the
/// minimal-width header that can represent it; the encoder never produces an indefinite-length
/// form, even when the tree being encoded was itself decoded from one.
use crate::error::{Error, ErrorKind, Result};
use crate::header::{self, MajorType};
use crate::item::{Item, ItemKind};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A sink that accepts encoded bytes.
///
/// Mirrors the reference implementation's `write(opaque, data, size) -> bytes_written` callback
/// as a small trait: `write` returns how many bytes it actually accepted, and accepting fewer
/// than requested signals failure (the encoder turns that into [`crate::error::ErrorKind::WriteFailed`]).
pub trait EncodeSink {
    /// Accept as many of `data`'s bytes as possible, returning the count actually accepted.
    fn write(&mut self, data: &[u8]) -> usize;
}

/// A sink that discards its input but counts how many bytes it was offered. Backs
/// [`encoded_size`].
struct CountingSink {
    count: usize,
}

impl EncodeSink for CountingSink {
    fn write(&mut self, data: &[u8]) -> usize {
        self.count += data.len();
        data.len()
    }
}

/// A sink that fills a fixed caller-supplied buffer, accepting fewer bytes than offered once
/// the buffer is full. Backs [`encode_into`].
struct BufferSink<'buf> {
    buf: &'buf mut [u8],
    written: usize,
}

impl<'buf> EncodeSink for BufferSink<'buf> {
    fn write(&mut self, data: &[u8]) -> usize {
        let capacity = self.buf.len() - self.written;
        let n = data.len().min(capacity);
        self.buf[self.written..self.written + n].copy_from_slice(&data[..n]);
        self.written += n;
        n
    }
}

/// Stateless CBOR encoder. `encode` borrows the sink for the duration of a single call, so a
/// single `Encoder` value can be reused across many encode calls against different sinks.
#[derive(Default)]
pub struct Encoder {
    _private: (),
}

impl Encoder {
    /// Construct an encoder. `Encoder` carries no configuration; it exists to mirror the
    /// reference implementation's `Encoder` value type and to leave room for future options
    /// without breaking callers.
    pub fn new() -> Self {
        Encoder { _private: () }
    }

    /// Encode `item` to `sink`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn encode<'arena>(&self, item: &Item<'arena>, sink: &mut dyn EncodeSink) -> Result<()> {
        let mut state = EncodeState { sink, written: 0 };
        state.encode_item(item)
    }
}

struct EncodeState<'s> {
    sink: &'s mut dyn EncodeSink,
    written: usize,
}

impl<'s> EncodeState<'s> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let n = self.sink.write(data);
        self.written += n;
        if n < data.len() {
            return Err(Error::new(ErrorKind::WriteFailed, self.written, 0, None));
        }
        Ok(())
    }

    fn encode_header_and_count(&mut self, major: MajorType, count: u64) -> Result<()> {
        let short_count = header::minimal_short_count(count);
        self.write(&[header::pack(major, short_count)])?;
        match header::count_width(short_count) {
            1 => self.write(&(count as u8).to_be_bytes()),
            2 => self.write(&(count as u16).to_be_bytes()),
            4 => self.write(&(count as u32).to_be_bytes()),
            8 => self.write(&count.to_be_bytes()),
            _ => Ok(()),
        }
    }

    fn encode_item<'arena>(&mut self, item: &Item<'arena>) -> Result<()> {
        match &item.kind {
            ItemKind::Invalid => Err(Error::new(ErrorKind::InvalidItemType, self.written, 0, Some("invalid"))),
            ItemKind::Uint64(n) => self.encode_header_and_count(MajorType::Uint, *n),
            ItemKind::Int64(n) => {
                if *n >= 0 {
                    self.encode_header_and_count(MajorType::Uint, *n as u64)
                } else {
                    // value = -1 - count, so count = -(value + 1) = !(value as u64)
                    let count = !(*n as u64);
                    self.encode_header_and_count(MajorType::Nint, count)
                }
            }
            ItemKind::Bytes(b) => {
                self.encode_header_and_count(MajorType::Bytes, b.len() as u64)?;
                self.write(b)
            }
            ItemKind::String(s) => {
                self.encode_header_and_count(MajorType::Text, s.len() as u64)?;
                self.write(s)
            }
            ItemKind::Array(arr) => {
                self.encode_header_and_count(MajorType::Array, arr.items.len() as u64)?;
                for it in arr.items {
                    self.encode_item(it)?;
                }
                Ok(())
            }
            ItemKind::Map(m) => {
                self.encode_header_and_count(MajorType::Map, m.keys.len() as u64)?;
                for (k, v) in m.keys.iter().zip(m.values.iter()) {
                    self.encode_item(k)?;
                    self.encode_item(v)?;
                }
                Ok(())
            }
            ItemKind::Tag(t) => {
                self.encode_header_and_count(MajorType::Tag, t.tag)?;
                self.encode_item(t.item)
            }
            ItemKind::Boolean(b) => {
                self.encode_header_and_count(MajorType::Special, if *b { 21 } else { 20 })
            }
            ItemKind::Null => self.encode_header_and_count(MajorType::Special, 22),
            ItemKind::Undefined => self.encode_header_and_count(MajorType::Special, 23),
            ItemKind::Float16(bits) => {
                self.write(&[header::pack(MajorType::Special, 25)])?;
                self.write(&bits.to_be_bytes())
            }
            ItemKind::Float32(f) => {
                self.write(&[header::pack(MajorType::Special, 26)])?;
                self.write(&f.to_bits().to_be_bytes())
            }
            ItemKind::Float64(f) => {
                self.write(&[header::pack(MajorType::Special, 27)])?;
                self.write(&f.to_bits().to_be_bytes())
            }
            ItemKind::Simple(v) => {
                if (20..32).contains(v) {
                    return Err(Error::new(ErrorKind::InvalidSimpleValue, self.written, 0, Some("simple")));
                }
                self.encode_header_and_count(MajorType::Special, *v as u64)
            }
        }
    }
}

/// The number of bytes `encode(item, ...)` would write, computed with a sink that discards its
/// input. Fails under the same conditions `encode` would (an `Invalid` item in the tree, or a
/// reserved simple value).
pub fn encoded_size(item: &Item<'_>) -> Result<usize> {
    let mut sink = CountingSink { count: 0 };
    Encoder::new().encode(item, &mut sink)?;
    Ok(sink.count)
}

/// Encode `item` into `buf`, returning the number of bytes written. Fails with
/// [`ErrorKind::WriteFailed`] if `buf` is not large enough to hold the encoding.
pub fn encode_into(item: &Item<'_>, buf: &mut [u8]) -> Result<usize> {
    let mut sink = BufferSink { buf, written: 0 };
    Encoder::new().encode(item, &mut sink)?;
    Ok(sink.written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpArena;
    use crate::decode::Decoder;
    use crate::item::{Array, Map};

    fn encode_to_vec(item: &Item<'_>) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        let n = encode_into(item, &mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn encodes_small_uint_canonically() {
        let item = Item::new(ItemKind::Uint64(0));
        assert_eq!(encode_to_vec(&item), vec![0x00]);
    }

    #[test]
    fn encodes_max_u64_with_eight_byte_header() {
        let item = Item::new(ItemKind::Uint64(u64::MAX));
        assert_eq!(
            encode_to_vec(&item),
            vec![0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn encodes_negative_integer() {
        let item = Item::new(ItemKind::Int64(-1));
        assert_eq!(encode_to_vec(&item), vec![0x20]);
    }

    #[test]
    fn array_round_trips_as_definite_length() {
        let elems = [
            Item::new(ItemKind::Uint64(1)),
            Item::new(ItemKind::Uint64(2)),
            Item::new(ItemKind::Uint64(3)),
        ];
        let item = Item::new(ItemKind::Array(Array { items: &elems }));
        assert_eq!(encode_to_vec(&item), vec![0x83, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn invalid_item_fails_to_encode() {
        let item = Item::new(ItemKind::Invalid);
        let mut buf = [0u8; 8];
        let err = encode_into(&item, &mut buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemType);
    }

    #[test]
    fn reserved_simple_value_fails_to_encode() {
        let item = Item::new(ItemKind::Simple(25));
        let mut buf = [0u8; 8];
        let err = encode_into(&item, &mut buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSimpleValue);
    }

    #[test]
    fn short_sink_reports_write_failed() {
        let item = Item::new(ItemKind::Bytes(b"hello world"));
        let mut buf = [0u8; 3];
        let err = encode_into(&item, &mut buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WriteFailed);
    }

    #[test]
    fn encoded_size_matches_actual_length() {
        let elems = [Item::new(ItemKind::Uint64(1)), Item::new(ItemKind::Uint64(300))];
        let item = Item::new(ItemKind::Array(Array { items: &elems }));
        assert_eq!(encoded_size(&item).unwrap(), encode_to_vec(&item).len());
    }

    #[test]
    fn decode_then_encode_definite_length_matches_canonical_form() {
        // 9f 01 02 03 ff decodes to an indefinite-length array; encoding it back must produce
        // the definite-length form 83 01 02 03.
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        let input = [0x9f, 0x01, 0x02, 0x03, 0xff];
        let item = decoder.decode_exact(&input).unwrap();
        assert_eq!(encode_to_vec(item), vec![0x83, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn map_with_mixed_values_round_trips_by_strict_equality() {
        let backing = BumpArena::new();
        let key = Item::new(ItemKind::String(b"key"));
        let value = Item::new(ItemKind::String(b"value"));
        let keys = [key];
        let values = [value];
        let map_item = Item::new(ItemKind::Map(Map {
            keys: &keys,
            values: &values,
        }));
        let bytes = encode_to_vec(&map_item);
        let backing2 = BumpArena::new();
        let decoder = Decoder::new(&backing2);
        let leaked: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let decoded = decoder.decode_exact(leaked).unwrap();
        assert!(decoded.strict_eq(&map_item));
    }
}
