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
/// # CBOR decoder
///
/// Parses a contiguous byte slice into an arena-allocated [`Item`] tree. The decoder never
/// touches the global allocator: every item and every byte of string/array/map storage it
/// produces comes out of the [`Arena`] supplied at construction.
///
/// Indefinite-length strings, arrays and maps are accumulated into a transient singly-linked
/// chain threaded through each child's `parent` cell (see [`crate::item::Item`]); once the
/// terminating break byte is seen, the chain is walked into its final, contiguously-allocated
/// form (relocating each node's value with a raw pointer move, since `Item` cannot be `Copy`)
/// and every child's `parent` cell is overwritten to point at its true container. This avoids
/// needing a growable heap sequence during accumulation, which would defeat the point of
/// decoding into a caller-supplied arena in the first place.
use core::convert::TryFrom;
use core::mem::{align_of, size_of};

use crate::arena::Arena;
use crate::error::{Error, ErrorKind, Result};
use crate::header::{self, MajorType};
use crate::item::{Array, Item, ItemKind, Map, Tag};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Nesting cap applied when a [`Decoder`] is not given an explicit `max_depth`.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tag 55799, the "self-described CBOR" no-op wrapper. Stripped during decode.
const SELF_DESCRIBE_TAG: u64 = 55799;

/// Configured CBOR decoder bound to a single arena.
///
/// Build one with [`Decoder::new`], optionally tune it with [`Decoder::with_max_depth`] and
/// [`Decoder::with_reference_source`], then call [`Decoder::decode`] or
/// [`Decoder::decode_exact`] once per input buffer. A `Decoder` holds no mutable state of its
/// own between calls; all per-decode bookkeeping lives on the stack of the `decode` call.
pub struct Decoder<'arena, A: Arena<'arena>> {
    arena: &'arena A,
    max_depth: usize,
    reference_source: bool,
}

impl<'arena, A: Arena<'arena>> Decoder<'arena, A> {
    /// Create a decoder that allocates out of `arena`, using the default maximum nesting depth
    /// ([`DEFAULT_MAX_DEPTH`]) and copying string payloads into the arena rather than aliasing
    /// the input buffer.
    pub fn new(arena: &'arena A) -> Self {
        Decoder {
            arena,
            max_depth: DEFAULT_MAX_DEPTH,
            reference_source: false,
        }
    }

    /// Set the maximum nesting depth. `0` resets it to [`DEFAULT_MAX_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = if max_depth == 0 { DEFAULT_MAX_DEPTH } else { max_depth };
        self
    }

    /// If `true`, decoded byte- and text-string payloads alias the input buffer directly
    /// (zero-copy) instead of being copied into the arena. The caller must then keep the input
    /// buffer alive for as long as the decoded tree is used.
    pub fn with_reference_source(mut self, reference_source: bool) -> Self {
        self.reference_source = reference_source;
        self
    }

    /// Decode a single item from the front of `input`, returning it together with the number of
    /// bytes consumed. Trailing bytes after the root item are not an error; see
    /// [`Decoder::decode_exact`] for a wrapper that rejects them.
    #[cfg_attr(feature = "trace", trace)]
    pub fn decode(&self, input: &'arena [u8]) -> Result<(&'arena Item<'arena>, usize)> {
        let mut cursor = Cursor { input, pos: 0 };
        let root = self.decode_item(&mut cursor, 0)?;
        let root_ref = self.alloc_item_ref(root, 0, cursor.pos, "root")?;
        root_ref.adopt_children();
        Ok((root_ref, cursor.pos))
    }

    /// Decode a single item, requiring that it consume the entire input. Fails with
    /// [`ErrorKind::TrailingData`] if any bytes remain.
    #[cfg_attr(feature = "trace", trace)]
    pub fn decode_exact(&self, input: &'arena [u8]) -> Result<&'arena Item<'arena>> {
        let (item, consumed) = self.decode(input)?;
        if consumed != input.len() {
            return Err(Error::new(ErrorKind::TrailingData, consumed, 0, None));
        }
        Ok(item)
    }

    fn decode_item(&self, cursor: &mut Cursor<'arena>, depth: usize) -> Result<Item<'arena>> {
        if depth > self.max_depth {
            return Err(Error::new(ErrorKind::MaxDepthExceeded, cursor.pos, depth, None));
        }
        let header_pos = cursor.pos;
        let byte = cursor.read_u8(depth, None)?;
        let major = MajorType::from_byte(byte);
        let short_count = byte & 0x1F;
        if !header::is_legal(major, short_count) {
            return Err(Error::new(ErrorKind::InvalidItemHeader, header_pos, depth, None));
        }
        match major {
            MajorType::Uint => self.decode_uint(cursor, depth, short_count),
            MajorType::Nint => self.decode_nint(cursor, depth, short_count),
            MajorType::Bytes => self.decode_string(cursor, depth, short_count, true),
            MajorType::Text => self.decode_string(cursor, depth, short_count, false),
            MajorType::Array => self.decode_array(cursor, depth, short_count),
            MajorType::Map => self.decode_map(cursor, depth, short_count),
            MajorType::Tag => self.decode_tag(cursor, depth, short_count),
            MajorType::Special => self.decode_special(cursor, depth, short_count),
        }
    }

    fn decode_uint(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        let n = self.read_definite_count(cursor, short_count, depth, Some("uint64"))?;
        Ok(Item::new(ItemKind::Uint64(n)))
    }

    fn decode_nint(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        let n = self.read_definite_count(cursor, short_count, depth, Some("int64"))?;
        if n > i64::MAX as u64 {
            return Err(Error::new(ErrorKind::IntegerOverflow, cursor.pos, depth, Some("int64")));
        }
        // Safe: n <= i64::MAX, so both the negation and the subsequent -1 stay in range.
        let value = -(n as i64) - 1;
        Ok(Item::new(ItemKind::Int64(value)))
    }

    fn decode_string(
        &self,
        cursor: &mut Cursor<'arena>,
        depth: usize,
        short_count: u8,
        is_bytes: bool,
    ) -> Result<Item<'arena>> {
        let item_desc = if is_bytes { "bytes" } else { "string" };
        match self.read_count(cursor, short_count, depth)? {
            Count::Definite(len) => {
                let len = to_usize(len, cursor.pos, depth, item_desc)?;
                let raw = cursor.read_bytes(len, depth, Some(item_desc))?;
                let payload = self.own_bytes(raw, depth, cursor.pos, item_desc)?;
                self.finish_string(payload, is_bytes)
            }
            Count::Indefinite => self.decode_indefinite_string(cursor, depth, is_bytes),
        }
    }

    fn decode_indefinite_string(
        &self,
        cursor: &mut Cursor<'arena>,
        depth: usize,
        is_bytes: bool,
    ) -> Result<Item<'arena>> {
        let item_desc = if is_bytes { "bytes" } else { "string" };
        let expected_major = if is_bytes { MajorType::Bytes } else { MajorType::Text };
        let mut head: Option<&'arena Item<'arena>> = None;
        let mut total_len: usize = 0;
        loop {
            let next = cursor.peek(depth, Some(item_desc))?;
            if next == header::BREAK {
                cursor.pos += 1;
                break;
            }
            let chunk_pos = cursor.pos;
            let chunk_byte = cursor.read_u8(depth, Some(item_desc))?;
            let chunk_major = MajorType::from_byte(chunk_byte);
            let chunk_short_count = chunk_byte & 0x1F;
            if chunk_major != expected_major || chunk_short_count == header::SHORT_COUNT_INDEFINITE {
                return Err(Error::new(ErrorKind::InvalidChunkedString, chunk_pos, depth, Some(item_desc)));
            }
            if !header::is_legal(chunk_major, chunk_short_count) {
                return Err(Error::new(ErrorKind::InvalidItemHeader, chunk_pos, depth, Some(item_desc)));
            }
            let len = self.read_definite_count(cursor, chunk_short_count, depth, Some(item_desc))?;
            let len = to_usize(len, cursor.pos, depth, item_desc)?;
            let chunk_bytes = cursor.read_bytes(len, depth, Some(item_desc))?;
            total_len = total_len
                .checked_add(len)
                .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, cursor.pos, depth, Some(item_desc)))?;
            let chunk_item =
                self.alloc_item_ref(Item::new(ItemKind::Bytes(chunk_bytes)), depth, cursor.pos, item_desc)?;
            chunk_item.parent.set(head);
            head = Some(chunk_item);
        }
        let buf = self.alloc_bytes(total_len, depth, cursor.pos, item_desc)?;
        let mut remaining = total_len;
        let mut node = head;
        while let Some(chunk) = node {
            if let ItemKind::Bytes(b) = chunk.kind {
                remaining -= b.len();
                buf[remaining..remaining + b.len()].copy_from_slice(b);
            }
            node = chunk.parent.get();
        }
        debug_assert_eq!(remaining, 0);
        let payload: &'arena [u8] = buf;
        self.finish_string(payload, is_bytes)
    }

    fn finish_string(&self, payload: &'arena [u8], is_bytes: bool) -> Result<Item<'arena>> {
        if is_bytes {
            Ok(Item::new(ItemKind::Bytes(payload)))
        } else {
            // Length-prefixed bytes only: RFC 8949 requires text strings to be valid UTF-8, but
            // a decoder is not required to enforce it, and this one doesn't.
            Ok(Item::new(ItemKind::String(payload)))
        }
    }

    fn decode_array(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        match self.read_count(cursor, short_count, depth)? {
            Count::Definite(n) => {
                let n = to_usize(n, cursor.pos, depth, "array")?;
                let slots = self.alloc_item_slice(n, depth, cursor.pos, "array")?;
                for slot in slots.iter_mut() {
                    *slot = self.decode_item(cursor, depth + 1)?;
                }
                let items: &'arena [Item<'arena>] = slots;
                // Each slot is already its child's final, stable address (the slice was
                // allocated before any child was decoded into it), so children of children can
                // be wired up right away.
                for it in items {
                    it.adopt_children();
                }
                Ok(Item::new(ItemKind::Array(Array { items })))
            }
            Count::Indefinite => self.decode_indefinite_array(cursor, depth),
        }
    }

    fn decode_indefinite_array(&self, cursor: &mut Cursor<'arena>, depth: usize) -> Result<Item<'arena>> {
        let mut head: Option<&'arena Item<'arena>> = None;
        let mut count: usize = 0;
        loop {
            let next = cursor.peek(depth, Some("array"))?;
            if next == header::BREAK {
                cursor.pos += 1;
                break;
            }
            let child = self.decode_item(cursor, depth + 1)?;
            let child_ref = self.alloc_item_ref(child, depth, cursor.pos, "array")?;
            child_ref.adopt_children();
            child_ref.parent.set(head);
            head = Some(child_ref);
            count = count
                .checked_add(1)
                .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, cursor.pos, depth, Some("array")))?;
        }
        let slots = self.alloc_item_slice(count, depth, cursor.pos, "array")?;
        let mut idx = count;
        let mut node = head;
        while let Some(n) = node {
            idx -= 1;
            node = n.parent.get();
            // SAFETY: `n` is a chain node this call alone allocated just above, reachable only
            // through `head`/`parent` links local to this function; relocating its value here
            // and never reading through `n` again (the chain is walked exactly once, tail to
            // head) leaves no live duplicate.
            slots[idx] = unsafe { core::ptr::read(n) };
        }
        debug_assert_eq!(idx, 0);
        let items: &'arena [Item<'arena>] = slots;
        // The relocation above invalidates any grandchildren's parent links (they still point
        // at the transient chain-node addresses), so re-wire against the final slots.
        for it in items {
            it.adopt_children();
        }
        Ok(Item::new(ItemKind::Array(Array { items })))
    }

    fn decode_map(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        match self.read_count(cursor, short_count, depth)? {
            Count::Definite(n) => {
                let n = to_usize(n, cursor.pos, depth, "map")?;
                let keys = self.alloc_item_slice(n, depth, cursor.pos, "map")?;
                let values = self.alloc_item_slice(n, depth, cursor.pos, "map")?;
                for i in 0..n {
                    keys[i] = self.decode_item(cursor, depth + 1)?;
                    values[i] = self.decode_item(cursor, depth + 1)?;
                }
                let keys: &'arena [Item<'arena>] = keys;
                let values: &'arena [Item<'arena>] = values;
                for k in keys {
                    k.adopt_children();
                }
                for v in values {
                    v.adopt_children();
                }
                Ok(Item::new(ItemKind::Map(Map { keys, values })))
            }
            Count::Indefinite => self.decode_indefinite_map(cursor, depth),
        }
    }

    fn decode_indefinite_map(&self, cursor: &mut Cursor<'arena>, depth: usize) -> Result<Item<'arena>> {
        let mut head_keys: Option<&'arena Item<'arena>> = None;
        let mut head_values: Option<&'arena Item<'arena>> = None;
        let mut count: usize = 0;
        loop {
            let next = cursor.peek(depth, Some("map"))?;
            if next == header::BREAK {
                cursor.pos += 1;
                break;
            }
            let key = self.decode_item(cursor, depth + 1)?;
            let key_ref = self.alloc_item_ref(key, depth, cursor.pos, "map")?;
            key_ref.adopt_children();
            key_ref.parent.set(head_keys);
            head_keys = Some(key_ref);

            let value = self.decode_item(cursor, depth + 1)?;
            let value_ref = self.alloc_item_ref(value, depth, cursor.pos, "map")?;
            value_ref.adopt_children();
            value_ref.parent.set(head_values);
            head_values = Some(value_ref);

            count = count
                .checked_add(1)
                .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, cursor.pos, depth, Some("map")))?;
        }
        let keys = self.alloc_item_slice(count, depth, cursor.pos, "map")?;
        let values = self.alloc_item_slice(count, depth, cursor.pos, "map")?;
        let mut idx = count;
        let mut kn = head_keys;
        let mut vn = head_values;
        while let Some(k) = kn {
            let v = vn.expect("key and value chains accumulate in lock-step");
            idx -= 1;
            kn = k.parent.get();
            vn = v.parent.get();
            // SAFETY: see `decode_indefinite_array`; `k`/`v` are this call's own chain nodes,
            // each walked and relocated exactly once.
            keys[idx] = unsafe { core::ptr::read(k) };
            values[idx] = unsafe { core::ptr::read(v) };
        }
        debug_assert_eq!(idx, 0);
        let keys: &'arena [Item<'arena>] = keys;
        let values: &'arena [Item<'arena>] = values;
        for i in 0..keys.len() {
            keys[i].adopt_children();
            values[i].adopt_children();
        }
        Ok(Item::new(ItemKind::Map(Map { keys, values })))
    }

    fn decode_tag(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        let tag = self.read_definite_count(cursor, short_count, depth, Some("tag"))?;
        let child = self.decode_item(cursor, depth + 1)?;
        if tag == SELF_DESCRIBE_TAG {
            return Ok(child);
        }
        let child_ref = self.alloc_item_ref(child, depth, cursor.pos, "tag")?;
        child_ref.adopt_children();
        Ok(Item::new(ItemKind::Tag(Tag { tag, item: child_ref })))
    }

    fn decode_special(&self, cursor: &mut Cursor<'arena>, depth: usize, short_count: u8) -> Result<Item<'arena>> {
        match short_count {
            0..=19 => Ok(Item::new(ItemKind::Simple(short_count))),
            20 => Ok(Item::new(ItemKind::Boolean(false))),
            21 => Ok(Item::new(ItemKind::Boolean(true))),
            22 => Ok(Item::new(ItemKind::Null)),
            23 => Ok(Item::new(ItemKind::Undefined)),
            24 => {
                let value = cursor.read_u8(depth, Some("simple"))?;
                if value < 32 {
                    return Err(Error::new(ErrorKind::InvalidSimpleEncoding, cursor.pos, depth, Some("simple")));
                }
                Ok(Item::new(ItemKind::Simple(value)))
            }
            25 => {
                let bytes = cursor.read_bytes(2, depth, Some("float16"))?;
                let bits = u16::from_be_bytes([bytes[0], bytes[1]]);
                Ok(Item::new(ItemKind::Float16(bits)))
            }
            26 => {
                let bytes = cursor.read_bytes(4, depth, Some("float32"))?;
                let bits = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(Item::new(ItemKind::Float32(f32::from_bits(bits))))
            }
            27 => {
                let bytes = cursor.read_bytes(8, depth, Some("float64"))?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Ok(Item::new(ItemKind::Float64(f64::from_bits(u64::from_be_bytes(arr)))))
            }
            header::SHORT_COUNT_INDEFINITE => {
                Err(Error::new(ErrorKind::BreakNotAllowed, cursor.pos, depth, Some("special")))
            }
            _ => Err(Error::new(ErrorKind::InvalidItemHeader, cursor.pos, depth, Some("special"))),
        }
    }

    fn read_count(&self, cursor: &mut Cursor<'arena>, short_count: u8, depth: usize) -> Result<Count> {
        match short_count {
            0..=23 => Ok(Count::Definite(short_count as u64)),
            header::SHORT_COUNT_1_BYTE => Ok(Count::Definite(cursor.read_u8(depth, None)? as u64)),
            header::SHORT_COUNT_2_BYTE => {
                let b = cursor.read_bytes(2, depth, None)?;
                Ok(Count::Definite(u16::from_be_bytes([b[0], b[1]]) as u64))
            }
            header::SHORT_COUNT_4_BYTE => {
                let b = cursor.read_bytes(4, depth, None)?;
                Ok(Count::Definite(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64))
            }
            header::SHORT_COUNT_8_BYTE => {
                let b = cursor.read_bytes(8, depth, None)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                Ok(Count::Definite(u64::from_be_bytes(arr)))
            }
            header::SHORT_COUNT_INDEFINITE => Ok(Count::Indefinite),
            _ => Err(Error::new(ErrorKind::InvalidItemHeader, cursor.pos, depth, None)),
        }
    }

    fn read_definite_count(
        &self,
        cursor: &mut Cursor<'arena>,
        short_count: u8,
        depth: usize,
        item: Option<&'static str>,
    ) -> Result<u64> {
        match self.read_count(cursor, short_count, depth)? {
            Count::Definite(n) => Ok(n),
            Count::Indefinite => Err(Error::new(ErrorKind::InvalidItemHeader, cursor.pos, depth, item)),
        }
    }

    fn own_bytes(
        &self,
        raw: &'arena [u8],
        depth: usize,
        pos: usize,
        item: &'static str,
    ) -> Result<&'arena [u8]> {
        if self.reference_source || raw.is_empty() {
            return Ok(raw);
        }
        let copy = self.alloc_bytes(raw.len(), depth, pos, item)?;
        copy.copy_from_slice(raw);
        Ok(copy)
    }

    fn alloc_bytes(&self, len: usize, depth: usize, pos: usize, item: &'static str) -> Result<&'arena mut [u8]> {
        self.arena
            .alloc(len)
            .ok_or_else(|| Error::new(ErrorKind::BadAlloc, pos, depth, Some(item)))
    }

    /// Allocate a single arena-backed `Item` slot, properly aligned, and write `value` into it.
    fn alloc_item_ref(
        &self,
        value: Item<'arena>,
        depth: usize,
        pos: usize,
        item: &'static str,
    ) -> Result<&'arena Item<'arena>> {
        let slots = self.alloc_item_slice(1, depth, pos, item)?;
        slots[0] = value;
        Ok(&slots[0])
    }

    /// Allocate a contiguous, properly aligned run of `len` arena-backed `Item` slots,
    /// initialized to [`ItemKind::Invalid`].
    fn alloc_item_slice(
        &self,
        len: usize,
        depth: usize,
        pos: usize,
        item: &'static str,
    ) -> Result<&'arena mut [Item<'arena>]> {
        if len == 0 {
            return Ok(&mut []);
        }
        let elem_size = size_of::<Item<'arena>>();
        let align = align_of::<Item<'arena>>();
        let total = elem_size
            .checked_mul(len)
            .and_then(|n| n.checked_add(align))
            .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, pos, depth, Some(item)))?;
        let raw = self
            .arena
            .alloc(total)
            .ok_or_else(|| Error::new(ErrorKind::BadAlloc, pos, depth, Some(item)))?;
        let base = raw.as_ptr() as usize;
        let aligned = (base + align - 1) & !(align - 1);
        let offset = aligned - base;
        let slot = &mut raw[offset..offset + elem_size * len];
        let ptr = slot.as_mut_ptr() as *mut Item<'arena>;
        // SAFETY: `slot` is `elem_size * len` bytes of zeroed, arena-owned memory, correctly
        // aligned for `Item<'arena>` by construction above; it outlives `'arena` because it came
        // from `self.arena`, and nothing else observes this memory until we hand back the slice.
        unsafe {
            for i in 0..len {
                ptr.add(i).write(Item::new(ItemKind::Invalid));
            }
            Ok(core::slice::from_raw_parts_mut(ptr, len))
        }
    }
}

enum Count {
    Definite(u64),
    Indefinite,
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_u8(&mut self, depth: usize, item: Option<&'static str>) -> Result<u8> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| Error::new(ErrorKind::Truncated, self.pos, depth, item))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize, depth: usize, item: Option<&'static str>) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, self.pos, depth, item))?;
        let slice = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| Error::new(ErrorKind::Truncated, self.pos, depth, item))?;
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self, depth: usize, item: Option<&'static str>) -> Result<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::Truncated, self.pos, depth, item))
    }
}

fn to_usize(n: u64, pos: usize, depth: usize, item: &'static str) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::new(ErrorKind::IntegerOverflow, pos, depth, Some(item)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpArena;
    use crate::item::ItemKind;

    fn decode<'a>(backing: &'a BumpArena, input: &'a [u8]) -> Result<&'a Item<'a>> {
        let decoder = Decoder::new(backing);
        decoder.decode_exact(input)
    }

    #[test]
    fn decodes_small_uint() {
        let backing = BumpArena::new();
        let item = decode(&backing, &[0x00]).unwrap();
        assert!(matches!(item.kind, ItemKind::Uint64(0)));
    }

    #[test]
    fn decodes_max_u64() {
        let backing = BumpArena::new();
        let item = decode(&backing, &[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap();
        assert!(matches!(item.kind, ItemKind::Uint64(u64::MAX)));
    }

    #[test]
    fn negative_integer_overflow_is_rejected() {
        let backing = BumpArena::new();
        let err = decode(&backing, &[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegerOverflow);
    }

    #[test]
    fn negative_integer_boundary_decodes_to_i64_min() {
        let backing = BumpArena::new();
        let item = decode(&backing, &[0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap();
        assert!(matches!(item.kind, ItemKind::Int64(i64::MIN)));
    }

    #[test]
    fn decodes_indefinite_chunked_bytes() {
        let backing = BumpArena::new();
        let input = [0x5f, 0x42, 0x68, 0x65, 0x43, 0x6c, 0x6c, 0x6f, 0xff];
        let item = decode(&backing, &input).unwrap();
        match item.kind {
            ItemKind::Bytes(b) => assert_eq!(b, b"hello"),
            _ => panic!("expected bytes"),
        }
    }

    #[test]
    fn decodes_indefinite_array_and_fixes_parent_links() {
        let backing = BumpArena::new();
        let input = [0x9f, 0x01, 0x02, 0x03, 0xff];
        let item = decode(&backing, &input).unwrap();
        match &item.kind {
            ItemKind::Array(arr) => {
                assert_eq!(arr.len(), 3);
                for child in arr.items {
                    assert!(core::ptr::eq(child.parent().unwrap(), item));
                }
                assert!(matches!(arr.items[0].kind, ItemKind::Uint64(1)));
                assert!(matches!(arr.items[2].kind, ItemKind::Uint64(3)));
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn self_describe_tag_is_stripped() {
        let backing = BumpArena::new();
        let item = decode(&backing, &[0xd9, 0xd9, 0xf7, 0xf5]).unwrap();
        assert!(matches!(item.kind, ItemKind::Boolean(true)));
    }

    #[test]
    fn max_depth_exceeded_one_level_too_deep() {
        let backing = BumpArena::new();
        // 33 nested tag-0 wrappers around a null, default max_depth = 32.
        let mut input = Vec::new();
        for _ in 0..33 {
            input.push(0xc0);
        }
        input.push(0xf6);
        let err = decode(&backing, &input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MaxDepthExceeded);
    }

    #[test]
    fn exactly_max_depth_succeeds() {
        let backing = BumpArena::new();
        let mut input = Vec::new();
        for _ in 0..32 {
            input.push(0xc0);
        }
        input.push(0xf6);
        let item = decode(&backing, &input).unwrap();
        assert!(matches!(item.kind, ItemKind::Null));
    }

    #[test]
    fn decode_allows_trailing_data_decode_exact_rejects_it() {
        let backing = BumpArena::new();
        let decoder = Decoder::new(&backing);
        let input = [0x00, 0x01];
        let (item, consumed) = decoder.decode(&input).unwrap();
        assert!(matches!(item.kind, ItemKind::Uint64(0)));
        assert_eq!(consumed, 1);
        let err = decoder.decode_exact(&input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TrailingData);
    }

    #[test]
    fn chunked_string_with_mismatched_major_type_fails() {
        let backing = BumpArena::new();
        // Indefinite bytes string containing a text-string chunk: illegal.
        let input = [0x5f, 0x61, 0x61, 0xff];
        let err = decode(&backing, &input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChunkedString);
    }

    #[test]
    fn break_byte_outside_container_is_rejected() {
        let backing = BumpArena::new();
        let err = decode(&backing, &[0xff]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BreakNotAllowed);
    }

    #[test]
    fn truncated_input_is_reported() {
        let backing = BumpArena::new();
        let err = decode(&backing, &[0x19, 0x01]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Truncated);
    }

    #[test]
    fn simple_value_below_32_in_one_byte_form_is_invalid() {
        let backing = BumpArena::new();
        let err = decode(&backing, &[0xf8, 0x1f]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSimpleEncoding);
    }

    #[test]
    fn map_key_lookup_after_decode() {
        let backing = BumpArena::new();
        // {"key": "value"}
        let input = [0xa1, 0x63, 0x6b, 0x65, 0x79, 0x65, 0x76, 0x61, 0x6c, 0x75, 0x65];
        let item = decode(&backing, &input).unwrap();
        match &item.kind {
            ItemKind::Map(m) => {
                let v = m.get_str("key").unwrap();
                assert!(matches!(v.kind, ItemKind::String(b"value")));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn text_string_with_invalid_utf8_still_decodes() {
        let backing = BumpArena::new();
        // A 1-byte text string holding 0xFF, which is never valid UTF-8 on its own.
        let input = [0x61, 0xff];
        let item = decode(&backing, &input).unwrap();
        assert!(matches!(item.kind, ItemKind::String(b) if b == [0xff]));
    }
}
