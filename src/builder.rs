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
/// # Hand-built item trees
///
/// An [`ItemBuilder`] constructs [`Item`] trees directly, out of the same [`Arena`] the decoder
/// uses, for callers who want to assemble a value to encode without first decoding one. Every
/// constructor allocates its item in the arena and returns a stable reference; the array/map/tag
/// constructors wire each child's `parent` to point back at the new container, the same way the
/// decoder does once a container's final form is known.
use core::mem::{align_of, size_of};

use crate::arena::Arena;
use crate::error::{Error, ErrorKind, Result};
use crate::item::{Array, Item, ItemKind, Map, Tag};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Builds [`Item`] trees directly into an [`Arena`], bottom-up.
pub struct ItemBuilder<'arena, A: Arena<'arena>> {
    arena: &'arena A,
}

impl<'arena, A: Arena<'arena>> ItemBuilder<'arena, A> {
    /// Create a builder that allocates out of `arena`.
    pub fn new(arena: &'arena A) -> Self {
        ItemBuilder { arena }
    }

    /// An unsigned (or non-negative) integer.
    pub fn uint(&self, n: u64) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Uint64(n)))
    }

    /// A signed integer. Values `>= 0` are equivalent to [`ItemBuilder::uint`]; the encoder emits
    /// major type 0 for either.
    pub fn int(&self, n: i64) -> Result<&'arena Item<'arena>> {
        if n >= 0 {
            self.uint(n as u64)
        } else {
            self.alloc(Item::new(ItemKind::Int64(n)))
        }
    }

    /// A byte string, copied into the arena.
    pub fn bytes(&self, b: &[u8]) -> Result<&'arena Item<'arena>> {
        let copy = self.alloc_bytes(b)?;
        self.alloc(Item::new(ItemKind::Bytes(copy)))
    }

    /// A text string, copied into the arena. Stored as raw bytes, matching the decoder: nothing
    /// downstream re-validates UTF-8 on a `&str` that was already guaranteed valid by the type
    /// of `s`.
    pub fn text(&self, s: &str) -> Result<&'arena Item<'arena>> {
        let copy = self.alloc_bytes(s.as_bytes())?;
        self.alloc(Item::new(ItemKind::String(copy)))
    }

    /// An array built from `items`, in order. Each element's `parent` is set to point at the new
    /// array.
    #[cfg_attr(feature = "trace", trace)]
    pub fn array(&self, items: &[&'arena Item<'arena>]) -> Result<&'arena Item<'arena>> {
        let slots = self.alloc_item_slice(items.len())?;
        for (slot, item) in slots.iter_mut().zip(items.iter()) {
            // SAFETY: `item` is a caller-supplied, already-complete arena item; its value is
            // relocated into this freshly allocated contiguous slot and its own children are
            // re-wired below, so the original location is never read as an `Item` again.
            *slot = unsafe { core::ptr::read(*item) };
        }
        let slots: &'arena [Item<'arena>] = slots;
        // The relocation above left any grandchildren pointing at the old, standalone
        // addresses; fix them up against the new contiguous slots.
        for slot in slots {
            slot.adopt_children();
        }
        let array_item = self.alloc(Item::new(ItemKind::Array(Array { items: slots })))?;
        for slot in slots {
            slot.parent.set(Some(array_item));
        }
        Ok(array_item)
    }

    /// A map built from parallel `keys`/`values` slices (must be the same length). Each key and
    /// value's `parent` is set to point at the new map. No uniqueness check is performed on keys.
    #[cfg_attr(feature = "trace", trace)]
    pub fn map(
        &self,
        keys: &[&'arena Item<'arena>],
        values: &[&'arena Item<'arena>],
    ) -> Result<&'arena Item<'arena>> {
        if keys.len() != values.len() {
            return Err(Error::new(ErrorKind::InvalidItemType, 0, 0, Some("map")));
        }
        let key_slots = self.alloc_item_slice(keys.len())?;
        for (slot, item) in key_slots.iter_mut().zip(keys.iter()) {
            // SAFETY: see `ItemBuilder::array`; same relocate-then-rewire pattern.
            *slot = unsafe { core::ptr::read(*item) };
        }
        let value_slots = self.alloc_item_slice(values.len())?;
        for (slot, item) in value_slots.iter_mut().zip(values.iter()) {
            // SAFETY: see `ItemBuilder::array`; same relocate-then-rewire pattern.
            *slot = unsafe { core::ptr::read(*item) };
        }
        let key_slots: &'arena [Item<'arena>] = key_slots;
        let value_slots: &'arena [Item<'arena>] = value_slots;
        for slot in key_slots.iter().chain(value_slots.iter()) {
            slot.adopt_children();
        }
        let map_item = self.alloc(Item::new(ItemKind::Map(Map {
            keys: key_slots,
            values: value_slots,
        })))?;
        for slot in key_slots.iter().chain(value_slots.iter()) {
            slot.parent.set(Some(map_item));
        }
        Ok(map_item)
    }

    /// A tagged value. `item`'s `parent` is set to point at the new tag.
    pub fn tag(&self, tag: u64, item: &'arena Item<'arena>) -> Result<&'arena Item<'arena>> {
        let tag_item = self.alloc(Item::new(ItemKind::Tag(Tag { tag, item })))?;
        item.parent.set(Some(tag_item));
        Ok(tag_item)
    }

    /// A boolean.
    pub fn bool_(&self, b: bool) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Boolean(b)))
    }

    /// `null`.
    pub fn null(&self) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Null))
    }

    /// `undefined`.
    pub fn undefined(&self) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Undefined))
    }

    /// A simple value outside the named specials (`0..=19` or `32..=255`). Fails with
    /// [`ErrorKind::InvalidSimpleValue`] for the reserved `20..=31` band, which the encoder
    /// would otherwise refuse to emit.
    pub fn simple(&self, value: u8) -> Result<&'arena Item<'arena>> {
        if (20..32).contains(&value) {
            return Err(Error::new(ErrorKind::InvalidSimpleValue, 0, 0, Some("simple")));
        }
        self.alloc(Item::new(ItemKind::Simple(value)))
    }

    /// A half-precision float, given as raw bits (this crate never converts half-precision
    /// values to a native floating-point type).
    pub fn float16(&self, bits: u16) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Float16(bits)))
    }

    /// A single-precision float.
    pub fn float32(&self, f: f32) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Float32(f)))
    }

    /// A double-precision float.
    pub fn float64(&self, f: f64) -> Result<&'arena Item<'arena>> {
        self.alloc(Item::new(ItemKind::Float64(f)))
    }

    fn alloc(&self, value: Item<'arena>) -> Result<&'arena Item<'arena>> {
        let slots = self.alloc_item_slice(1)?;
        slots[0] = value;
        Ok(&slots[0])
    }

    fn alloc_bytes(&self, b: &[u8]) -> Result<&'arena mut [u8]> {
        let slice = self
            .arena
            .alloc(b.len())
            .ok_or_else(|| Error::new(ErrorKind::BadAlloc, 0, 0, None))?;
        slice.copy_from_slice(b);
        Ok(slice)
    }

    /// See `decode::Decoder::alloc_item_slice` for the reasoning behind the manual alignment
    /// handling; the `Arena` trait is byte-oriented and gives no alignment guarantee of its own.
    fn alloc_item_slice(&self, len: usize) -> Result<&'arena mut [Item<'arena>]> {
        if len == 0 {
            return Ok(&mut []);
        }
        let elem_size = size_of::<Item<'arena>>();
        let align = align_of::<Item<'arena>>();
        let total = elem_size
            .checked_mul(len)
            .and_then(|n| n.checked_add(align))
            .ok_or_else(|| Error::new(ErrorKind::IntegerOverflow, 0, 0, None))?;
        let raw = self
            .arena
            .alloc(total)
            .ok_or_else(|| Error::new(ErrorKind::BadAlloc, 0, 0, None))?;
        let base = raw.as_ptr() as usize;
        let aligned = (base + align - 1) & !(align - 1);
        let offset = aligned - base;
        let slot = &mut raw[offset..offset + elem_size * len];
        let ptr = slot.as_mut_ptr() as *mut Item<'arena>;
        // SAFETY: see `decode::Decoder::alloc_item_slice`; identical reasoning applies here.
        unsafe {
            for i in 0..len {
                ptr.add(i).write(Item::new(ItemKind::Invalid));
            }
            Ok(core::slice::from_raw_parts_mut(ptr, len))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpArena;

    #[test]
    fn builds_array_with_wired_parents() {
        let backing = BumpArena::new();
        let b = ItemBuilder::new(&backing);
        let one = b.uint(1).unwrap();
        let two = b.uint(2).unwrap();
        let arr = b.array(&[one, two]).unwrap();
        match &arr.kind {
            ItemKind::Array(a) => {
                assert_eq!(a.len(), 2);
                for item in a.items {
                    assert!(core::ptr::eq(item.parent().unwrap(), arr));
                }
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn builds_map_with_string_keys() {
        let backing = BumpArena::new();
        let b = ItemBuilder::new(&backing);
        let key = b.text("answer").unwrap();
        let value = b.uint(42).unwrap();
        let map = b.map(&[key], &[value]).unwrap();
        match &map.kind {
            ItemKind::Map(m) => {
                let v = m.get_str("answer").unwrap();
                assert!(matches!(v.kind, ItemKind::Uint64(42)));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn builds_tag_wrapping_a_child() {
        let backing = BumpArena::new();
        let b = ItemBuilder::new(&backing);
        let child = b.bytes(b"abc").unwrap();
        let tagged = b.tag(24, child).unwrap();
        match &tagged.kind {
            ItemKind::Tag(t) => {
                assert_eq!(t.tag, 24);
                assert!(core::ptr::eq(t.item.parent().unwrap(), tagged));
            }
            _ => panic!("expected tag"),
        }
    }

    #[test]
    fn reserved_simple_value_is_rejected() {
        let backing = BumpArena::new();
        let b = ItemBuilder::new(&backing);
        let err = b.simple(20).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSimpleValue);
    }

    #[test]
    fn mismatched_map_lengths_are_rejected() {
        let backing = BumpArena::new();
        let b = ItemBuilder::new(&backing);
        let key = b.uint(1).unwrap();
        let err = b.map(&[key], &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemType);
    }
}
