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
/***************************************************************************************************
 * CBOR item tree
 *
 * A fairly comprehensive, memory efficient, deserializer and serializer for CBOR (RFC8949).
 * This implementation is designed for use in constrained systems and requires neither the Rust
 * standard library nor an allocator.
 **************************************************************************************************/
use core::cell::Cell;

/// A single decoded (or hand-built) CBOR value, arena-allocated and immutable once complete.
///
/// Every item carries a non-owning `parent` link to its logical container (array, map, or tag),
/// or `None` for the root. The link exists for diagnostics and is also reused as scratch storage
/// by the indefinite-length decoding algorithm before the final container is allocated; by the
/// time a tree is handed back to a caller it always points at the true parent.
///
/// `Item` is `Clone` but deliberately not `Copy`: the `parent` cell makes a bitwise duplicate
/// indistinguishable from the original at the type level, but the decoder and builder both rely
/// on knowing exactly which arena slot is the one true, stable home of a given item so they can
/// wire its children's `parent` cells at it. Relocating an item's value (definite-length
/// containers are filled directly, but indefinite-length accumulation and builder composition
/// both need to move an already-built item into a new slot) is done with a raw pointer move, not
/// an implicit `Copy`; see `Decoder` and `ItemBuilder` for the call sites.
#[derive(Clone)]
pub struct Item<'arena> {
    /// The value itself.
    pub kind: ItemKind<'arena>,
    pub(crate) parent: Cell<Option<&'arena Item<'arena>>>,
}

impl<'arena> Item<'arena> {
    /// Build a parentless item. Used by the decoder for the root and by [`crate::builder`] for
    /// values that will have their `parent` wired up by the caller.
    pub(crate) fn new(kind: ItemKind<'arena>) -> Self {
        Item {
            kind,
            parent: Cell::new(None),
        }
    }

    /// The item's logical container, or `None` at the root.
    pub fn parent(&self) -> Option<&'arena Item<'arena>> {
        self.parent.get()
    }

    /// Strict equality: identical variant and, recursively, identical payload. Floats compare by
    /// raw bit pattern, so `+0.0` and `-0.0` differ and distinct NaN payloads are distinct.
    pub fn strict_eq(&self, other: &Item<'arena>) -> bool {
        use ItemKind::*;
        match (&self.kind, &other.kind) {
            (Invalid, Invalid) => true,
            (Uint64(a), Uint64(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Null, Null) => true,
            (Undefined, Undefined) => true,
            (Float16(a), Float16(b)) => a == b,
            (Float32(a), Float32(b)) => a.to_bits() == b.to_bits(),
            (Float64(a), Float64(b)) => a.to_bits() == b.to_bits(),
            (Simple(a), Simple(b)) => a == b,
            (Tag(a), Tag(b)) => a.tag == b.tag && a.item.strict_eq(b.item),
            (Array(a), Array(b)) => {
                a.items.len() == b.items.len()
                    && a.items.iter().zip(b.items.iter()).all(|(x, y)| x.strict_eq(y))
            }
            (Map(a), Map(b)) => {
                a.keys.len() == b.keys.len()
                    && a.keys.iter().zip(b.keys.iter()).all(|(x, y)| x.strict_eq(y))
                    && a.values.iter().zip(b.values.iter()).all(|(x, y)| x.strict_eq(y))
            }
            _ => false,
        }
    }

    /// Value equality: strict equality, except that a non-negative `Int64` and a `Uint64` holding
    /// the same mathematical value compare equal. This accommodates the fact that the decoder
    /// always normalizes non-negative wire integers to `Uint64` regardless of how a caller built
    /// the tree being compared against.
    pub fn value_eq(&self, other: &Item<'arena>) -> bool {
        use ItemKind::*;
        match (&self.kind, &other.kind) {
            (Uint64(a), Int64(b)) | (Int64(b), Uint64(a)) => *b >= 0 && (*b as u64) == *a,
            (Tag(a), Tag(b)) => a.tag == b.tag && a.item.value_eq(b.item),
            (Array(a), Array(b)) => {
                a.items.len() == b.items.len()
                    && a.items.iter().zip(b.items.iter()).all(|(x, y)| x.value_eq(y))
            }
            (Map(a), Map(b)) => {
                a.keys.len() == b.keys.len()
                    && a.keys.iter().zip(b.keys.iter()).all(|(x, y)| x.value_eq(y))
                    && a.values.iter().zip(b.values.iter()).all(|(x, y)| x.value_eq(y))
            }
            _ => self.strict_eq(other),
        }
    }

    /// Short static description of the item's variant, used for error context.
    pub(crate) fn describe(&self) -> &'static str {
        self.kind.describe()
    }

    /// Point every direct child's `parent` cell at `self`, the stable arena address this item has
    /// just been placed at. A no-op for non-container variants. Called by the decoder and builder
    /// once a container (or a value relocated into a new slot) has its final home, since that
    /// address isn't known until after the children themselves already exist.
    pub(crate) fn adopt_children(&'arena self) {
        match &self.kind {
            ItemKind::Array(arr) => {
                for it in arr.items {
                    it.parent.set(Some(self));
                }
            }
            ItemKind::Map(m) => {
                for k in m.keys {
                    k.parent.set(Some(self));
                }
                for v in m.values {
                    v.parent.set(Some(self));
                }
            }
            ItemKind::Tag(t) => t.item.parent.set(Some(self)),
            _ => {}
        }
    }
}

/// The tagged payload of an [`Item`].
#[derive(Clone, Copy)]
pub enum ItemKind<'arena> {
    /// Sentinel for a slot that was allocated but never successfully populated. A successful
    /// decode never returns a tree containing this variant.
    Invalid,
    /// An unsigned (or non-negative) integer, major type 0.
    Uint64(u64),
    /// A negative integer, major type 1. Always holds a negative value; non-negative wire
    /// integers are normalized to `Uint64`.
    Int64(i64),
    /// A byte string, major type 2.
    Bytes(&'arena [u8]),
    /// A text string, major type 3. Held as raw bytes: the wire format's length prefix is the
    /// only validation performed, and decoding never rejects a text string for failing to be
    /// valid UTF-8 (RFC 8949 requires producers to emit valid UTF-8, but does not require
    /// consumers to enforce it).
    String(&'arena [u8]),
    /// An array, major type 4.
    Array(Array<'arena>),
    /// A map, major type 5.
    Map(Map<'arena>),
    /// A tagged value, major type 6 (other than the self-described-CBOR tag, which is unwrapped
    /// during decode and never materialized).
    Tag(Tag<'arena>),
    /// A boolean, major type 7 short-count 20/21.
    Boolean(bool),
    /// `null`, major type 7 short-count 22.
    Null,
    /// `undefined`, major type 7 short-count 23.
    Undefined,
    /// A half-precision float, major type 7 short-count 25, preserved as raw bits and never
    /// converted to a native floating-point type.
    Float16(u16),
    /// A single-precision float, major type 7 short-count 26.
    Float32(f32),
    /// A double-precision float, major type 7 short-count 27.
    Float64(f64),
    /// A simple value outside the named specials, major type 7 short-counts 0..=19 or 32..=255.
    Simple(u8),
}

impl<'arena> ItemKind<'arena> {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            ItemKind::Invalid => "invalid",
            ItemKind::Uint64(_) => "uint64",
            ItemKind::Int64(_) => "int64",
            ItemKind::Bytes(_) => "bytes",
            ItemKind::String(_) => "string",
            ItemKind::Array(_) => "array",
            ItemKind::Map(_) => "map",
            ItemKind::Tag(_) => "tag",
            ItemKind::Boolean(_) => "boolean",
            ItemKind::Null => "null",
            ItemKind::Undefined => "undefined",
            ItemKind::Float16(_) => "float16",
            ItemKind::Float32(_) => "float32",
            ItemKind::Float64(_) => "float64",
            ItemKind::Simple(_) => "simple",
        }
    }
}

/// The payload of an [`ItemKind::Array`]: a contiguous, arena-allocated run of items.
#[derive(Clone, Copy)]
pub struct Array<'arena> {
    /// The array's elements, in wire order.
    pub items: &'arena [Item<'arena>],
}

impl<'arena> Array<'arena> {
    /// The element at `index`, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<&'arena Item<'arena>> {
        self.items.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The payload of an [`ItemKind::Map`]: two parallel contiguous runs, `keys[i]` paired with
/// `values[i]`.
#[derive(Clone, Copy)]
pub struct Map<'arena> {
    /// The map's keys, in wire order.
    pub keys: &'arena [Item<'arena>],
    /// The map's values, in wire order, parallel to `keys`.
    pub values: &'arena [Item<'arena>],
}

impl<'arena> Map<'arena> {
    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if the map has no pairs.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The value paired with the first key that compares equal (by [`Item::value_eq`]) to `key`,
    /// or `None` if no such key is present. No uniqueness check is performed on the map's keys;
    /// as with a general-purpose decoder this simply returns the first match.
    pub fn get(&self, key: &Item<'arena>) -> Option<&'arena Item<'arena>> {
        self.keys
            .iter()
            .position(|k| k.value_eq(key))
            .map(|i| &self.values[i])
    }

    /// Convenience lookup for a text-string key, compared byte-for-byte against `key`.
    pub fn get_str(&self, key: &str) -> Option<&'arena Item<'arena>> {
        self.keys
            .iter()
            .position(|k| matches!(&k.kind, ItemKind::String(s) if *s == key.as_bytes()))
            .map(|i| &self.values[i])
    }

    /// Convenience lookup for an integer key (matches both `Uint64` and `Int64` keys by value).
    pub fn get_int(&self, key: i64) -> Option<&'arena Item<'arena>> {
        self.keys
            .iter()
            .position(|k| match &k.kind {
                ItemKind::Uint64(u) => key >= 0 && *u == key as u64,
                ItemKind::Int64(i) => *i == key,
                _ => false,
            })
            .map(|i| &self.values[i])
    }
}

/// The payload of an [`ItemKind::Tag`]: a 64-bit tag number and exactly one child item.
#[derive(Clone, Copy)]
pub struct Tag<'arena> {
    /// The tag number.
    pub tag: u64,
    /// The tagged value. Always present (it may itself be `null`, but never absent).
    pub item: &'arena Item<'arena>,
}
