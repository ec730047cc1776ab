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
 * arena_cbor module definition
 *
 * A fairly comprehensive, memory efficient, deserializer and serializer for CBOR (RFC8949).
 * This implementation is designed for use in constrained systems and requires neither the Rust
 * standard library nor an allocator.
 **************************************************************************************************/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs)]

//! # arena_cbor
//!
//! `arena_cbor` decodes and encodes [RFC 8949](https://www.rfc-editor.org/rfc/rfc8949) CBOR
//! without touching the global allocator: a decoded value tree is a graph of
//! [`types::Item`]s borrowed from a single [`arena::Arena`] supplied by the caller, and the whole
//! tree is freed in one step when that arena is dropped or reset.
//!
//! This is the same tradeoff embedded CBOR parsers typically make — no per-item heap traffic, a
//! caller-controlled memory budget via [`arena::LimitedArena`], and a caller-controlled nesting
//! cap via [`decoder::Decoder::with_max_depth`] — applied to a single-lifetime arena tree instead
//! of a flat iterator-driven buffer.
//!
//! Both examples below use a trivial fixed-buffer [`arena::Arena`] so that they build under the
//! `no_std` default configuration; a caller targeting `std` can use [`arena::BumpArena`] instead.
//!
//! ## Decoding
//!
//! ```
//! use core::cell::Cell;
//! use arena_cbor::arena::Arena;
//! use arena_cbor::decoder::Decoder;
//! use arena_cbor::types::ItemKind;
//!
//! struct FixedArena { buf: [Cell<u8>; 256], used: Cell<usize> }
//! impl<'a> Arena<'a> for FixedArena {
//!     fn alloc(&'a self, bytes: usize) -> Option<&'a mut [u8]> {
//!         let start = self.used.get();
//!         let end = start.checked_add(bytes)?;
//!         if end > self.buf.len() { return None; }
//!         self.used.set(end);
//!         let ptr = self.buf[start..end].as_ptr() as *mut u8;
//!         Some(unsafe { core::slice::from_raw_parts_mut(ptr, end - start) })
//!     }
//! }
//!
//! let backing = FixedArena { buf: [0; 256].map(Cell::new), used: Cell::new(0) };
//! let decoder = Decoder::new(&backing);
//! let input: &[u8] = &[0xa1, 0x01, 0x02]; // {1: 2}
//! let item = decoder.decode_exact(input).unwrap();
//! match &item.kind {
//!     ItemKind::Map(m) => assert_eq!(m.len(), 1),
//!     _ => panic!("expected a map"),
//! }
//! ```
//!
//! ## Encoding
//!
//! This example needs the `std` feature, for [`arena::BumpArena`]:
//!
//! ```ignore
//! use arena_cbor::arena::BumpArena;
//! use arena_cbor::builder::ItemBuilder;
//! use arena_cbor::encoder::encode_into;
//!
//! let backing = BumpArena::new();
//! let b = ItemBuilder::new(&backing);
//! let item = b.uint(42).unwrap();
//! let mut buf = [0u8; 8];
//! let n = encode_into(item, &mut buf).unwrap();
//! assert_eq!(&buf[..n], &[0x18, 0x2a]);
//! ```

pub mod arena;
pub mod error;

mod item;

#[cfg(any(feature = "std", test))]
mod diag;

mod decode;
mod encode;

/// The `types` module exports [`Item`](item::Item) and its payload types, which together form
/// the tree a decode produces (or a [`builder::ItemBuilder`] constructs).
pub mod types {
    pub use super::item::{Array, Item, ItemKind, Map, Tag};
}

/// The `decoder` module exports [`decoder::Decoder`], the entry point for turning a byte slice
/// into an arena-allocated [`types::Item`] tree.
pub mod decoder {
    pub use super::decode::{Decoder, DEFAULT_MAX_DEPTH};
}

/// The `encoder` module exports [`Encoder`](encode::Encoder) and the `EncodeSink` trait and
/// convenience functions used to turn an [`types::Item`] tree back into CBOR bytes.
pub mod encoder {
    pub use super::encode::{encode_into, encoded_size, EncodeSink, Encoder};
}

/// Constructs an [`types::Item`] tree directly, out of the same [`arena::Arena`] the decoder
/// uses, rather than decoding one.
pub mod builder;

/// Diagnostic (debug/test-output) rendering of a decoded tree. Requires the `std` feature (or
/// `cfg(test)`); never consulted by [`decoder`] or [`encoder`].
#[cfg(any(feature = "std", test))]
pub mod debug {
    pub use super::diag::{to_diag_string, write_diag};
}
