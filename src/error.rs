/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice (including the next
 * paragraph) shall be included in all copies or substantial portions of the
 * Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * arena_cbor Error API
 *
 * A fairly comprehensive, memory efficient, deserializer and serializer for CBOR (RFC8949).
 * This implementation is designed for use in constrained systems and requires neither the Rust
 * standard library nor an allocator.
 **************************************************************************************************/
use core::panic::Location;
use core::result;

#[cfg(any(feature = "std", test))]
use thiserror::Error;

/// An alias for `Result<T, Error>` used throughout this crate.
pub type Result<T> = result::Result<T, Error>;

/// The kind of failure that stopped a decode or encode operation.
///
/// Variant names match the stable identifiers a caller may want to match on or log; the
/// human-readable message (available when the `std` feature is enabled) is a convenience, not
/// the contract.
#[cfg_attr(any(feature = "std", test), derive(Copy, Clone, Error, Debug, PartialEq, Eq))]
#[cfg_attr(all(not(feature = "std"), not(test)), derive(Copy, Clone, Debug, PartialEq, Eq))]
pub enum ErrorKind {
    /// The arena refused an allocation request, including a limited arena's budget being
    /// exceeded.
    #[cfg_attr(any(feature = "std", test), error("arena allocation failed"))]
    BadAlloc,
    /// The input ended before the current item finished decoding.
    #[cfg_attr(any(feature = "std", test), error("input truncated"))]
    Truncated,
    /// The initial byte has an illegal short-count for its major type.
    #[cfg_attr(any(feature = "std", test), error("invalid item header"))]
    InvalidItemHeader,
    /// A negative integer's magnitude does not fit in `int64`.
    #[cfg_attr(any(feature = "std", test), error("integer overflow"))]
    IntegerOverflow,
    /// A chunk of an indefinite-length byte or text string had the wrong major type, or was
    /// itself indefinite-length.
    #[cfg_attr(any(feature = "std", test), error("invalid chunked string"))]
    InvalidChunkedString,
    /// Nesting exceeded the configured maximum depth.
    #[cfg_attr(any(feature = "std", test), error("maximum nesting depth exceeded"))]
    MaxDepthExceeded,
    /// A one-byte simple value encoding (`0xf8` prefix) was used for a value below 32, which
    /// must use the short-count-embedded form instead.
    #[cfg_attr(any(feature = "std", test), error("invalid simple value encoding"))]
    InvalidSimpleEncoding,
    /// A break byte (`0xff`) appeared outside an indefinite-length container.
    #[cfg_attr(any(feature = "std", test), error("break byte not allowed here"))]
    BreakNotAllowed,
    /// The encoder's write sink accepted fewer bytes than requested.
    #[cfg_attr(any(feature = "std", test), error("write sink failed"))]
    WriteFailed,
    /// The encoder was asked to encode an `Invalid` item.
    #[cfg_attr(any(feature = "std", test), error("invalid item type"))]
    InvalidItemType,
    /// The encoder was asked to emit a simple value in the reserved 20..=31 band.
    #[cfg_attr(any(feature = "std", test), error("invalid simple value"))]
    InvalidSimpleValue,
    /// Bytes remained in the input after the root item was decoded (`decode_exact` only).
    #[cfg_attr(any(feature = "std", test), error("trailing data after root item"))]
    TrailingData,
}

/// A decode or encode failure, with the context needed to locate and diagnose it.
///
/// Mirrors the reference implementation's error record: the kind of failure, the byte offset at
/// which it was detected, the nesting depth at that point, a short description of the item being
/// processed (if any), and the source location of the check that detected it.
#[derive(Copy, Clone, Debug)]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Byte offset into the input (decode) or into the bytes written so far (encode).
    pub offset: usize,
    /// Nesting depth at the point of failure.
    pub depth: usize,
    /// Short description of the item being processed when the failure was detected, if any.
    pub item: Option<&'static str>,
    /// Source location of the check that detected the failure.
    pub location: &'static Location<'static>,
}

impl Error {
    /// Construct an error with the given kind and context, capturing the caller's location.
    #[track_caller]
    pub(crate) fn new(kind: ErrorKind, offset: usize, depth: usize, item: Option<&'static str>) -> Self {
        Error {
            kind,
            offset,
            depth,
            item,
            location: Location::caller(),
        }
    }
}

#[cfg(any(feature = "std", test))]
impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} at offset {} (depth {}{}) [{}]",
            self.kind,
            self.offset,
            self.depth,
            self.item.map(|i| format!(", in {}", i)).unwrap_or_default(),
            self.location,
        )
    }
}

#[cfg(any(feature = "std", test))]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
