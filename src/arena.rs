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
/// # Arena allocation
///
/// The decoder never uses the global allocator directly: every [`crate::item::Item`] and every
/// byte of string/array/map storage it produces comes out of an [`Arena`] supplied by the caller.
/// Memory is freed collectively when the arena itself is dropped or reset, never per item.
use core::cell::Cell;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A bump allocator. The only operation required of an arena is handing back zeroed memory of a
/// requested size, or signalling failure.
///
/// A zero-byte request must still succeed and return a valid (if empty) slice, so that
/// zero-length byte strings and text strings have a stable, non-dangling data pointer.
pub trait Arena<'arena> {
    /// Allocate `bytes` zeroed bytes, living at least as long as `'arena`. Returns `None` if the
    /// arena cannot satisfy the request.
    fn alloc(&'arena self, bytes: usize) -> Option<&'arena mut [u8]>;
}

/// An [`Arena`] wrapper that refuses to allocate more than a fixed byte budget in total.
///
/// Wraps a backing arena and tracks how many bytes have been handed out so far. `reset` clears
/// this count without touching the backing allocator, which is expected to be reset (or dropped
/// and recreated) independently by the caller between decodes.
pub struct LimitedArena<'arena, A: Arena<'arena>> {
    backing: &'arena A,
    allocated_bytes: Cell<usize>,
    limit_bytes: usize,
}

impl<'arena, A: Arena<'arena>> LimitedArena<'arena, A> {
    /// Create a limited arena that will not allocate more than `limit_bytes` in total from
    /// `backing`. A `limit_bytes` of `0` means unbounded.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(backing: &'arena A, limit_bytes: usize) -> Self {
        LimitedArena {
            backing,
            allocated_bytes: Cell::new(0),
            limit_bytes,
        }
    }

    /// Total bytes allocated through this arena since construction or the last `reset`.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.get()
    }

    /// The configured budget. `0` means unbounded.
    pub fn limit_bytes(&self) -> usize {
        self.limit_bytes
    }

    /// Reset the allocated-bytes counter to zero. Does not free any memory in the backing arena.
    #[cfg_attr(feature = "trace", trace)]
    pub fn reset(&self) {
        self.allocated_bytes.set(0);
    }

    fn within_budget(&self, bytes: usize) -> bool {
        if self.limit_bytes == 0 {
            return true;
        }
        match self.allocated_bytes.get().checked_add(bytes) {
            Some(total) => total <= self.limit_bytes,
            None => false,
        }
    }
}

impl<'arena, A: Arena<'arena>> Arena<'arena> for LimitedArena<'arena, A> {
    #[cfg_attr(feature = "trace", trace)]
    fn alloc(&'arena self, bytes: usize) -> Option<&'arena mut [u8]> {
        if !self.within_budget(bytes) {
            return None;
        }
        let slice = self.backing.alloc(bytes)?;
        // Checked above; the addition cannot overflow since within_budget already validated it.
        self.allocated_bytes.set(self.allocated_bytes.get() + bytes);
        Some(slice)
    }
}

/// A reference backing allocator built on [`bumpalo::Bump`].
///
/// This is not required by [`Arena`]'s contract — any bump allocator, or a fixed caller-owned
/// buffer, works equally well behind the trait — but it is convenient for tests, examples, and
/// callers who simply want a working arena without writing their own.
#[cfg(any(feature = "std", test))]
pub struct BumpArena {
    bump: bumpalo::Bump,
}

#[cfg(any(feature = "std", test))]
impl BumpArena {
    /// Create a new, empty bump arena.
    pub fn new() -> Self {
        BumpArena {
            bump: bumpalo::Bump::new(),
        }
    }

    /// Drop all allocations made through this arena and reclaim the underlying chunks for reuse.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

#[cfg(any(feature = "std", test))]
impl Default for BumpArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(feature = "std", test))]
impl<'arena> Arena<'arena> for BumpArena {
    #[cfg_attr(feature = "trace", trace)]
    fn alloc(&'arena self, bytes: usize) -> Option<&'arena mut [u8]> {
        if bytes == 0 {
            return Some(&mut []);
        }
        Some(self.bump.alloc_slice_fill_copy(bytes, 0u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_arena_rejects_over_budget() {
        let backing = BumpArena::new();
        let limited = LimitedArena::new(&backing, 8);
        assert!(limited.alloc(4).is_some());
        assert!(limited.alloc(4).is_some());
        assert!(limited.alloc(1).is_none());
        assert_eq!(limited.allocated_bytes(), 8);
    }

    #[test]
    fn limited_arena_reset_clears_counter_not_backing() {
        let backing = BumpArena::new();
        let limited = LimitedArena::new(&backing, 8);
        assert!(limited.alloc(8).is_some());
        assert!(limited.alloc(1).is_none());
        limited.reset();
        assert_eq!(limited.allocated_bytes(), 0);
        assert!(limited.alloc(8).is_some());
    }

    #[test]
    fn zero_byte_allocation_always_succeeds() {
        let backing = BumpArena::new();
        let limited = LimitedArena::new(&backing, 0);
        let slice = limited.alloc(0).unwrap();
        assert_eq!(slice.len(), 0);
    }

    #[test]
    fn unbounded_limit_never_refuses() {
        let backing = BumpArena::new();
        let limited = LimitedArena::new(&backing, 0);
        assert!(limited.alloc(1 << 20).is_some());
    }
}
