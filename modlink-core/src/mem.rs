//! Allocation boundary for the module server
//!
//! C-style `alloc`/`calloc`/`free` over the global allocator. `free` takes
//! no size, so every block carries a small header in front of the user
//! pointer recording the requested size.
#![allow(unsafe_code)]

use alloc::alloc::{alloc, alloc_zeroed, dealloc, Layout};
use core::ptr::NonNull;

/// Alignment of every returned block
pub const ALIGN: usize = 8;

const HEADER: usize = ALIGN;

fn layout_for(size: usize) -> Option<Layout> {
    let total = size.checked_add(HEADER)?;
    Layout::from_size_align(total, ALIGN).ok()
}

fn allocate(size: usize, zeroed: bool) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }
    let layout = layout_for(size)?;
    // SAFETY: layout has non-zero size
    let base = unsafe {
        if zeroed {
            alloc_zeroed(layout)
        } else {
            alloc(layout)
        }
    };
    let base = NonNull::new(base)?;
    // SAFETY: base is valid for layout.size() >= HEADER bytes and aligned to
    // ALIGN, which satisfies usize alignment
    unsafe {
        base.as_ptr().cast::<usize>().write(size);
        Some(NonNull::new_unchecked(base.as_ptr().add(HEADER)))
    }
}

/// Allocate `size` bytes aligned to [`ALIGN`]
///
/// Returns `None` for a zero-sized request or when the allocator is out
/// of memory.
pub fn mem_alloc(size: usize) -> Option<NonNull<u8>> {
    allocate(size, false)
}

/// Allocate a zeroed array of `nmemb` elements of `size` bytes each
///
/// Returns `None` if the total size overflows, is zero, or cannot be
/// satisfied.
pub fn mem_calloc(nmemb: usize, size: usize) -> Option<NonNull<u8>> {
    let total = nmemb.checked_mul(size)?;
    allocate(total, true)
}

/// Release a block from [`mem_alloc`] or [`mem_calloc`]
///
/// `None` is a no-op.
///
/// # Safety
///
/// `ptr` must have been returned by [`mem_alloc`] or [`mem_calloc`] and not
/// freed since.
pub unsafe fn mem_free(ptr: Option<NonNull<u8>>) {
    let Some(ptr) = ptr else {
        return;
    };
    let base = ptr.as_ptr().sub(HEADER);
    let size = base.cast::<usize>().read();
    if let Some(layout) = layout_for(size) {
        dealloc(base, layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_size_is_none() {
        assert!(mem_alloc(0).is_none());
        assert!(mem_calloc(0, 16).is_none());
        assert!(mem_calloc(16, 0).is_none());
    }

    #[test]
    fn test_calloc_overflow_is_none() {
        assert!(mem_calloc(usize::MAX, 2).is_none());
        assert!(mem_calloc(2, usize::MAX / 2 + 1).is_none());
    }

    #[test]
    fn test_free_none_is_noop() {
        unsafe { mem_free(None) };
    }

    #[test]
    fn test_alloc_is_writable_and_aligned() {
        let ptr = mem_alloc(13).unwrap();
        assert_eq!(ptr.as_ptr() as usize % ALIGN, 0);
        unsafe {
            let bytes = core::slice::from_raw_parts_mut(ptr.as_ptr(), 13);
            bytes.fill(0xA5);
            assert!(bytes.iter().all(|&b| b == 0xA5));
            mem_free(Some(ptr));
        }
    }

    #[test]
    fn test_calloc_is_zeroed() {
        let ptr = mem_calloc(4, 6).unwrap();
        unsafe {
            let bytes = core::slice::from_raw_parts(ptr.as_ptr(), 24);
            assert!(bytes.iter().all(|&b| b == 0));
            mem_free(Some(ptr));
        }
    }

    proptest! {
        #[test]
        fn prop_blocks_do_not_overlap(a in 1usize..512, b in 1usize..512) {
            let first = mem_alloc(a).unwrap();
            let second = mem_alloc(b).unwrap();
            unsafe {
                core::slice::from_raw_parts_mut(first.as_ptr(), a).fill(1);
                core::slice::from_raw_parts_mut(second.as_ptr(), b).fill(2);
                prop_assert!(core::slice::from_raw_parts(first.as_ptr(), a).iter().all(|&x| x == 1));
                mem_free(Some(first));
                mem_free(Some(second));
            }
        }
    }
}
