//! Raw storage for one block of elements.

use core::alloc::Layout;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::util::{capacity_overflow, is_zst};

/// Layout of a block holding `BLOCK_SIZE` elements.
pub(crate) fn block_layout<T, const BLOCK_SIZE: usize>() -> Layout {
    Layout::array::<T>(BLOCK_SIZE).unwrap_or_else(|_| capacity_overflow())
}

/// Reserves uninitialized storage for `BLOCK_SIZE` elements.
///
/// Zero-sized elements never reach the allocator; their blocks are dangling handles.
pub(crate) fn allocate_block<T, const BLOCK_SIZE: usize, A: Allocator>(
    alloc: &A,
) -> Result<NonNull<T>, (AllocError, Layout)> {
    if is_zst::<T>() {
        return Ok(NonNull::dangling());
    }

    let layout = block_layout::<T, BLOCK_SIZE>();

    match alloc.allocate(layout) {
        Ok(allocation) => Ok(allocation.cast::<T>()),
        Err(err) => Err((err, layout)),
    }
}

/// Releases a block obtained from [`allocate_block`].
///
/// # Safety
///
/// `block` must come from `allocate_block` with the same allocator and block size,
/// and no live element may remain inside it.
pub(crate) unsafe fn free_block<T, const BLOCK_SIZE: usize, A: Allocator>(
    alloc: &A,
    block: NonNull<T>,
) {
    if is_zst::<T>() {
        return;
    }

    alloc.deallocate(block.cast::<u8>(), block_layout::<T, BLOCK_SIZE>());
}
