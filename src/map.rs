//! The block map: an array of block handles, replaced wholesale when it grows.

use core::alloc::Layout;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::util::capacity_overflow;

/// Length of the first map allocated by a deque.
pub const MIN_MAP_LEN: usize = 8;

/// A handle slot. `None` means the block has never been allocated.
pub(crate) type Slot<T> = Option<NonNull<T>>;

/// An array of block handles.
///
/// The map does not own its allocation in the RAII sense: it is created and released
/// through the deque's allocator, which is why there is no `Drop` impl.
pub(crate) struct BlockMap<T> {
    slots: NonNull<[Slot<T>]>,
}

impl<T> BlockMap<T> {
    /// A map with no slots that owns no memory.
    pub(crate) fn empty() -> Self {
        Self {
            slots: NonNull::from(&[]),
        }
    }

    /// Allocates a map of `len` empty slots.
    pub(crate) fn allocate<A: Allocator>(alloc: &A, len: usize) -> Result<Self, (AllocError, Layout)> {
        debug_assert!(len > 0);

        let layout = Self::layout(len);
        let allocation = match alloc.allocate_zeroed(layout) {
            Ok(allocation) => allocation.cast::<Slot<T>>(),
            Err(err) => return Err((err, layout)),
        };

        // All-zero bytes are `None` for `Option<NonNull<T>>`.
        Ok(Self {
            slots: NonNull::slice_from_raw_parts(allocation, len),
        })
    }

    fn layout(len: usize) -> Layout {
        Layout::array::<Slot<T>>(len).unwrap_or_else(|_| capacity_overflow())
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slots(&self) -> &[Slot<T>] {
        unsafe { self.slots.as_ref() }
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<T>] {
        unsafe { self.slots.as_mut() }
    }

    /// Pointer to the first slot, valid for `len()` reads.
    pub(crate) fn as_ptr(&self) -> *const Slot<T> {
        self.slots.cast::<Slot<T>>().as_ptr()
    }

    /// Builds a larger map holding this map's handles in its middle.
    ///
    /// Returns the new map and the number of slots every old handle moved by.
    /// Blocks themselves are untouched; `self` still refers to the same handles afterwards.
    pub(crate) fn recentered<A: Allocator>(
        &self,
        alloc: &A,
        new_len: usize,
    ) -> Result<(Self, usize), (AllocError, Layout)> {
        debug_assert!(new_len > self.len());

        let shift = (new_len - self.len()) / 2;
        let mut map = Self::allocate(alloc, new_len)?;
        map.slots_mut()[shift..shift + self.len()].copy_from_slice(self.slots());

        Ok((map, shift))
    }

    /// Releases the handle array. Blocks referenced by the slots are not freed.
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator the map came from, and the map must not be used afterwards.
    pub(crate) unsafe fn free<A: Allocator>(&mut self, alloc: &A) {
        let len = self.len();

        if len > 0 {
            alloc.deallocate(self.slots.cast::<u8>(), Self::layout(len));
        }

        self.slots = NonNull::from(&[]);
    }
}

/// Smallest map length, doubling from `current`, that fits `required_end` once old handles are
/// re-centered. `required_end` is an exclusive element position relative to the current map.
pub(crate) fn grown_len<const BLOCK_SIZE: usize>(current: usize, required_end: usize) -> usize {
    let mut new_len = if current == 0 { MIN_MAP_LEN } else { double(current) };

    loop {
        let shift = (new_len - current) / 2;
        let end = shift
            .checked_mul(BLOCK_SIZE)
            .and_then(|shifted| shifted.checked_add(required_end))
            .unwrap_or_else(|| capacity_overflow());

        if end.div_ceil(BLOCK_SIZE) <= new_len {
            return new_len;
        }

        new_len = double(new_len);
    }
}

fn double(len: usize) -> usize {
    len.checked_mul(2).unwrap_or_else(|| capacity_overflow())
}
