#![doc = include_str!("doc.md")]
#![cfg_attr(not(any(test, doc, feature = "std")), no_std)]
#![cfg_attr(feature = "nightly", feature(allocator_api))]
#![warn(missing_debug_implementations, missing_docs)]

extern crate alloc;

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use core::ptr::NonNull;
use core::{mem, ptr};

use allocator_api2::alloc::{Allocator, Global};

pub use allocator_api2::alloc::AllocError;
pub use cursor::Cursor;
pub use error::OutOfRange;
pub use iter::{IntoIter, Iter, IterMut};
pub use map::MIN_MAP_LEN;

use crate::block::{allocate_block, free_block};
use crate::iter::RawIter;
use crate::map::BlockMap;
use crate::position::Position;
use crate::util::{assume_assert, capacity_overflow, trace, UnwrapExt};

mod block;
mod cursor;
mod error;
mod iter;
mod map;
mod position;
mod util;

#[doc = include_str!("doc.md")]
pub struct BlockDeque<T, const BLOCK_SIZE: usize = 64, A: Allocator = Global> {
    map: BlockMap<T>,
    alloc: A,
    /// Absolute position of the first element, counted in elements from the start of the map.
    start: usize,
    len: usize,
    /// Bumped whenever the map is reallocated; cursors remember it in debug builds.
    generation: usize,
    _marker: PhantomData<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

impl<T> Default for BlockDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockDeque<T> {
    /// Creates an empty deque with 64 element blocks.
    ///
    /// Nothing is allocated until the first element is pushed.
    /// Use [`with_block_size`](BlockDeque::with_block_size) to pick a different block size.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque = BlockDeque::<u32>::new();
    /// assert!(deque.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, const BLOCK_SIZE: usize> BlockDeque<T, BLOCK_SIZE> {
    /// Creates an empty deque whose blocks hold `BLOCK_SIZE` elements.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::<u32, 16>::with_block_size();
    /// deque.extend(0..100);
    /// assert_eq!(deque[99], 99);
    /// ```
    pub fn with_block_size() -> Self {
        Self::new_in(Global)
    }

    /// Creates a deque holding `count` clones of `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<_> = BlockDeque::from_elem(3, "x");
    /// assert!(deque.iter().eq(&["x", "x", "x"]));
    /// ```
    pub fn from_elem(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        let mut deque = Self::with_block_size();
        deque.extend(core::iter::repeat(value).take(count));
        deque
    }

    /// Creates a deque holding `count` default values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<u8> = BlockDeque::from_default(70);
    /// assert_eq!(deque.len(), 70);
    /// assert!(deque.iter().all(|x| *x == 0));
    /// ```
    pub fn from_default(count: usize) -> Self
    where
        T: Default,
    {
        let mut deque = Self::with_block_size();
        deque.extend(core::iter::repeat_with(T::default).take(count));
        deque
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> BlockDeque<T, BLOCK_SIZE, A> {
    const NONZERO_BLOCK_SIZE: () = assert!(BLOCK_SIZE > 0, "block size must be non-zero");

    pub(crate) fn new_in(alloc: A) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONZERO_BLOCK_SIZE;

        Self {
            map: BlockMap::empty(),
            alloc,
            start: 0,
            len: 0,
            generation: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements in the deque.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// assert_eq!(deque.len(), 0);
    ///
    /// deque.push_back(1);
    /// deque.push_front(0);
    /// assert_eq!(deque.len(), 2);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the deque contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn locate(&self, logical: isize) -> Position {
        position::locate::<BLOCK_SIZE>(self.start, logical)
    }

    /// Pointer to the live element at `index`.
    unsafe fn element_ptr(&self, index: usize) -> NonNull<T> {
        assume_assert!(index < self.len);

        let Position { block, offset } = self.locate(index as isize);
        let block = self.map.slots().get_unchecked(block).unwrap_assume();
        NonNull::new_unchecked(block.as_ptr().add(offset))
    }

    /// Returns a reference to the element at the index, or `None` if the index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// assert_eq!(deque.get(0), None);
    ///
    /// deque.push_front(1);
    /// assert_eq!(deque.get(0), Some(&1));
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        unsafe { Some(self.element_ptr(index).as_ref()) }
    }

    /// Returns a mutable reference to the element at the index, or `None` if the index is out of bounds.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }

        unsafe { Some(self.element_ptr(index).as_mut()) }
    }

    /// Returns a reference to the element at the index without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len`](BlockDeque::len).
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        self.element_ptr(index).as_ref()
    }

    /// Returns a mutable reference to the element at the index without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len`](BlockDeque::len).
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        self.element_ptr(index).as_mut()
    }

    /// Bounds-checked access that reports a failed check as an [`OutOfRange`] error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::{BlockDeque, OutOfRange};
    /// let deque: BlockDeque<_> = BlockDeque::from_iter([10, 20]);
    /// assert_eq!(deque.at(1), Ok(&20));
    /// assert_eq!(deque.at(2), Err(OutOfRange { index: 2, len: 2 }));
    /// ```
    pub fn at(&self, index: usize) -> Result<&T, OutOfRange> {
        self.get(index).ok_or(OutOfRange {
            index,
            len: self.len,
        })
    }

    /// Like [`at`](BlockDeque::at), but returning a mutable reference.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, OutOfRange> {
        let len = self.len;
        self.get_mut(index).ok_or(OutOfRange { index, len })
    }

    /// Returns the first element, if any.
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the first element mutably, if any.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Returns the last element, if any.
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Returns the last element mutably, if any.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len.checked_sub(1).and_then(|index| self.get_mut(index))
    }

    /// Appends an element to the back of the deque.
    ///
    /// Existing elements never move. If the block map is full it is doubled, which invalidates
    /// every [`Cursor`] obtained earlier.
    ///
    /// # Panics
    ///
    /// If the allocator fails to provide a block or a larger map.
    /// Use [`try_push_back`](BlockDeque::try_push_back) to recover from that instead.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// deque.push_back(1);
    /// deque.push_back(2);
    ///
    /// assert_eq!(deque[0], 1);
    /// assert_eq!(deque[1], 2);
    /// ```
    pub fn push_back(&mut self, value: T) {
        self.push_back_with(|| value)
    }

    /// Prepends an element to the front of the deque.
    ///
    /// # Panics
    ///
    /// See [`push_back`](BlockDeque::push_back#panics).
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// deque.push_front(3);
    /// deque.push_front(2);
    /// deque.push_front(1);
    ///
    /// assert!(deque.iter().eq(&[1, 2, 3]));
    /// ```
    pub fn push_front(&mut self, value: T) {
        self.push_front_with(|| value)
    }

    /// Appends the value produced by `f`, writing it straight into its slot.
    ///
    /// Storage is secured before `f` runs. If `f` panics, a block allocated for the new element
    /// is released again and a grown map is swapped back, so the deque is left as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// deque.push_back_with(|| [0u8; 4096]);
    /// assert_eq!(deque.len(), 1);
    /// ```
    pub fn push_back_with<F: FnOnce() -> T>(&mut self, f: F) {
        self.try_emplace(End::Back, f)
            .unwrap_or_else(|(_, layout)| handle_alloc_error(layout))
    }

    /// Like [`push_back_with`](BlockDeque::push_back_with), at the front.
    pub fn push_front_with<F: FnOnce() -> T>(&mut self, f: F) {
        self.try_emplace(End::Front, f)
            .unwrap_or_else(|(_, layout)| handle_alloc_error(layout))
    }

    /// Appends an element, handling allocation failure gracefully.
    ///
    /// On failure the value is dropped and the deque is exactly as it was before the call,
    /// including its block map, so cursors stay valid.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// assert!(deque.try_push_back(1).is_ok());
    /// ```
    pub fn try_push_back(&mut self, value: T) -> Result<(), AllocError> {
        self.try_emplace(End::Back, || value).map_err(|(err, _)| err)
    }

    /// Like [`try_push_back`](BlockDeque::try_push_back), at the front.
    pub fn try_push_front(&mut self, value: T) -> Result<(), AllocError> {
        self.try_emplace(End::Front, || value).map_err(|(err, _)| err)
    }

    fn try_emplace<F: FnOnce() -> T>(&mut self, end: End, f: F) -> Result<(), (AllocError, Layout)> {
        let mut push = Emplace::begin(self, end)?;
        let target = push.target();
        let block = push.block(target.block)?;

        let value = f();

        unsafe {
            ptr::write(block.as_ptr().add(target.offset), value);
        }

        push.commit();
        Ok(())
    }

    /// Doubles the map until `required_end` fits, re-centering the existing handles.
    ///
    /// `required_end` is an exclusive absolute position in the current map. The old map is handed
    /// back together with the shift so the caller can free it or swap it back.
    fn grow_map(&mut self, required_end: usize) -> Result<(BlockMap<T>, usize), (AllocError, Layout)> {
        let old_len = self.map.len();
        let new_len = map::grown_len::<BLOCK_SIZE>(old_len, required_end);
        let (grown, shift) = self.map.recentered(&self.alloc, new_len)?;

        let retired = mem::replace(&mut self.map, grown);
        self.start += shift * BLOCK_SIZE;
        self.generation = self.generation.wrapping_add(1);

        trace!(old_len, new_len, shift, "grew block map");

        Ok((retired, shift))
    }

    /// Undoes [`grow_map`](Self::grow_map).
    fn restore_map(&mut self, retired: BlockMap<T>, shift: usize) {
        let mut grown = mem::replace(&mut self.map, retired);

        unsafe {
            grown.free(&self.alloc);
        }

        self.start -= shift * BLOCK_SIZE;
        self.generation = self.generation.wrapping_sub(1);

        trace!(shift, "restored block map after a failed push");
    }

    /// Removes and returns the last element, or `None` if the deque is empty.
    ///
    /// The block that held the element stays allocated for later pushes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter([1, 2]);
    ///
    /// assert_eq!(deque.pop_back(), Some(2));
    /// assert_eq!(deque.pop_back(), Some(1));
    /// assert_eq!(deque.pop_back(), None);
    /// ```
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        unsafe {
            let ptr = self.element_ptr(self.len - 1);
            self.len -= 1;
            Some(ptr::read(ptr.as_ptr()))
        }
    }

    /// Removes and returns the first element, or `None` if the deque is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter([1, 2]);
    ///
    /// assert_eq!(deque.pop_front(), Some(1));
    /// assert_eq!(deque.pop_front(), Some(2));
    /// assert_eq!(deque.pop_front(), None);
    /// ```
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        unsafe {
            let ptr = self.element_ptr(0);
            self.start += 1;
            self.len -= 1;
            Some(ptr::read(ptr.as_ptr()))
        }
    }

    /// Swaps the elements at indices `i` and `j`.
    ///
    /// # Panics
    ///
    /// If either index is out of bounds.
    pub fn swap(&mut self, i: usize, j: usize) {
        if i >= self.len || j >= self.len {
            panic!("index out of bounds (i={}, j={}, len={})", i, j, self.len);
        }

        unsafe {
            ptr::swap(self.element_ptr(i).as_ptr(), self.element_ptr(j).as_ptr());
        }
    }

    /// Carries the element at `movable` to `dest`.
    ///
    /// `movable` is swapped with every slot from `dest` towards it, which shifts the elements in
    /// between one step towards `movable` while keeping their order.
    fn rotate_into(&mut self, movable: usize, mut dest: usize) {
        while dest != movable {
            self.swap(movable, dest);

            if dest < movable {
                dest += 1;
            } else {
                dest -= 1;
            }
        }
    }

    /// Inserts an element at the index, shifting the elements on the shorter side of it.
    ///
    /// The value is pushed onto the nearer end and swapped into place, so this costs
    /// O(min(index, len - index)). Elements that get shifted change address.
    ///
    /// # Panics
    ///
    /// If `index > len`, or see [`push_back`](BlockDeque::push_back#panics).
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter([10, 30]);
    /// deque.insert(1, 20);
    ///
    /// assert!(deque.iter().eq(&[10, 20, 30]));
    /// ```
    pub fn insert(&mut self, index: usize, value: T) {
        self.try_insert_internal(index, value)
            .unwrap_or_else(|(_, layout)| handle_alloc_error(layout))
    }

    /// Like [`insert`](BlockDeque::insert), but with graceful handling of allocation failure.
    ///
    /// # Panics
    ///
    /// If `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), AllocError> {
        self.try_insert_internal(index, value)
            .map_err(|(err, _)| err)
    }

    fn try_insert_internal(&mut self, index: usize, value: T) -> Result<(), (AllocError, Layout)> {
        if index > self.len {
            panic!("index out of bounds (index={}, len={})", index, self.len);
        }

        if index < self.len - index {
            self.try_emplace(End::Front, || value)?;
            self.rotate_into(0, index);
        } else {
            self.try_emplace(End::Back, || value)?;
            self.rotate_into(self.len - 1, index);
        }

        Ok(())
    }

    /// Removes and returns the element at the index, closing the gap from the shorter side.
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter([1, 2, 3]);
    ///
    /// assert_eq!(deque.remove(0), 1);
    /// assert_eq!(deque.remove(1), 3);
    /// assert_eq!(deque.remove(0), 2);
    /// ```
    pub fn remove(&mut self, index: usize) -> T {
        if index >= self.len {
            panic!("index out of bounds (index={}, len={})", index, self.len);
        }

        unsafe {
            if index < self.len - 1 - index {
                self.swap(index, 0);
                let result = self.pop_front().unwrap_assume();

                if index > 0 {
                    self.rotate_into(index - 1, 0);
                }

                result
            } else {
                self.swap(index, self.len - 1);
                let result = self.pop_back().unwrap_assume();

                if index < self.len {
                    self.rotate_into(index, self.len - 1);
                }

                result
            }
        }
    }

    /// Inserts an element before the one `position` points at (or at the back for
    /// [`end`](BlockDeque::end)).
    ///
    /// `position`, and every other cursor, must be considered invalid afterwards.
    ///
    /// # Panics
    ///
    /// If `position` lies outside `begin()..=end()`.
    pub fn insert_at(&mut self, position: Cursor<T, BLOCK_SIZE>, value: T) {
        let offset = self.offset_of(&position);

        if offset < 0 || offset as usize > self.len {
            panic!("cursor out of bounds (offset={}, len={})", offset, self.len);
        }

        self.insert(offset as usize, value);
    }

    /// Removes and returns the element `position` points at.
    ///
    /// `position`, and every other cursor, must be considered invalid afterwards.
    ///
    /// # Panics
    ///
    /// If `position` does not point at an element.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter(0..10);
    /// let fifth = deque.begin() + 5;
    ///
    /// assert_eq!(deque.erase(fifth), 5);
    /// assert!(deque.iter().copied().eq([0, 1, 2, 3, 4, 6, 7, 8, 9]));
    /// ```
    pub fn erase(&mut self, position: Cursor<T, BLOCK_SIZE>) -> T {
        match self.index_of(position) {
            Some(index) => self.remove(index),
            None => panic!("cursor does not point at an element"),
        }
    }

    /// Removes every element. Allocated blocks are kept for reuse.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque: BlockDeque<_> = BlockDeque::from_iter(0..100);
    /// deque.clear();
    /// assert!(deque.is_empty());
    /// ```
    pub fn clear(&mut self) {
        let len = mem::replace(&mut self.len, 0);

        unsafe {
            for ptr in self.raw_iter(0, len) {
                ptr::drop_in_place(ptr.as_ptr());
            }
        }

        self.start = self.map.len() / 2 * BLOCK_SIZE;
    }

    /// Makes sure the next `additional` [`push_back`](BlockDeque::push_back)s need no allocation.
    ///
    /// The map is grown and every block those elements will land in is allocated up front.
    ///
    /// # Panics
    ///
    /// If the allocator fails, or the required size overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve_internal(additional)
            .unwrap_or_else(|(_, layout)| handle_alloc_error(layout))
    }

    /// Like [`reserve`](BlockDeque::reserve), but with graceful handling of allocation failure.
    ///
    /// The elements are untouched on failure, although the map may have grown and some blocks
    /// may already be allocated.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        self.try_reserve_internal(additional)
            .map_err(|(err, _)| err)
    }

    fn try_reserve_internal(&mut self, additional: usize) -> Result<(), (AllocError, Layout)> {
        if additional == 0 {
            return Ok(());
        }

        let required_end = self
            .start
            .checked_add(self.len)
            .and_then(|end| end.checked_add(additional))
            .unwrap_or_else(|| capacity_overflow());

        if required_end.div_ceil(BLOCK_SIZE) > self.map.len() {
            let (mut retired, _) = self.grow_map(required_end)?;

            unsafe {
                retired.free(&self.alloc);
            }
        }

        let first = self.locate(self.len as isize).block;
        let last = self.locate((self.len + additional - 1) as isize).block;

        for index in first..=last {
            if self.map.slots()[index].is_none() {
                let block = allocate_block::<T, BLOCK_SIZE, A>(&self.alloc)?;
                self.map.slots_mut()[index] = Some(block);
            }
        }

        trace!(additional, first, last, "reserved blocks");

        Ok(())
    }

    fn cursor_at(&self, logical: isize) -> Cursor<T, BLOCK_SIZE> {
        let Position { block, offset } = self.locate(logical);
        Cursor::new(block as isize, offset, self.generation)
    }

    /// A cursor at the first element, equal to [`end`](BlockDeque::end) when the deque is empty.
    pub fn begin(&self) -> Cursor<T, BLOCK_SIZE> {
        self.cursor_at(0)
    }

    /// A cursor one past the last element.
    ///
    /// It may point at the first slot of a block that is not allocated yet and is never
    /// dereferenced; [`get_at`](BlockDeque::get_at) returns `None` for it.
    pub fn end(&self) -> Cursor<T, BLOCK_SIZE> {
        self.cursor_at(self.len as isize)
    }

    /// A cursor at the index.
    ///
    /// # Panics
    ///
    /// If `index > len`.
    pub fn cursor(&self, index: usize) -> Cursor<T, BLOCK_SIZE> {
        if index > self.len {
            panic!("index out of bounds (index={}, len={})", index, self.len);
        }

        self.cursor_at(index as isize)
    }

    #[track_caller]
    fn check_generation(&self, cursor: &Cursor<T, BLOCK_SIZE>) {
        #[cfg(debug_assertions)]
        assert_eq!(
            cursor.generation, self.generation,
            "cursor used after the block map was reallocated"
        );

        #[cfg(not(debug_assertions))]
        let _ = cursor;
    }

    #[track_caller]
    fn offset_of(&self, cursor: &Cursor<T, BLOCK_SIZE>) -> isize {
        self.check_generation(cursor);
        cursor.distance_from(&self.begin())
    }

    /// The index of the element the cursor points at, or `None` if it points outside the elements.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<_> = BlockDeque::from_iter(0..100);
    /// assert_eq!(deque.index_of(deque.begin() + 70), Some(70));
    /// assert_eq!(deque.index_of(deque.end()), None);
    /// ```
    #[track_caller]
    pub fn index_of(&self, cursor: Cursor<T, BLOCK_SIZE>) -> Option<usize> {
        let offset = self.offset_of(&cursor);

        if offset >= 0 && (offset as usize) < self.len {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Returns the element the cursor points at, or `None` if it points outside the elements.
    #[track_caller]
    pub fn get_at(&self, cursor: Cursor<T, BLOCK_SIZE>) -> Option<&T> {
        self.index_of(cursor)
            .map(|_| unsafe { self.get_at_unchecked(cursor) })
    }

    /// Returns the element the cursor points at mutably, or `None` if it points outside the elements.
    #[track_caller]
    pub fn get_at_mut(&mut self, cursor: Cursor<T, BLOCK_SIZE>) -> Option<&mut T> {
        self.index_of(cursor)?;
        unsafe { Some(&mut *self.slot_ptr(&cursor).as_ptr()) }
    }

    /// Returns the element the cursor points at, reading straight through its block map slot.
    ///
    /// # Safety
    ///
    /// The cursor must point at a live element of this deque, and the map must not have been
    /// reallocated since the cursor was obtained.
    #[track_caller]
    pub unsafe fn get_at_unchecked(&self, cursor: Cursor<T, BLOCK_SIZE>) -> &T {
        self.check_generation(&cursor);
        &*self.slot_ptr(&cursor).as_ptr()
    }

    unsafe fn slot_ptr(&self, cursor: &Cursor<T, BLOCK_SIZE>) -> NonNull<T> {
        assume_assert!(cursor.slot >= 0);
        assume_assert!(cursor.offset < BLOCK_SIZE);

        let block = self
            .map
            .slots()
            .get_unchecked(cursor.slot as usize)
            .unwrap_assume();

        NonNull::new_unchecked(block.as_ptr().add(cursor.offset))
    }

    unsafe fn raw_iter(&self, from: usize, len: usize) -> RawIter<'_, T, BLOCK_SIZE> {
        let Position { block, offset } = self.locate(from as isize);
        RawIter::new(self.map.as_ptr(), (block as isize, offset), len)
    }

    /// Returns an iterator over the elements, front to back.
    ///
    /// The iterator is double-ended, so `iter().rev()` walks back to front.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<_> = BlockDeque::from_iter([1, 2, 3]);
    /// let mut iter = deque.iter();
    ///
    /// assert_eq!(iter.next(), Some(&1));
    /// assert_eq!(iter.next_back(), Some(&3));
    /// assert_eq!(iter.next(), Some(&2));
    /// assert_eq!(iter.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<'_, T, BLOCK_SIZE> {
        unsafe { Iter::new(self.raw_iter(0, self.len)) }
    }

    /// Like [`iter`](BlockDeque::iter), but returning mutable references.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, BLOCK_SIZE> {
        unsafe { IterMut::new(self.raw_iter(0, self.len)) }
    }

    /// Returns an iterator over the elements from `from` up to, but excluding, `to`.
    ///
    /// # Panics
    ///
    /// If the cursors are out of order or outside `begin()..=end()`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<_> = BlockDeque::from_iter(0..200);
    /// let from = deque.begin() + 60;
    /// let to = deque.begin() + 70;
    ///
    /// assert!(deque.iter_between(from, to).copied().eq(60..70));
    /// ```
    #[track_caller]
    pub fn iter_between(
        &self,
        from: Cursor<T, BLOCK_SIZE>,
        to: Cursor<T, BLOCK_SIZE>,
    ) -> Iter<'_, T, BLOCK_SIZE> {
        let start = self.offset_of(&from);
        let end = self.offset_of(&to);

        if start < 0 || start > end || end as usize > self.len {
            panic!("invalid cursor range (start={}, end={}, len={})", start, end, self.len);
        }

        unsafe { Iter::new(self.raw_iter(start as usize, (end - start) as usize)) }
    }
}

/// One push in flight. Dropping it without [`commit`](Emplace::commit) undoes the block
/// allocation and map growth it performed.
struct Emplace<'a, T, const BLOCK_SIZE: usize, A: Allocator> {
    deque: &'a mut BlockDeque<T, BLOCK_SIZE, A>,
    end: End,
    retired: Option<(BlockMap<T>, usize)>,
    fresh_block: Option<usize>,
}

impl<'a, T, const BLOCK_SIZE: usize, A: Allocator> Emplace<'a, T, BLOCK_SIZE, A> {
    fn begin(
        deque: &'a mut BlockDeque<T, BLOCK_SIZE, A>,
        end: End,
    ) -> Result<Self, (AllocError, Layout)> {
        let full = match end {
            End::Back => deque.locate(deque.len as isize).block >= deque.map.len(),
            End::Front => deque.start == 0,
        };

        let retired = if full {
            Some(deque.grow_map(deque.start + deque.len + 1)?)
        } else {
            None
        };

        Ok(Self {
            deque,
            end,
            retired,
            fresh_block: None,
        })
    }

    fn target(&self) -> Position {
        match self.end {
            End::Back => self.deque.locate(self.deque.len as isize),
            End::Front => self.deque.locate(-1),
        }
    }

    fn block(&mut self, index: usize) -> Result<NonNull<T>, (AllocError, Layout)> {
        if let Some(block) = self.deque.map.slots()[index] {
            return Ok(block);
        }

        let block = allocate_block::<T, BLOCK_SIZE, A>(&self.deque.alloc)?;
        self.deque.map.slots_mut()[index] = Some(block);
        self.fresh_block = Some(index);

        Ok(block)
    }

    fn commit(mut self) {
        self.fresh_block = None;

        if self.end == End::Front {
            self.deque.start -= 1;
        }

        self.deque.len += 1;

        if let Some((mut retired, _)) = self.retired.take() {
            unsafe {
                retired.free(&self.deque.alloc);
            }
        }
    }
}

impl<'a, T, const BLOCK_SIZE: usize, A: Allocator> Drop for Emplace<'a, T, BLOCK_SIZE, A> {
    fn drop(&mut self) {
        if let Some(index) = self.fresh_block.take() {
            if let Some(block) = self.deque.map.slots_mut()[index].take() {
                unsafe {
                    free_block::<T, BLOCK_SIZE, A>(&self.deque.alloc, block);
                }
            }
        }

        if let Some((retired, shift)) = self.retired.take() {
            self.deque.restore_map(retired, shift);
        }
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> Drop for BlockDeque<T, BLOCK_SIZE, A> {
    fn drop(&mut self) {
        self.clear();

        unsafe {
            for block in self.map.slots().iter().flatten() {
                free_block::<T, BLOCK_SIZE, A>(&self.alloc, *block);
            }

            self.map.free(&self.alloc);
        }
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> Extend<T> for BlockDeque<T, BLOCK_SIZE, A> {
    /// Appends every element of the iterator to the back.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let mut deque = BlockDeque::new();
    /// deque.extend(0..5);
    /// assert!(deque.iter().copied().eq(0..5));
    /// ```
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        iter.for_each(|value| self.push_back(value));
    }
}

impl<'a, T: Copy + 'a, const BLOCK_SIZE: usize, A: Allocator> Extend<&'a T>
    for BlockDeque<T, BLOCK_SIZE, A>
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const BLOCK_SIZE: usize> FromIterator<T> for BlockDeque<T, BLOCK_SIZE> {
    /// Creates a deque with the elements of an iterator, front to back.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_deque::BlockDeque;
    /// let deque: BlockDeque<_> = (1..=3).collect();
    /// assert_eq!(deque.front(), Some(&1));
    /// assert_eq!(deque.back(), Some(&3));
    /// ```
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::with_block_size();
        deque.extend(iter);
        deque
    }
}

impl<T, const N: usize, const BLOCK_SIZE: usize> From<[T; N]> for BlockDeque<T, BLOCK_SIZE> {
    fn from(values: [T; N]) -> Self {
        Self::from_iter(values)
    }
}

impl<T, const BLOCK_SIZE: usize> From<alloc::vec::Vec<T>> for BlockDeque<T, BLOCK_SIZE> {
    fn from(values: alloc::vec::Vec<T>) -> Self {
        Self::from_iter(values)
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> IntoIterator for BlockDeque<T, BLOCK_SIZE, A> {
    type Item = T;
    type IntoIter = IntoIter<T, BLOCK_SIZE, A>;

    /// Converts the deque into an iterator yielding each element by value.
    fn into_iter(self) -> IntoIter<T, BLOCK_SIZE, A> {
        IntoIter::new(self)
    }
}

impl<'a, T, const BLOCK_SIZE: usize, A: Allocator> IntoIterator for &'a BlockDeque<T, BLOCK_SIZE, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, BLOCK_SIZE>;

    fn into_iter(self) -> Iter<'a, T, BLOCK_SIZE> {
        self.iter()
    }
}

impl<'a, T, const BLOCK_SIZE: usize, A: Allocator> IntoIterator
    for &'a mut BlockDeque<T, BLOCK_SIZE, A>
{
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, BLOCK_SIZE>;

    fn into_iter(self) -> IterMut<'a, T, BLOCK_SIZE> {
        self.iter_mut()
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> Index<usize> for BlockDeque<T, BLOCK_SIZE, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(result) => result,
            None => {
                panic!("index out of bounds (index={}, len={})", index, self.len);
            }
        }
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> IndexMut<usize> for BlockDeque<T, BLOCK_SIZE, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;

        match self.get_mut(index) {
            Some(result) => result,
            None => {
                panic!("index out of bounds (index={}, len={})", index, len);
            }
        }
    }
}

impl<T: Debug, const BLOCK_SIZE: usize, A: Allocator> Debug for BlockDeque<T, BLOCK_SIZE, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }
}

impl<T: Clone, const BLOCK_SIZE: usize, A: Allocator + Clone> Clone for BlockDeque<T, BLOCK_SIZE, A> {
    /// Deep-copies every element into freshly allocated blocks.
    fn clone(&self) -> Self {
        let mut result = Self::new_in(self.alloc.clone());
        result.extend(self.iter().cloned());
        result
    }
}

impl<T: PartialEq, const BLOCK_SIZE: usize, A: Allocator> PartialEq for BlockDeque<T, BLOCK_SIZE, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && Iterator::eq(self.iter(), other.iter())
    }
}

impl<T: Eq, const BLOCK_SIZE: usize, A: Allocator> Eq for BlockDeque<T, BLOCK_SIZE, A> {}

impl<T: Hash, const BLOCK_SIZE: usize, A: Allocator> Hash for BlockDeque<T, BLOCK_SIZE, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);

        for value in self.iter() {
            Hash::hash(value, state);
        }
    }
}

impl<T: PartialOrd, const BLOCK_SIZE: usize, A: Allocator> PartialOrd for BlockDeque<T, BLOCK_SIZE, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Iterator::partial_cmp(self.iter(), other.iter())
    }
}

impl<T: Ord, const BLOCK_SIZE: usize, A: Allocator> Ord for BlockDeque<T, BLOCK_SIZE, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        Iterator::cmp(self.iter(), other.iter())
    }
}

unsafe impl<T: Send, const BLOCK_SIZE: usize, A: Allocator + Send> Send
    for BlockDeque<T, BLOCK_SIZE, A>
{
}

unsafe impl<T: Sync, const BLOCK_SIZE: usize, A: Allocator + Sync> Sync
    for BlockDeque<T, BLOCK_SIZE, A>
{
}
