use core::fmt::{self, Debug, Formatter};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use allocator_api2::alloc::{Allocator, Global};

use crate::map::Slot;
use crate::position;
use crate::util::{assume_assert, forward_raw_iter, UnwrapExt};
use crate::BlockDeque;

/// Walks a run of live elements, yielding pointers to them.
///
/// `front` is the position of the next element from the front; the back is derived from `len`,
/// so both ends can jump any distance in O(1).
pub(crate) struct RawIter<'a, T, const BLOCK_SIZE: usize> {
    slots: *const Slot<T>,
    front: (isize, usize),
    len: usize,
    _marker: PhantomData<&'a ()>,
}

impl<'a, T, const BLOCK_SIZE: usize> RawIter<'a, T, BLOCK_SIZE> {
    /// # Safety
    ///
    /// The `len` elements starting at `front` must be live, and the map behind `slots` must
    /// outlive `'a` without being reallocated.
    pub(crate) unsafe fn new(slots: *const Slot<T>, front: (isize, usize), len: usize) -> Self {
        Self {
            slots,
            front,
            len,
            _marker: PhantomData,
        }
    }

    unsafe fn element(&self, index: usize) -> NonNull<T> {
        assume_assert!(index < self.len);

        let (slot, offset) = position::advance::<BLOCK_SIZE>(self.front.0, self.front.1, index as isize);
        assume_assert!(slot >= 0);

        let block = (*self.slots.add(slot as usize)).unwrap_assume();
        NonNull::new_unchecked(block.as_ptr().add(offset))
    }
}

impl<'a, T, const BLOCK_SIZE: usize> Iterator for RawIter<'a, T, BLOCK_SIZE> {
    type Item = NonNull<T>;

    fn next(&mut self) -> Option<NonNull<T>> {
        #[allow(clippy::iter_nth_zero)]
        self.nth(0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn nth(&mut self, n: usize) -> Option<NonNull<T>> {
        if n >= self.len {
            self.len = 0;
            return None;
        }

        unsafe {
            let result = self.element(n);
            self.front = position::advance::<BLOCK_SIZE>(self.front.0, self.front.1, n as isize + 1);
            self.len -= n + 1;
            Some(result)
        }
    }
}

impl<'a, T, const BLOCK_SIZE: usize> DoubleEndedIterator for RawIter<'a, T, BLOCK_SIZE> {
    fn next_back(&mut self) -> Option<NonNull<T>> {
        self.nth_back(0)
    }

    fn nth_back(&mut self, n: usize) -> Option<NonNull<T>> {
        if n >= self.len {
            self.len = 0;
            return None;
        }

        unsafe {
            let result = self.element(self.len - 1 - n);
            self.len -= n + 1;
            Some(result)
        }
    }
}

impl<'a, T, const BLOCK_SIZE: usize> Clone for RawIter<'a, T, BLOCK_SIZE> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            front: self.front,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

/// Returned by [`BlockDeque::iter`] and [`BlockDeque::iter_between`].
pub struct Iter<'a, T: 'a, const BLOCK_SIZE: usize = 64> {
    raw: RawIter<'a, T, BLOCK_SIZE>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T, const BLOCK_SIZE: usize> Iter<'a, T, BLOCK_SIZE> {
    pub(crate) fn new(raw: RawIter<'a, T, BLOCK_SIZE>) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

forward_raw_iter! {
    Iter<'a, T, const BLOCK_SIZE: usize>;
    item = &'a T;
    map = |ptr: NonNull<T>| unsafe { &*ptr.as_ptr() };
}

impl<'a, T, const BLOCK_SIZE: usize> Clone for Iter<'a, T, BLOCK_SIZE> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<'a, T: Debug, const BLOCK_SIZE: usize> Debug for Iter<'a, T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.clone().collect::<Remaining<_>>()).finish()
    }
}

unsafe impl<'a, T: Sync, const BLOCK_SIZE: usize> Send for Iter<'a, T, BLOCK_SIZE> {}

unsafe impl<'a, T: Sync, const BLOCK_SIZE: usize> Sync for Iter<'a, T, BLOCK_SIZE> {}

/// Returned by [`BlockDeque::iter_mut`].
pub struct IterMut<'a, T: 'a, const BLOCK_SIZE: usize = 64> {
    raw: RawIter<'a, T, BLOCK_SIZE>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, const BLOCK_SIZE: usize> IterMut<'a, T, BLOCK_SIZE> {
    pub(crate) fn new(raw: RawIter<'a, T, BLOCK_SIZE>) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

forward_raw_iter! {
    IterMut<'a, T, const BLOCK_SIZE: usize>;
    item = &'a mut T;
    map = |ptr: NonNull<T>| unsafe { &mut *ptr.as_ptr() };
}

impl<'a, T: Debug, const BLOCK_SIZE: usize> Debug for IterMut<'a, T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let remaining = Iter::new(self.raw.clone());
        f.debug_tuple("IterMut").field(&remaining.collect::<Remaining<_>>()).finish()
    }
}

unsafe impl<'a, T: Send, const BLOCK_SIZE: usize> Send for IterMut<'a, T, BLOCK_SIZE> {}

unsafe impl<'a, T: Sync, const BLOCK_SIZE: usize> Sync for IterMut<'a, T, BLOCK_SIZE> {}

/// Returned by [`BlockDeque::into_iter`].
///
/// Elements are taken from the deque one at a time; dropping the iterator drops whatever is left.
pub struct IntoIter<T, const BLOCK_SIZE: usize = 64, A: Allocator = Global> {
    deque: BlockDeque<T, BLOCK_SIZE, A>,
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> IntoIter<T, BLOCK_SIZE, A> {
    pub(crate) fn new(deque: BlockDeque<T, BLOCK_SIZE, A>) -> Self {
        Self { deque }
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> Iterator for IntoIter<T, BLOCK_SIZE, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.deque.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.deque.len(), Some(self.deque.len()))
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> DoubleEndedIterator for IntoIter<T, BLOCK_SIZE, A> {
    fn next_back(&mut self) -> Option<T> {
        self.deque.pop_back()
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> FusedIterator for IntoIter<T, BLOCK_SIZE, A> {}

impl<T, const BLOCK_SIZE: usize, A: Allocator> ExactSizeIterator for IntoIter<T, BLOCK_SIZE, A> {}

impl<T: Debug, const BLOCK_SIZE: usize, A: Allocator> Debug for IntoIter<T, BLOCK_SIZE, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.deque).finish()
    }
}

/// Debug helper listing the elements an iterator has left.
struct Remaining<'a, T>(alloc::vec::Vec<&'a T>);

impl<'a, T> FromIterator<&'a T> for Remaining<'a, T> {
    fn from_iter<I: IntoIterator<Item = &'a T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a, T: Debug> Debug for Remaining<'a, T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use crate::BlockDeque;

    #[test]
    fn nth_skips_across_blocks() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..50);
        let mut iter = deque.iter();

        assert_eq!(iter.nth(9), Some(&9));
        assert_eq!(iter.nth(0), Some(&10));
        assert_eq!(iter.nth_back(4), Some(&45));
        assert_eq!(iter.len(), 50 - 11 - 5);
        assert_eq!(iter.nth(100), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn front_and_back_meet() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..9);
        let mut iter = deque.iter();
        let mut seen = Vec::new();

        while let Some(x) = iter.next() {
            seen.push(*x);
            if let Some(y) = iter.next_back() {
                seen.push(*y);
            }
        }

        assert_eq!(seen, [0, 8, 1, 7, 2, 6, 3, 5, 4]);
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut deque = BlockDeque::<u32, 4>::from_iter(0..20);
        deque.iter_mut().rev().for_each(|x| *x *= 2);
        assert!(deque.iter().copied().eq((0..20).map(|x| x * 2)));
    }

    #[test]
    fn into_iter_from_both_ends() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..6);
        let mut iter = deque.into_iter();

        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next_back(), Some(5));
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn debug_lists_remaining() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..3);
        let mut iter = deque.iter();
        iter.next();
        assert_eq!(alloc::format!("{:?}", iter), "Iter([1, 2])");
    }
}
