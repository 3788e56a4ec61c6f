use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Add, AddAssign, Sub, SubAssign};

use crate::position;

/// A random-access position inside a [`BlockDeque`](crate::BlockDeque).
///
/// A cursor is a block map slot plus an offset inside that block. It borrows nothing, so it can
/// be kept across mutations, but it only stays meaningful while the block map is not reallocated:
/// any push that grows the map invalidates every cursor obtained before it. Debug builds detect
/// such stale cursors when they are passed back to the deque.
///
/// Moving a cursor never consults the deque; `cursor + n` and `a - b` are O(1) regardless of how
/// many blocks they span.
///
/// # Examples
///
/// ```
/// # use block_deque::BlockDeque;
/// let deque: BlockDeque<i32> = (0..200).collect();
/// let begin = deque.begin();
/// let end = deque.end();
///
/// assert_eq!(end - begin, 200);
/// assert_eq!(deque.get_at(begin + 150), Some(&150));
/// assert_eq!(deque.get_at(end), None);
/// ```
pub struct Cursor<T, const BLOCK_SIZE: usize = 64> {
    pub(crate) slot: isize,
    pub(crate) offset: usize,
    #[cfg(debug_assertions)]
    pub(crate) generation: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, const BLOCK_SIZE: usize> Cursor<T, BLOCK_SIZE> {
    pub(crate) fn new(slot: isize, offset: usize, generation: usize) -> Self {
        #[cfg(not(debug_assertions))]
        let _ = generation;

        Self {
            slot,
            offset,
            #[cfg(debug_assertions)]
            generation,
            _marker: PhantomData,
        }
    }

    /// Moves the cursor by `delta` elements, forwards or backwards.
    pub fn advance(&mut self, delta: isize) {
        (self.slot, self.offset) = position::advance::<BLOCK_SIZE>(self.slot, self.offset, delta);
    }

    /// Number of elements from `origin` to `self`.
    ///
    /// Both cursors must come from the same deque with no map growth in between.
    pub fn distance_from(&self, origin: &Self) -> isize {
        position::distance::<BLOCK_SIZE>((self.slot, self.offset), (origin.slot, origin.offset))
    }
}

impl<T, const BLOCK_SIZE: usize> Clone for Cursor<T, BLOCK_SIZE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const BLOCK_SIZE: usize> Copy for Cursor<T, BLOCK_SIZE> {}

impl<T, const BLOCK_SIZE: usize> Debug for Cursor<T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("slot", &self.slot)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T, const BLOCK_SIZE: usize> PartialEq for Cursor<T, BLOCK_SIZE> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.offset == other.offset
    }
}

impl<T, const BLOCK_SIZE: usize> Eq for Cursor<T, BLOCK_SIZE> {}

impl<T, const BLOCK_SIZE: usize> PartialOrd for Cursor<T, BLOCK_SIZE> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, const BLOCK_SIZE: usize> Ord for Cursor<T, BLOCK_SIZE> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slot
            .cmp(&other.slot)
            .then(self.offset.cmp(&other.offset))
    }
}

impl<T, const BLOCK_SIZE: usize> Hash for Cursor<T, BLOCK_SIZE> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.offset.hash(state);
    }
}

impl<T, const BLOCK_SIZE: usize> AddAssign<isize> for Cursor<T, BLOCK_SIZE> {
    fn add_assign(&mut self, delta: isize) {
        self.advance(delta);
    }
}

impl<T, const BLOCK_SIZE: usize> SubAssign<isize> for Cursor<T, BLOCK_SIZE> {
    fn sub_assign(&mut self, delta: isize) {
        self.advance(-delta);
    }
}

impl<T, const BLOCK_SIZE: usize> Add<isize> for Cursor<T, BLOCK_SIZE> {
    type Output = Self;

    fn add(mut self, delta: isize) -> Self {
        self += delta;
        self
    }
}

impl<T, const BLOCK_SIZE: usize> Sub<isize> for Cursor<T, BLOCK_SIZE> {
    type Output = Self;

    fn sub(mut self, delta: isize) -> Self {
        self -= delta;
        self
    }
}

impl<T, const BLOCK_SIZE: usize> Sub for Cursor<T, BLOCK_SIZE> {
    type Output = isize;

    fn sub(self, origin: Self) -> isize {
        self.distance_from(&origin)
    }
}

#[cfg(test)]
mod test {
    use crate::BlockDeque;

    #[test]
    fn increments_match_distance() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..37);
        let begin = deque.begin();

        let mut cursor = begin;
        let mut steps = 0;
        while cursor != deque.end() {
            assert_eq!(cursor - begin, steps);
            assert_eq!(begin + steps, cursor);
            assert_eq!(deque.get_at(cursor), Some(&(steps as u32)));
            cursor += 1;
            steps += 1;
        }

        assert_eq!(steps, 37);
    }

    #[test]
    fn decrements_cross_blocks() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..20);
        let mut cursor = deque.end();

        for expected in (0..20).rev() {
            cursor -= 1;
            assert_eq!(deque.get_at(cursor), Some(&expected));
        }

        assert_eq!(cursor, deque.begin());
    }

    #[test]
    fn large_jumps_in_both_directions() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..100);
        let begin = deque.begin();

        for a in 0..100isize {
            for b in 0..100isize {
                let from = begin + a;
                let to = from + (b - a);
                assert_eq!(to, begin + b);
                assert_eq!(to - from, b - a);
                assert_eq!(deque.get_at(to), Some(&(b as u32)));
            }
        }
    }

    #[test]
    fn ordering_follows_logical_order() {
        let deque = BlockDeque::<u32, 4>::from_iter(0..30);
        let begin = deque.begin();

        for a in 0..=30isize {
            for b in 0..=30isize {
                assert_eq!((begin + a).cmp(&(begin + b)), a.cmp(&b));
            }
        }
    }

    #[test]
    fn end_on_block_boundary() {
        let mut deque = BlockDeque::<u32, 4>::with_block_size();
        deque.extend(0..8);

        let end = deque.end();
        assert_eq!(end.offset, 0);
        assert_eq!(end - deque.begin(), 8);
        assert_eq!(deque.get_at(end), None);
        assert_eq!(deque.get_at(end - 1), Some(&7));
    }

    #[test]
    fn cursor_before_first_element() {
        let mut deque = BlockDeque::<u32, 4>::with_block_size();
        deque.push_front(1);

        let before = deque.begin() - 1;
        assert!(before < deque.begin());
        assert_eq!(deque.get_at(before), None);
        assert_eq!(before + 1, deque.begin());
    }
}
