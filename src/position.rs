//! Mapping between logical element offsets and `(block, offset)` pairs.

/// A physical location in the block map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub block: usize,
    pub offset: usize,
}

/// Locates the element `logical` places after the element at absolute position `start`.
///
/// Negative offsets floor towards the preceding block, so `-1` names the slot right before `start`
/// even when `start` sits at the beginning of a block. The caller keeps the result non-negative.
#[inline]
pub(crate) fn locate<const BLOCK_SIZE: usize>(start: usize, logical: isize) -> Position {
    let absolute = start as isize + logical;
    debug_assert!(absolute >= 0, "position {absolute} lies before the block map");

    Position {
        block: absolute.div_euclid(BLOCK_SIZE as isize) as usize,
        offset: absolute.rem_euclid(BLOCK_SIZE as isize) as usize,
    }
}

/// Moves `(block, offset)` by `delta` elements without going through `start`.
///
/// Blocks are signed so a position one before the start of the map stays representable.
#[inline]
pub(crate) fn advance<const BLOCK_SIZE: usize>(
    block: isize,
    offset: usize,
    delta: isize,
) -> (isize, usize) {
    let target = offset as isize + delta;
    (
        block + target.div_euclid(BLOCK_SIZE as isize),
        target.rem_euclid(BLOCK_SIZE as isize) as usize,
    )
}

/// Number of elements from `(b_block, b_offset)` to `(a_block, a_offset)`.
#[inline]
pub(crate) fn distance<const BLOCK_SIZE: usize>(
    (a_block, a_offset): (isize, usize),
    (b_block, b_offset): (isize, usize),
) -> isize {
    (a_block - b_block) * BLOCK_SIZE as isize - b_offset as isize + a_offset as isize
}

#[cfg(test)]
mod test {
    use super::{advance, distance, locate, Position};

    #[test]
    fn locate_within_first_block() {
        assert_eq!(locate::<64>(0, 0), Position { block: 0, offset: 0 });
        assert_eq!(locate::<64>(10, 5), Position { block: 0, offset: 15 });
    }

    #[test]
    fn locate_crosses_blocks() {
        assert_eq!(locate::<64>(256, 0), Position { block: 4, offset: 0 });
        assert_eq!(locate::<64>(256, 64), Position { block: 5, offset: 0 });
        assert_eq!(locate::<64>(256, 70), Position { block: 5, offset: 6 });
    }

    #[test]
    fn locate_negative_floors() {
        assert_eq!(locate::<64>(256, -1), Position { block: 3, offset: 63 });
        assert_eq!(locate::<64>(257, -1), Position { block: 4, offset: 0 });
        assert_eq!(locate::<4>(8, -5), Position { block: 0, offset: 3 });
    }

    #[test]
    fn advance_forward_and_back() {
        assert_eq!(advance::<4>(2, 1, 2), (2, 3));
        assert_eq!(advance::<4>(2, 3, 1), (3, 0));
        assert_eq!(advance::<4>(2, 0, -1), (1, 3));
        assert_eq!(advance::<4>(2, 1, -9), (0, 0));
        assert_eq!(advance::<4>(0, 0, -1), (-1, 3));
        assert_eq!(advance::<4>(1, 2, 17), (5, 3));
    }

    #[test]
    fn advance_matches_locate() {
        for start in 0..20usize {
            for delta in -(start as isize)..20 {
                let origin = locate::<4>(start, 0);
                let expected = locate::<4>(start, delta);
                let (block, offset) = advance::<4>(origin.block as isize, origin.offset, delta);
                assert_eq!((block as usize, offset), (expected.block, expected.offset));
            }
        }
    }

    #[test]
    fn distance_inverts_advance() {
        for delta in -30isize..30 {
            let (block, offset) = advance::<8>(10, 3, delta);
            assert_eq!(distance::<8>((block, offset), (10, 3)), delta);
        }
    }
}
