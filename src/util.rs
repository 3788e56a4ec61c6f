use core::mem;

macro_rules! assume_assert {
    ($cond:expr) => {{
        let cond = $cond;
        #[cfg(debug_assertions)]
        assert!(cond);
        $crate::util::assume(cond);
    }};
}

#[inline(always)]
pub unsafe fn assume(condition: bool) {
    if !condition {
        core::hint::unreachable_unchecked();
    }
}

pub(crate) use assume_assert;

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}

pub(crate) use trace;

pub trait UnwrapExt<T> {
    unsafe fn unwrap_assume(self) -> T;
}

impl<T> UnwrapExt<T> for Option<T> {
    unsafe fn unwrap_assume(self) -> T {
        assume_assert!(self.is_some());
        self.unwrap_unchecked()
    }
}

pub const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

#[cold]
#[track_caller]
pub fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

/// Generates the `Iterator` family of impls for a wrapper around [`RawIter`](crate::iter::RawIter).
///
/// `map` turns the raw element pointer into the wrapper's item.
macro_rules! forward_raw_iter {
    (
        $name:ident<$lt:lifetime, $t:ident, const $b:ident: usize>;
        item = $item:ty;
        map = $map:expr;
    ) => {
        impl<$lt, $t, const $b: usize> ::core::iter::Iterator for $name<$lt, $t, $b> {
            type Item = $item;

            fn next(&mut self) -> Option<$item> {
                self.nth(0)
            }

            fn nth(&mut self, n: usize) -> Option<$item> {
                let ptr = self.raw.nth(n)?;
                Some(($map)(ptr))
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.raw.size_hint()
            }
        }

        impl<$lt, $t, const $b: usize> ::core::iter::DoubleEndedIterator for $name<$lt, $t, $b> {
            fn next_back(&mut self) -> Option<$item> {
                self.nth_back(0)
            }

            fn nth_back(&mut self, n: usize) -> Option<$item> {
                let ptr = self.raw.nth_back(n)?;
                Some(($map)(ptr))
            }
        }

        impl<$lt, $t, const $b: usize> ::core::iter::FusedIterator for $name<$lt, $t, $b> {}

        impl<$lt, $t, const $b: usize> ::core::iter::ExactSizeIterator for $name<$lt, $t, $b> {}
    };
}

pub(crate) use forward_raw_iter;
