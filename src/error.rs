use core::fmt::{self, Display, Formatter};

/// Returned by [`BlockDeque::at`](crate::BlockDeque::at) when the index is not below the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutOfRange {
    /// The rejected index.
    pub index: usize,
    /// Length of the deque at the time of the call.
    pub len: usize,
}

impl Display for OutOfRange {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "index out of range (index={}, len={})", self.index, self.len)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OutOfRange {}
