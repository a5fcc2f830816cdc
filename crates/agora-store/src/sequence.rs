use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{StoreError, StoreResult};

/// Monotonic identifier allocator for one entity kind.
///
/// Allocation is a single atomic read-modify-write: the value handed out is
/// the value the increment replaced, so no two callers can ever observe the
/// same identifier. The sequence starts at zero and refuses to wrap.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A sequence whose first allocation returns `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next identifier.
    pub fn next(&self) -> StoreResult<u64> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(1)
            })
            .map_err(|_| StoreError::Internal("identifier space exhausted".into()))
    }

    /// The identifier the next call to [`next`](Self::next) would return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}
