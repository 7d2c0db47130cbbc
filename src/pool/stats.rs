//! Per-class usage statistics

use serde::Serialize;

/// Usage counters for one size class
///
/// Everything except `outstanding` only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Payload size of the class
    pub size: usize,
    /// Blocks handed to callers
    pub allocations: u64,
    /// Blocks returned by callers
    pub deallocations: u64,
    /// Returned blocks whose markers did not validate
    pub corruption_count: u64,
    /// Blocks currently held by callers
    pub outstanding: u64,
    /// High-water mark of `outstanding`
    pub max_outstanding: u64,
    /// Allocation attempts this class could not serve
    pub unfulfilled: u64,
}

impl Statistics {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    #[inline]
    pub(crate) fn record_allocation(&mut self) {
        self.allocations += 1;
        self.outstanding += 1;
        self.max_outstanding = self.max_outstanding.max(self.outstanding);
    }

    #[inline]
    pub(crate) fn record_deallocation(&mut self) {
        self.deallocations += 1;
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    #[inline]
    pub(crate) fn record_corruption(&mut self) {
        self.corruption_count += 1;
    }

    #[inline]
    pub(crate) fn record_unfulfilled(&mut self) {
        self.unfulfilled += 1;
    }
}
