//! Pooled buffer guard
//!
//! A [`PoolBuffer`] owns one outstanding block and hands it back to its
//! pool when dropped.

use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use super::manager::BlockPool;

/// A block borrowed from a [`BlockPool`]
pub struct PoolBuffer {
    payload: NonNull<u8>,
    len: usize,
    capacity: usize,
    pool: Arc<BlockPool>,
}

// The guard is the sole owner of its payload, like a Box<[u8]>.
unsafe impl Send for PoolBuffer {}
unsafe impl Sync for PoolBuffer {}

impl PoolBuffer {
    pub(crate) fn new(payload: NonNull<u8>, len: usize, capacity: usize, pool: Arc<BlockPool>) -> Self {
        Self {
            payload,
            len,
            capacity,
            pool,
        }
    }

    /// Requested length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if zero bytes were requested
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload size of the class that served this buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The pool this buffer returns to
    pub fn pool(&self) -> &Arc<BlockPool> {
        &self.pool
    }

    /// Give up the guard and return the raw payload pointer.
    ///
    /// The caller becomes responsible for passing it to
    /// [`BlockPool::free`] on the same pool.
    pub fn into_raw(self) -> NonNull<u8> {
        let payload = self.payload;
        // Drop the pool handle without running our Drop
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never used again and its own Drop is suppressed.
        unsafe { drop(std::ptr::read(&this.pool)) };
        payload
    }
}

impl Deref for PoolBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        // SAFETY: the payload is valid for `capacity >= len` bytes while we
        // hold the block.
        unsafe { std::slice::from_raw_parts(self.payload.as_ptr(), self.len) }
    }
}

impl DerefMut for PoolBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above, and `&mut self` gives exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.payload.as_ptr(), self.len) }
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        // Return block to pool
        // SAFETY: the payload came from this pool and is freed exactly once.
        let _ = unsafe { self.pool.free(self.payload) };
    }
}

impl std::fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{BlockPool, Descriptor, LogLevel};
    use std::sync::Arc;

    fn pool() -> Arc<BlockPool> {
        BlockPool::new(
            vec![Descriptor::new(1500, 2, 4, true), Descriptor::new(4096, 1, 2, true)],
            Some(Arc::new(|_: LogLevel, _: &str| {})),
            false,
        )
    }

    #[test]
    fn test_buffer_acquire_release() {
        let pool = pool();

        let mut buf = pool.acquire(1200).unwrap();
        assert_eq!(buf.len(), 1200);
        assert_eq!(buf.capacity(), 1500);
        buf.fill(0xab);
        assert!(buf.iter().all(|b| *b == 0xab));

        assert_eq!(pool.statistics()[0].outstanding, 1);

        // Drop returns to pool
        drop(buf);

        let stats = pool.statistics();
        assert_eq!(stats[0].outstanding, 0);
        assert_eq!(stats[0].deallocations, 1);
        assert_eq!(stats[0].corruption_count, 0);
        assert_eq!(pool.pooled_counts()[0], 2);
    }

    #[test]
    fn test_buffer_from_larger_class() {
        let pool = pool();
        let buf = pool.acquire(2000).unwrap();
        assert_eq!(buf.capacity(), 4096);
        assert!(Arc::ptr_eq(buf.pool(), &pool));
    }

    #[test]
    fn test_buffer_into_raw() {
        let pool = pool();
        let buf = pool.acquire(10).unwrap();
        let raw = buf.into_raw();

        assert_eq!(pool.statistics()[0].outstanding, 1);
        assert_eq!(Arc::strong_count(&pool), 1);
        unsafe { pool.free(raw).unwrap() };
        assert_eq!(pool.statistics()[0].outstanding, 0);
    }

    #[test]
    fn test_buffer_too_large() {
        let pool = pool();
        assert!(pool.acquire(5000).is_none());
    }
}
