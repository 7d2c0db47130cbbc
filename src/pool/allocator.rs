//! Typed allocator over a shared pool
//!
//! [`PoolAllocator<T>`] turns element counts into byte requests against a
//! [`BlockPool`]. Two allocators compare equal when they share a pool, so
//! memory from one can be returned through the other regardless of element
//! type.
//!
//! It also implements [`allocator_api2::alloc::Allocator`], so collections
//! from `allocator_api2` (and `hashbrown`) can draw their storage from the
//! pool. That interface is byte-oriented and ignores `T`.

use allocator_api2::alloc::{AllocError, Allocator};
use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

use super::block::PAYLOAD_ALIGN;
use super::manager::BlockPool;

pub struct PoolAllocator<T> {
    pool: Arc<BlockPool>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolAllocator<T> {
    pub fn new(pool: Arc<BlockPool>) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Same pool, different element type
    pub fn rebind<U>(&self) -> PoolAllocator<U> {
        PoolAllocator::new(Arc::clone(&self.pool))
    }

    pub fn pool(&self) -> &Arc<BlockPool> {
        &self.pool
    }

    /// Allocate room for `n` values of `T`.
    ///
    /// Zero-byte requests never reach the pool and yield a dangling,
    /// well-aligned pointer. Types aligned beyond the payload alignment
    /// cannot be served.
    ///
    /// # Panics
    /// Panics if `n * size_of::<T>()` overflows.
    pub fn allocate(&self, n: usize) -> Option<NonNull<T>> {
        let Some(bytes) = mem::size_of::<T>().checked_mul(n) else {
            panic!(
                "capacity overflow: {} elements of {} bytes",
                n,
                mem::size_of::<T>()
            );
        };

        if bytes == 0 {
            return Some(NonNull::dangling());
        }
        if mem::align_of::<T>() > PAYLOAD_ALIGN {
            return None;
        }

        self.pool.allocate(bytes).map(NonNull::cast)
    }

    /// Return memory obtained from [`PoolAllocator::allocate`].
    ///
    /// A null pointer is ignored.
    ///
    /// # Safety
    /// `ptr` must come from `allocate(n)` on an allocator equal to this one
    /// and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: *mut T, n: usize) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        if mem::size_of::<T>().saturating_mul(n) == 0 {
            return;
        }
        let _ = self.pool.free(ptr.cast());
    }
}

// SAFETY: blocks stay valid while any clone holds the pool alive, and
// every clone shares one pool, so memory may be freed through any of them.
unsafe impl<T> Allocator for PoolAllocator<T> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            // SAFETY: alignments are never zero
            let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        if layout.align() > PAYLOAD_ALIGN {
            return Err(AllocError);
        }

        let (payload, capacity) = self.pool.allocate_block(layout.size()).ok_or(AllocError)?;
        Ok(NonNull::slice_from_raw_parts(payload, capacity))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        let _ = self.pool.free(ptr);
    }
}

impl<T> Clone for PoolAllocator<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.pool))
    }
}

impl<T, U> PartialEq<PoolAllocator<U>> for PoolAllocator<T> {
    fn eq(&self, other: &PoolAllocator<U>) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }
}

impl<T> Eq for PoolAllocator<T> {}

impl<T> std::fmt::Debug for PoolAllocator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("element", &std::any::type_name::<T>())
            .field("pool", &Arc::as_ptr(&self.pool))
            .finish()
    }
}
