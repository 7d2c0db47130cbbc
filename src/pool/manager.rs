//! Size-class block pool
//!
//! [`BlockPool`] keeps one LIFO stack of ready blocks per size class and
//! serves each request from the smallest class that can hold it. All
//! mutable state (stacks, counters, growth decisions) sits behind a single
//! lock, so every operation is linearizable with respect to the others.
//!
//! # Routing
//! Classes are scanned in ascending size. A class with no ready block is
//! asked to grow; if growth is refused (retention cap reached and excess
//! disallowed) or the heap is exhausted, the class records an unfulfilled
//! attempt and the request falls through to the next larger class.
//!
//! # Retention
//! A returned block goes back on its stack unless the stack already holds
//! `maximum` blocks, in which case it is released to the heap. Blocks that
//! fail marker validation are always released.

use parking_lot::Mutex;
use std::ptr::NonNull;
use std::sync::Arc;

use super::block::{block_len, OwnerId, RawBlock};
use super::buffer::PoolBuffer;
use super::descriptor::{normalize, Descriptor, Profile};
use super::sink::{LogSink, PoolEvent, TracingSink};
use super::stats::Statistics;
use crate::error::PoolError;

/// What `free` did with a returned block
///
/// Every variant is a successful free from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// Pushed back onto its class for reuse
    Pooled,
    /// Released to the heap because the class is at its retention cap
    Released,
    /// Failed marker validation; counted and released to the heap
    Corrupted,
    /// Header carried an out-of-range class index; released without
    /// touching any class state
    BadDescriptor,
}

/// Result of asking a class to mint one more block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Growth {
    Minted,
    Refused,
    HeapExhausted,
}

struct SizeClass {
    ready: Vec<RawBlock>,
    stats: Statistics,
}

struct PoolState {
    classes: Vec<SizeClass>,
}

/// Fixed-size-class memory pool
///
/// Shared between consumers as an `Arc<BlockPool>`. Blocks handed out by
/// one pool can only be returned to that same pool.
pub struct BlockPool {
    owner: OwnerId,
    profile: Profile,
    sink: Arc<dyn LogSink>,
    log_statistics: bool,
    state: Mutex<PoolState>,
}

impl BlockPool {
    /// Build a pool for `profile`.
    ///
    /// The profile is sorted by size and any `maximum < minimum` is raised
    /// to `minimum`. Each class then gets exactly `minimum` growth attempts;
    /// a class that cannot be filled completely is not an error.
    pub fn new(
        mut profile: Profile,
        sink: Option<Arc<dyn LogSink>>,
        log_statistics: bool,
    ) -> Arc<Self> {
        let sink = sink.unwrap_or_else(|| Arc::new(TracingSink));
        sink.event(&PoolEvent::Initializing);

        for coercion in normalize(&mut profile) {
            sink.event(&PoolEvent::MaximumCoerced {
                size: coercion.size,
                requested: coercion.requested_maximum,
                maximum: coercion.maximum,
            });
        }

        let classes = profile
            .iter()
            .map(|descriptor| SizeClass {
                ready: Vec::with_capacity(descriptor.minimum),
                stats: Statistics::new(descriptor.size),
            })
            .collect();

        let pool = Self {
            owner: OwnerId::next(),
            profile,
            sink,
            log_statistics,
            state: Mutex::new(PoolState { classes }),
        };

        {
            let mut state = pool.state.lock();
            for (index, descriptor) in pool.profile.iter().enumerate() {
                for _ in 0..descriptor.minimum {
                    if pool.grow(&mut state, index) == Growth::HeapExhausted {
                        pool.sink.event(&PoolEvent::HeapExhausted {
                            size: descriptor.size,
                        });
                    }
                }
                pool.sink.event(&PoolEvent::ClassReady {
                    index,
                    size: descriptor.size,
                    count: state.classes[index].ready.len(),
                });
            }
        }

        Arc::new(pool)
    }

    /// Build a pool with the default sink and a teardown summary.
    pub fn with_profile(profile: Profile) -> Arc<Self> {
        Self::new(profile, None, true)
    }

    /// The normalized descriptor table
    pub fn profile(&self) -> &[Descriptor] {
        &self.profile
    }

    /// Allocate a payload of at least `size` bytes.
    ///
    /// Returns `None` when no class is large enough or every large-enough
    /// class is exhausted. The payload is aligned to
    /// [`PAYLOAD_ALIGN`](super::PAYLOAD_ALIGN).
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.allocate_block(size).map(|(payload, _)| payload)
    }

    /// Allocate and wrap the payload in a guard that frees it on drop.
    pub fn acquire(self: &Arc<Self>, size: usize) -> Option<PoolBuffer> {
        let (payload, capacity) = self.allocate_block(size)?;
        Some(PoolBuffer::new(payload, size, capacity, Arc::clone(self)))
    }

    /// Route a request; returns the payload and the serving class size.
    pub(crate) fn allocate_block(&self, size: usize) -> Option<(NonNull<u8>, usize)> {
        let mut exhausted: Vec<usize> = Vec::new();

        let served = {
            let mut state = self.state.lock();
            self.route(&mut state, size, &mut exhausted)
        };

        for size in exhausted {
            self.sink.event(&PoolEvent::HeapExhausted { size });
        }
        served
    }

    fn route(
        &self,
        state: &mut PoolState,
        size: usize,
        exhausted: &mut Vec<usize>,
    ) -> Option<(NonNull<u8>, usize)> {
        for (index, descriptor) in self.profile.iter().enumerate() {
            if descriptor.size < size {
                continue;
            }

            if state.classes[index].ready.is_empty() {
                match self.grow(state, index) {
                    Growth::Minted => {}
                    growth => {
                        if growth == Growth::HeapExhausted {
                            exhausted.push(descriptor.size);
                        }
                        state.classes[index].stats.record_unfulfilled();
                        continue;
                    }
                }
            }

            let class = &mut state.classes[index];
            if let Some(block) = class.ready.pop() {
                class.stats.record_allocation();
                return Some((block.payload(), descriptor.size));
            }
        }
        None
    }

    /// Mint one block for class `index` if the growth policy allows it.
    ///
    /// Must be called with the state lock held.
    fn grow(&self, state: &mut PoolState, index: usize) -> Growth {
        let descriptor = &self.profile[index];
        let class = &mut state.classes[index];

        if !descriptor.is_unbounded() && !descriptor.excess_allowed {
            let held = class.ready.len() as u64 + class.stats.outstanding;
            if held >= descriptor.maximum as u64 {
                return Growth::Refused;
            }
        }

        match RawBlock::mint(self.owner, index, descriptor.size) {
            Some(block) => {
                class.ready.push(block);
                Growth::Minted
            }
            None => Growth::HeapExhausted,
        }
    }

    /// Return a payload previously obtained from [`BlockPool::allocate`].
    ///
    /// Pointers from another pool are detected and rejected. A block whose
    /// markers were overwritten is counted as corrupt and released to the
    /// heap, and the call still succeeds.
    ///
    /// # Safety
    /// `payload` must have been returned by `allocate` on some `BlockPool`
    /// that is still alive, and must not have been freed since. The header
    /// is read before ownership is known, so arbitrary pointers are not
    /// sound even though most of them are rejected.
    pub unsafe fn free(&self, payload: NonNull<u8>) -> Result<FreeOutcome, PoolError> {
        let addr = payload.as_ptr() as usize;

        let Some(block) = RawBlock::from_payload(payload) else {
            self.sink.event(&PoolEvent::InvalidPointer { addr });
            return Err(PoolError::InvalidPointer { addr });
        };

        let outcome = {
            let mut state = self.state.lock();
            self.reclaim(&mut state, block)
        };

        match outcome {
            Err(err) => {
                self.sink.event(&PoolEvent::ForeignOwner { addr });
                Err(err)
            }
            Ok((FreeOutcome::BadDescriptor, index)) => {
                self.sink.event(&PoolEvent::BadDescriptor { addr, index });
                Ok(FreeOutcome::BadDescriptor)
            }
            Ok((outcome, _)) => Ok(outcome),
        }
    }

    /// Validate and re-pool or release a block. Lock must be held.
    ///
    /// Returns the outcome with the class index the header recorded.
    unsafe fn reclaim(
        &self,
        state: &mut PoolState,
        block: RawBlock,
    ) -> Result<(FreeOutcome, usize), PoolError> {
        let header = block.header();
        if header.owner != self.owner {
            return Err(PoolError::ForeignOwner { addr: block.addr() });
        }

        let Some(descriptor) = self.profile.get(header.index) else {
            // The recorded length is only trusted when it matches a class
            // this pool could have minted; otherwise the region is leaked.
            let known = self
                .profile
                .iter()
                .any(|d| block_len(d.size) == Some(header.len));
            if known {
                block.release(header.len);
            }
            return Ok((FreeOutcome::BadDescriptor, header.index));
        };

        let corrupt = !header.marker_intact() || !block.trailer_intact(descriptor.size);
        let len = block_len(descriptor.size).unwrap_or(header.len);

        let class = &mut state.classes[header.index];
        class.stats.record_deallocation();

        if corrupt {
            class.stats.record_corruption();
            block.release(len);
            return Ok((FreeOutcome::Corrupted, header.index));
        }

        let outcome = if descriptor.is_unbounded() || class.ready.len() < descriptor.maximum {
            class.ready.push(block);
            FreeOutcome::Pooled
        } else {
            block.release(len);
            FreeOutcome::Released
        };
        Ok((outcome, header.index))
    }

    /// Snapshot of every class's counters, in profile order
    pub fn statistics(&self) -> Vec<Statistics> {
        let state = self.state.lock();
        state.classes.iter().map(|class| class.stats).collect()
    }

    /// Number of ready blocks per class, in profile order
    pub fn pooled_counts(&self) -> Vec<usize> {
        let state = self.state.lock();
        state.classes.iter().map(|class| class.ready.len()).collect()
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        if self.log_statistics {
            self.sink.event(&PoolEvent::UsageSummary);
        }

        for (descriptor, class) in self.profile.iter().zip(state.classes.iter_mut()) {
            if self.log_statistics {
                self.sink.event(&PoolEvent::ClassUsage(class.stats));
            }

            if let Some(len) = block_len(descriptor.size) {
                for block in class.ready.drain(..) {
                    // SAFETY: every ready block was minted with this class's length.
                    unsafe { block.release(len) };
                }
            }
        }
    }
}

impl std::fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPool")
            .field("owner", &self.owner)
            .field("profile", &self.profile)
            .field("log_statistics", &self.log_statistics)
            .finish()
    }
}
