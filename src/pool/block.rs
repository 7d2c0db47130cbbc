//! Block framing
//!
//! Every pooled block is one heap region laid out as
//!
//! ```text
//! +-----------+---------------------------+---------+
//! | Header    | payload (descriptor.size) | trailer |
//! +-----------+---------------------------+---------+
//! ^ block     ^ payload pointer handed to callers
//! ```
//!
//! The header records the owning pool, the descriptor index, the total
//! region length and a marker constant. The trailer is a second marker
//! written immediately after the payload. An overrun past the payload
//! clobbers the trailer; an underrun clobbers the header marker.
//!
//! All raw memory access lives in this module. Callers outside it only
//! ever see payload pointers.

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

const HEADER_MARKER: u64 = 0xB10C_4EAD_C0DE_F00D;
const TRAILER_MARKER: u64 = 0x7A11_B10C_E0F5_1DE5;

/// Alignment guaranteed for every payload pointer
pub const PAYLOAD_ALIGN: usize = mem::align_of::<Header>();

/// Bytes reserved in front of every payload
pub(crate) const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Bytes reserved after every payload
pub(crate) const TRAILER_SIZE: usize = mem::size_of::<u64>();

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Identity stamped into the header of every block a pool mints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OwnerId(u64);

impl OwnerId {
    /// Allocate a process-unique identity
    pub fn next() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub owner: OwnerId,
    pub index: usize,
    /// Total region length, header and trailer included
    pub len: usize,
    pub marker: u64,
}

impl Header {
    #[inline]
    pub fn marker_intact(&self) -> bool {
        self.marker == HEADER_MARKER
    }
}

/// Total region length for a payload of `size` bytes
#[inline]
pub(crate) fn block_len(size: usize) -> Option<usize> {
    size.checked_add(HEADER_SIZE)?.checked_add(TRAILER_SIZE)
}

/// A framed block, addressed by its start (not its payload)
#[derive(Debug)]
pub(crate) struct RawBlock {
    start: NonNull<u8>,
}

// A RawBlock is a uniquely owned heap region; the pool moves it between
// threads only while holding its lock.
unsafe impl Send for RawBlock {}

impl RawBlock {
    /// Allocate and frame a new block from the backing heap.
    ///
    /// Returns `None` when the heap refuses the request or the size
    /// overflows layout arithmetic.
    pub fn mint(owner: OwnerId, index: usize, size: usize) -> Option<Self> {
        let len = block_len(size)?;
        let layout = Layout::from_size_align(len, PAYLOAD_ALIGN).ok()?;

        // SAFETY: layout has non-zero size (HEADER_SIZE > 0).
        let start = NonNull::new(unsafe { alloc::alloc(layout) })?;

        let header = Header {
            owner,
            index,
            len,
            marker: HEADER_MARKER,
        };

        // SAFETY: start is valid for `len` bytes and aligned to Header.
        // The trailer sits at an arbitrary offset, hence the unaligned write.
        unsafe {
            ptr::write(start.as_ptr().cast::<Header>(), header);
            ptr::write_unaligned(
                start.as_ptr().add(HEADER_SIZE + size).cast::<u64>(),
                TRAILER_MARKER,
            );
        }

        Some(Self { start })
    }

    /// Recover the block from a payload pointer.
    ///
    /// Rejects pointers whose block start would underflow the address
    /// space or land on a null or misaligned address. Passing this check
    /// does not make the header readable; see [`RawBlock::header`].
    pub fn from_payload(payload: NonNull<u8>) -> Option<Self> {
        let addr = payload.as_ptr() as usize;
        let start_addr = addr.checked_sub(HEADER_SIZE)?;
        if start_addr == 0 || start_addr % PAYLOAD_ALIGN != 0 {
            return None;
        }
        let start = NonNull::new(payload.as_ptr().wrapping_sub(HEADER_SIZE))?;
        Some(Self { start })
    }

    /// Pointer handed to callers
    #[inline]
    pub fn payload(&self) -> NonNull<u8> {
        // SAFETY: every block is at least HEADER_SIZE bytes long.
        unsafe { NonNull::new_unchecked(self.start.as_ptr().add(HEADER_SIZE)) }
    }

    #[inline]
    pub fn addr(&self) -> usize {
        self.start.as_ptr() as usize
    }

    /// Read the header.
    ///
    /// # Safety
    /// The block start must be readable for `HEADER_SIZE` bytes.
    pub unsafe fn header(&self) -> Header {
        ptr::read(self.start.as_ptr().cast::<Header>())
    }

    /// Check the trailer marker for a payload of `size` bytes.
    ///
    /// # Safety
    /// The region must be at least `block_len(size)` bytes long.
    pub unsafe fn trailer_intact(&self, size: usize) -> bool {
        let trailer = ptr::read_unaligned(self.start.as_ptr().add(HEADER_SIZE + size).cast::<u64>());
        trailer == TRAILER_MARKER
    }

    /// Return the region to the backing heap.
    ///
    /// # Safety
    /// `len` must be the length the block was minted with.
    pub unsafe fn release(self, len: usize) {
        let layout = Layout::from_size_align_unchecked(len, PAYLOAD_ALIGN);
        alloc::dealloc(self.start.as_ptr(), layout);
    }
}
