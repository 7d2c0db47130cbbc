//! Error types for pool operations

/// Reasons a pool refuses to take a pointer back
///
/// Neither case mutates pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pointer cannot be the payload of any framed block
    #[error("pointer {addr:#x} does not address a pooled block")]
    InvalidPointer { addr: usize },

    /// The block was minted by a different pool instance
    #[error("block at {addr:#x} was not allocated by this pool")]
    ForeignOwner { addr: usize },
}
