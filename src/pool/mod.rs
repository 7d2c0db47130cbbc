//! Memory pool management
//!
//! Pre-allocated, size-classed blocks with overrun detection on free.

mod allocator;
mod block;
mod buffer;
mod descriptor;
mod manager;
mod sink;
mod stats;

pub use allocator::PoolAllocator;
pub use block::PAYLOAD_ALIGN;
pub use buffer::PoolBuffer;
pub use descriptor::{Descriptor, Profile};
pub use manager::{BlockPool, FreeOutcome};
pub use sink::{LogLevel, LogSink, PoolEvent, TracingSink};
pub use stats::Statistics;
