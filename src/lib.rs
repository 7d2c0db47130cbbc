//! BlockPool - fixed-size-class memory pool
//!
//! Pre-reserves and recycles blocks of configured sizes so repetitive
//! allocation patterns (packet buffers and the like) avoid heap churn.
//! Every block is framed with header and trailer markers that are checked
//! when it comes back, so buffer overruns are caught and the damaged block
//! is never handed out again.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod util;
pub mod workload;

pub use config::Config;
pub use error::PoolError;
pub use pool::{BlockPool, Descriptor, FreeOutcome, PoolAllocator, PoolBuffer, Profile, Statistics};

/// Library version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
