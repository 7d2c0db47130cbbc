//! Leveled diagnostics sink
//!
//! The pool reports through [`LogSink`] only. Every diagnostic is a
//! [`PoolEvent`]; sinks that only care about text implement
//! [`LogSink::log`] and receive the rendered message. [`TracingSink`] is
//! the default and emits each event with its fields attached.

use std::fmt;

use tracing::{error, info, warn};

use super::stats::Statistics;

/// Severity of a pool diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// A diagnostic raised by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// Construction started
    Initializing,
    /// A descriptor's `maximum` was below its `minimum` and was raised
    MaximumCoerced {
        size: usize,
        requested: usize,
        maximum: usize,
    },
    /// Preallocation for one class finished
    ClassReady { index: usize, size: usize, count: usize },
    /// The heap refused a block for this class size
    HeapExhausted { size: usize },
    /// A freed pointer could not be the payload of any block
    InvalidPointer { addr: usize },
    /// A freed block belongs to another pool
    ForeignOwner { addr: usize },
    /// A freed block's header names a class this pool does not have
    BadDescriptor { addr: usize, index: usize },
    /// Teardown summary banner
    UsageSummary,
    /// Teardown summary line for one class
    ClassUsage(Statistics),
}

impl PoolEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            Self::Initializing
            | Self::ClassReady { .. }
            | Self::UsageSummary
            | Self::ClassUsage(_) => LogLevel::Info,
            Self::MaximumCoerced { .. } => LogLevel::Warning,
            Self::HeapExhausted { .. }
            | Self::InvalidPointer { .. }
            | Self::ForeignOwner { .. }
            | Self::BadDescriptor { .. } => LogLevel::Error,
        }
    }
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing memory profiles"),
            Self::MaximumCoerced {
                size,
                requested,
                maximum,
            } => write!(
                f,
                "Descriptor size {size} has an invalid maximum value {requested}; using {maximum}"
            ),
            Self::ClassReady { size, count, .. } => {
                write!(f, "Descriptor size {size}, count {count}")
            }
            Self::HeapExhausted { size } => {
                write!(f, "Failed to allocate heap memory for block size {size}")
            }
            Self::InvalidPointer { addr } => {
                write!(f, "The pointer {addr:#x} does not appear to be valid")
            }
            Self::ForeignOwner { addr } => {
                write!(f, "Attempt to free memory at {addr:#x} not allocated by this pool")
            }
            Self::BadDescriptor { addr, index } => write!(
                f,
                "Free of {addr:#x} carries a bad descriptor index {index}; block discarded"
            ),
            Self::UsageSummary => write!(f, "Memory pool usage statistics"),
            Self::ClassUsage(stats) => write!(
                f,
                "  Block size {}: allocations={} deallocations={} corrupted={} \
                 max_outstanding={} outstanding={} unfulfilled={}",
                stats.size,
                stats.allocations,
                stats.deallocations,
                stats.corruption_count,
                stats.max_outstanding,
                stats.outstanding,
                stats.unfulfilled
            ),
        }
    }
}

/// Receiver for pool diagnostics
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    /// Receive a structured event. Defaults to logging its rendered text.
    fn event(&self, event: &PoolEvent) {
        self.log(event.level(), &event.to_string());
    }
}

impl<F> LogSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn log(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// Sink that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!(target: "blockpool::pool", "{}", message),
            LogLevel::Warning => warn!(target: "blockpool::pool", "{}", message),
            LogLevel::Error => error!(target: "blockpool::pool", "{}", message),
        }
    }

    fn event(&self, event: &PoolEvent) {
        match *event {
            PoolEvent::Initializing | PoolEvent::UsageSummary => {
                info!(target: "blockpool::pool", "{}", event)
            }
            PoolEvent::MaximumCoerced {
                size,
                requested,
                maximum,
            } => warn!(target: "blockpool::pool", size, requested, maximum, "{}", event),
            PoolEvent::ClassReady { index, size, count } => {
                info!(target: "blockpool::pool", index, size, count, "{}", event)
            }
            PoolEvent::HeapExhausted { size } => {
                error!(target: "blockpool::pool", size, "{}", event)
            }
            PoolEvent::InvalidPointer { addr } | PoolEvent::ForeignOwner { addr } => {
                error!(target: "blockpool::pool", addr = format_args!("{addr:#x}"), "{}", event)
            }
            PoolEvent::BadDescriptor { addr, index } => error!(
                target: "blockpool::pool",
                addr = format_args!("{addr:#x}"),
                index,
                "{}",
                event
            ),
            PoolEvent::ClassUsage(stats) => info!(
                target: "blockpool::pool",
                size = stats.size,
                allocations = stats.allocations,
                deallocations = stats.deallocations,
                corrupted = stats.corruption_count,
                max_outstanding = stats.max_outstanding,
                outstanding = stats.outstanding,
                unfulfilled = stats.unfulfilled,
                "Block size usage"
            ),
        }
    }
}
