//! Size-class descriptors
//!
//! A [`Profile`] is the ordered table of size classes a pool serves. The
//! table is normalized once when the pool is built and never changes after.

use serde::{Deserialize, Serialize};

/// A single size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Payload capacity of blocks in this class
    pub size: usize,
    /// Blocks minted eagerly at construction
    pub minimum: usize,
    /// Retained-blocks cap (0 = unbounded)
    #[serde(default)]
    pub maximum: usize,
    /// Whether requests past `maximum` may be served by throwaway heap blocks
    #[serde(default = "default_excess_allowed")]
    pub excess_allowed: bool,
}

fn default_excess_allowed() -> bool {
    true
}

impl Descriptor {
    /// Create a new descriptor
    pub const fn new(size: usize, minimum: usize, maximum: usize, excess_allowed: bool) -> Self {
        Self {
            size,
            minimum,
            maximum,
            excess_allowed,
        }
    }

    /// Whether this class has no retention cap
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.maximum == 0
    }
}

/// Ordered set of size classes
pub type Profile = Vec<Descriptor>;

/// A descriptor whose `maximum` was raised to its `minimum`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Coercion {
    pub size: usize,
    pub requested_maximum: usize,
    pub maximum: usize,
}

/// Sort ascending by size and repair `maximum < minimum`.
///
/// Returns the list of repaired descriptors so the caller can report them.
pub(crate) fn normalize(profile: &mut Profile) -> Vec<Coercion> {
    // Stable so equal sizes keep their configured order
    profile.sort_by_key(|descriptor| descriptor.size);

    let mut coerced = Vec::new();
    for descriptor in profile.iter_mut() {
        if descriptor.maximum != 0 && descriptor.maximum < descriptor.minimum {
            coerced.push(Coercion {
                size: descriptor.size,
                requested_maximum: descriptor.maximum,
                maximum: descriptor.minimum,
            });
            descriptor.maximum = descriptor.minimum;
        }
    }
    coerced
}
