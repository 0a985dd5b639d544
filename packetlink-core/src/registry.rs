//! Registry of module ids accepted on the wire
//!
//! Module ids are routing tags for application subsystems. Which ids are
//! valid is a deployment decision, so the registry is an explicit set rather
//! than a numeric range.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Set of valid module ids (one bit per possible `u8` id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct ModuleRegistry {
    bits: [u64; 4],
}

impl ModuleRegistry {
    /// Registry that accepts nothing
    pub const fn empty() -> Self {
        Self { bits: [0; 4] }
    }

    /// Registry accepting exactly `ids`
    pub fn new(ids: &[u8]) -> Self {
        let mut registry = Self::empty();
        for &id in ids {
            registry.insert(id);
        }
        registry
    }

    /// Registry accepting every id in `ids`
    pub fn from_range(ids: core::ops::RangeInclusive<u8>) -> Self {
        let mut registry = Self::empty();
        for id in ids {
            registry.insert(id);
        }
        registry
    }

    /// Accept `id`
    pub fn insert(&mut self, id: u8) {
        self.bits[usize::from(id >> 6)] |= 1 << (id & 63);
    }

    /// Stop accepting `id`
    pub fn remove(&mut self, id: u8) {
        self.bits[usize::from(id >> 6)] &= !(1 << (id & 63));
    }

    /// Check whether `id` is a valid module
    pub const fn contains(&self, id: u8) -> bool {
        (self.bits[(id >> 6) as usize] >> (id & 63)) & 1 == 1
    }

    /// Number of accepted ids
    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// True when no id is accepted
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }

    /// Accepted ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&id| self.contains(id))
    }
}

impl Default for ModuleRegistry {
    /// Modules 0, 1 and 5
    fn default() -> Self {
        Self::new(&[0, 1, 5])
    }
}

impl From<Vec<u8>> for ModuleRegistry {
    fn from(ids: Vec<u8>) -> Self {
        Self::new(&ids)
    }
}

impl From<ModuleRegistry> for Vec<u8> {
    fn from(registry: ModuleRegistry) -> Self {
        registry.iter().collect()
    }
}
