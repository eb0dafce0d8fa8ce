//! Stable fingerprints for workloads and tasks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct FingerprintHasher {
    inner: DefaultHasher,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self {
            inner: DefaultHasher::new(),
        }
    }

    pub fn write<T: Hash>(&mut self, value: &T) {
        value.hash(&mut self.inner);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.inner.write_u8(value);
    }

    pub fn finish(self) -> u64 {
        self.inner.finish()
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = FingerprintHasher::new();
    hasher.write(value);
    hasher.finish()
}
