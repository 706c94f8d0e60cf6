//! Power-of-two, case-insensitive, chained-collision hash table over
//! package/group names (`spec.md` §4.1), grounded in
//! `apt-pkg/pkgcachegen.cc`'s `NewGroup`/`NewPackage`: a name hashes to a
//! bucket, and the chain inside the bucket is kept sorted by
//! `strcasecmp` so lookups can short-circuit early.

use ahash::AHasher;
use std::hash::Hasher;

/// A fixed-size table of hash-chain head indices. `0` means empty, matching
/// the pool convention that slot 0 is never allocated.
#[derive(Debug)]
pub struct HashTable {
    buckets: Vec<u32>,
}

impl HashTable {
    /// `size` is rounded up to the next power of two.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.next_power_of_two().max(16);
        Self { buckets: vec![0; size] }
    }

    /// Bucket index for a case-folded name.
    #[must_use]
    pub fn bucket(&self, name: &str) -> usize {
        let mut hasher = AHasher::default();
        for b in name.bytes() {
            hasher.write_u8(b.to_ascii_lowercase());
        }
        (hasher.finish() as usize) & (self.buckets.len() - 1)
    }

    #[must_use]
    pub fn head(&self, bucket: usize) -> u32 {
        self.buckets[bucket]
    }

    pub fn set_head(&mut self, bucket: usize, index: u32) {
        self.buckets[bucket] = index;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Raw bucket-head array, for writing the on-disk image.
    #[must_use]
    pub fn buckets(&self) -> &[u32] {
        &self.buckets
    }

    /// Rebuild a table from its raw bucket-head array, read back out of a
    /// mapped image.
    #[must_use]
    pub fn from_buckets(buckets: &[u32]) -> Self {
        Self { buckets: buckets.to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rounds_up_to_power_of_two() {
        assert_eq!(HashTable::new(100).len(), 128);
        assert_eq!(HashTable::new(16).len(), 16);
    }

    #[test]
    fn bucket_is_case_insensitive() {
        let table = HashTable::new(64);
        assert_eq!(table.bucket("Libc6"), table.bucket("libc6"));
    }
}
