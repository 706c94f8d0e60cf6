//! A growable, 1-indexed array of `Pod` records: the in-process analog of
//! a single mmap pool from `spec.md` §4.1.
//!
//! Slot 0 is never allocated, so a `0` index means "no entry" throughout
//! `entities.rs` without needing a separate `Option` wrapper. The
//! generator (`gen.rs`) builds pools purely in memory; only the finished
//! image gets mapped for reads, which is what sidesteps the
//! remap-invalidates-pointers failure mode `spec.md` §9 calls out.

use bytemuck::{Pod, Zeroable};

#[derive(Debug)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T: Pod + Zeroable> Pool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { items: vec![T::zeroed()] }
    }

    /// Append a record, returning its 1-based index.
    pub fn push(&mut self, item: T) -> u32 {
        let idx = u32::try_from(self.items.len()).expect("pool index overflowed u32");
        self.items.push(item);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        if index == 0 { None } else { self.items.get(index as usize) }
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        if index == 0 { None } else { self.items.get_mut(index as usize) }
    }

    #[must_use]
    pub fn index_mut(&mut self, index: u32) -> &mut T {
        self.get_mut(index).expect("pool index out of bounds")
    }

    #[must_use]
    pub fn index(&self, index: u32) -> &T {
        self.get(index).expect("pool index out of bounds")
    }

    /// Number of allocated records, not counting the reserved slot 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw backing slice, slot 0 included, for writing the on-disk image.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Pod + Zeroable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
