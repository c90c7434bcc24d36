//! Specialized collection types

use std::ops::{Index, IndexMut};

/// Free list for object pooling
///
/// Slots are addressed by stable indices. Removing an item pushes its index
/// onto a free stack so the next insert reuses the slot instead of growing
/// the backing vector; once warmed up, insert/remove never allocate.
#[derive(Debug)]
pub struct FreeList<T> {
    items: Vec<Option<T>>,
    free_indices: Vec<usize>,
}

impl<T> FreeList<T> {
    /// Create a new free list
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Insert an item and return its index
    pub fn insert(&mut self, item: T) -> usize {
        if let Some(index) = self.free_indices.pop() {
            self.items[index] = Some(item);
            index
        } else {
            let index = self.items.len();
            self.items.push(Some(item));
            log::debug!("FreeList grew to {} slots", self.items.len());
            index
        }
    }

    /// Remove an item by index
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;
        self.free_indices.push(index);
        Some(item)
    }

    /// Get an item by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)?.as_ref()
    }

    /// Get a mutable reference to an item by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.as_mut()
    }

    /// Number of slots ever allocated (the high-water mark)
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Number of slots currently waiting on the free stack
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.items.len() - self.free_indices.len()
    }

    /// Whether no items are live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for FreeList<T> {
    type Output = T;

    /// Panics if the slot is vacant, like indexing a `Vec` out of bounds
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!("FreeList: slot {index} is vacant"),
        }
    }
}

impl<T> IndexMut<usize> for FreeList<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Some(item) => item,
            None => panic!("FreeList: slot {index} is vacant"),
        }
    }
}
