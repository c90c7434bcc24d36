//! Batching statistics

/// Pool occupancy for one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Batch slots ever allocated
    pub batch_slots: usize,
    /// Batch slots currently free
    pub free_batches: usize,
    /// Element slots ever allocated
    pub element_slots: usize,
    /// Element slots currently free
    pub free_elements: usize,
}

impl PoolStats {
    /// Whether every allocated slot is back in its pool
    pub fn is_fully_recycled(&self) -> bool {
        self.batch_slots == self.free_batches && self.element_slots == self.free_elements
    }
}

/// Statistics for batch rendering performance monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Batches across all stages
    pub batch_count: usize,

    /// Batch elements across all stages
    pub element_count: usize,

    /// Commands waiting in the unbatched generic list
    pub generic_commands: usize,

    /// Summed pool occupancy of every stage
    pub pools: PoolStats,
}

impl BatchStats {
    /// Calculate average elements per batch
    pub fn avg_elements_per_batch(&self) -> f32 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.element_count as f32 / self.batch_count as f32
        }
    }
}

impl std::ops::AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.batch_slots += other.batch_slots;
        self.free_batches += other.free_batches;
        self.element_slots += other.element_slots;
        self.free_elements += other.free_elements;
    }
}
