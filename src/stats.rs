//! Heap usage statistics

use crate::allocator::block_set;
use crate::allocator::BlockSet;
use serde::{Deserialize, Serialize};

/// Point-in-time usage summary of one allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapStats {
    pub policy: String,
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
    pub block_count: usize,
    pub gap_count: usize,
    pub largest_gap: usize,
    /// `1 - largest_gap / free`; 0.0 when free space is one gap or none
    pub fragmentation: f64,
}

impl HeapStats {
    pub fn collect(policy: &str, blocks: &BlockSet) -> Self {
        let gaps = blocks.gaps();
        let largest_gap = block_set::largest(&gaps);

        HeapStats {
            policy: policy.to_string(),
            capacity: blocks.capacity(),
            used: blocks.used(),
            free: blocks.free(),
            block_count: blocks.len(),
            gap_count: gaps.len(),
            largest_gap,
            fragmentation: fragmentation(blocks.free(), largest_gap),
        }
    }

    /// Share of capacity covered by blocks
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64
    }
}

/// External fragmentation of `free` cells whose largest run is `largest_gap`
pub(crate) fn fragmentation(free: usize, largest_gap: usize) -> f64 {
    if free == 0 {
        return 0.0; // No free space = no fragmentation
    }
    1.0 - largest_gap as f64 / free as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HeapId;

    #[test]
    fn test_fragmentation_bounds() {
        assert_eq!(fragmentation(0, 0), 0.0);
        assert_eq!(fragmentation(100, 100), 0.0);
        assert!((fragmentation(100, 25) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collect() {
        let mut blocks = BlockSet::new(HeapId::fresh(), 100);
        blocks.insert(10, 10).unwrap();
        blocks.insert(50, 30).unwrap();

        let stats = HeapStats::collect("first-fit", &blocks);
        assert_eq!(stats.used, 40);
        assert_eq!(stats.free, 60);
        assert_eq!(stats.block_count, 2);
        assert_eq!(stats.gap_count, 3); // [0,10) [20,50) [80,100)
        assert_eq!(stats.largest_gap, 30);
        assert!((stats.fragmentation - 0.5).abs() < 1e-9);
        assert!((stats.utilization() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_largest_gap_agrees_with_block_set() {
        let mut blocks = BlockSet::new(HeapId::fresh(), 64);
        assert_eq!(HeapStats::collect("best-fit", &blocks).largest_gap, 64);

        blocks.insert(0, 64).unwrap();
        let full = HeapStats::collect("best-fit", &blocks);
        assert_eq!(full.largest_gap, 0);
        assert_eq!(full.largest_gap, blocks.largest_gap());
        assert_eq!(full.fragmentation, 0.0);
    }
}
