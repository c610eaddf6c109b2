//! First-fit placement
//!
//! Walks live blocks in ascending address order and takes the first gap
//! that can hold the request. No gap list is built; the scan stops as soon
//! as a gap qualifies, so cost is O(blocks) in the worst case.

use crate::allocator::block_set::BlockSet;
use crate::allocator::heap::Allocator;
use crate::allocator::PlacementPolicy;
use crate::storage::CellStorage;
use tracing::trace;

/// First-fit placement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstFit;

/// Allocator using first-fit placement
pub type FirstFitAllocator<S = CellStorage> = Allocator<FirstFit, S>;

impl PlacementPolicy for FirstFit {
    fn name(&self) -> &'static str {
        "first-fit"
    }

    fn choose(&self, blocks: &BlockSet, size: usize) -> Option<usize> {
        // Address immediately after the previous block
        let mut cursor = 0;

        for block in blocks.iter() {
            let gap = block.address.saturating_sub(cursor);
            if gap >= size {
                trace!("first-fit: {} cells at {} (gap of {})", size, cursor, gap);
                return Some(cursor);
            }
            cursor = block.end();
        }

        let trailing = blocks.capacity().saturating_sub(cursor);
        if trailing >= size {
            trace!(
                "first-fit: {} cells at {} (trailing gap of {})",
                size,
                cursor,
                trailing
            );
            return Some(cursor);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HeapAllocator;
    use crate::error::HeapError;

    #[test]
    fn test_empty_heap_places_at_zero() {
        let mut alloc = FirstFitAllocator::new(1024, FirstFit);
        let h = alloc.allocate(100).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 0);
    }

    #[test]
    fn test_sequential_allocations_are_packed() {
        let mut alloc = FirstFitAllocator::new(1024, FirstFit);
        let a = alloc.allocate(100).unwrap();
        let b = alloc.allocate(200).unwrap();
        let c = alloc.allocate(300).unwrap();
        assert_eq!(alloc.resolve(a).unwrap(), 0);
        assert_eq!(alloc.resolve(b).unwrap(), 100);
        assert_eq!(alloc.resolve(c).unwrap(), 300);
    }

    #[test]
    fn test_takes_lowest_gap_not_smallest() {
        let mut alloc = FirstFitAllocator::new(1024, FirstFit);
        let _a = alloc.allocate(100).unwrap(); // 0-99
        let b = alloc.allocate(200).unwrap(); // 100-299
        let _c = alloc.allocate(300).unwrap(); // 300-599
        let d = alloc.allocate(50).unwrap(); // 600-649
        let _e = alloc.allocate(10).unwrap(); // 650-659
        alloc.release(b).unwrap();
        alloc.release(d).unwrap();

        // Gaps: [100, 300) = 200, [600, 650) = 50, [660, 1024) = 364
        let h = alloc.allocate(40).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 100);
    }

    #[test]
    fn test_exact_fit_interior_gap_accepted() {
        let mut alloc = FirstFitAllocator::new(100, FirstFit);
        let a = alloc.allocate(30).unwrap();
        let _b = alloc.allocate(70).unwrap();
        alloc.release(a).unwrap();

        let h = alloc.allocate(30).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 0);
        assert_eq!(alloc.free_cells(), 0);
    }

    #[test]
    fn test_exact_fit_trailing_gap_accepted() {
        let mut alloc = FirstFitAllocator::new(100, FirstFit);
        alloc.allocate(60).unwrap();
        let h = alloc.allocate(40).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 60);
    }

    #[test]
    fn test_whole_capacity_fits() {
        let mut alloc = FirstFitAllocator::new(64, FirstFit);
        let h = alloc.allocate(64).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 0);
        assert!(alloc.allocate(1).unwrap_err().is_out_of_space());
    }

    #[test]
    fn test_skips_too_small_gaps() {
        let mut alloc = FirstFitAllocator::new(100, FirstFit);
        let a = alloc.allocate(10).unwrap(); // 0-9
        let _b = alloc.allocate(10).unwrap(); // 10-19
        alloc.release(a).unwrap();

        let h = alloc.allocate(11).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 20);
    }

    #[test]
    fn test_larger_than_capacity_fails() {
        let mut alloc = FirstFitAllocator::new(1024, FirstFit);
        assert!(matches!(
            alloc.allocate(1025),
            Err(HeapError::OutOfSpace {
                requested: 1025,
                largest_gap: 1024
            })
        ));
        assert_eq!(alloc.block_count(), 0);
    }

    #[test]
    fn test_fragmented_heap_fails_without_compaction() {
        let mut alloc = FirstFitAllocator::new(100, FirstFit);
        let a = alloc.allocate(25).unwrap();
        let _b = alloc.allocate(25).unwrap();
        let c = alloc.allocate(25).unwrap();
        let _d = alloc.allocate(25).unwrap();
        alloc.release(a).unwrap();
        alloc.release(c).unwrap();

        // 50 cells free, but only in two gaps of 25
        assert_eq!(alloc.free_cells(), 50);
        assert!(alloc.allocate(50).unwrap_err().is_out_of_space());

        alloc.compact().unwrap();
        let h = alloc.allocate(50).unwrap();
        assert_eq!(alloc.resolve(h).unwrap(), 50);
    }
}
