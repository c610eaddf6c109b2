//! Best-fit placement
//!
//! Derives the complete gap list, keeps the gaps that can hold the request
//! and picks the smallest one. Equal-sized candidates resolve to the lowest
//! address. Every call ranks every gap, trading time for smaller leftover
//! fragments.

use crate::allocator::block_set::BlockSet;
use crate::allocator::heap::Allocator;
use crate::allocator::PlacementPolicy;
use crate::storage::CellStorage;
use tracing::trace;

/// Best-fit placement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestFit;

/// Allocator using best-fit placement
pub type BestFitAllocator<S = CellStorage> = Allocator<BestFit, S>;

impl PlacementPolicy for BestFit {
    fn name(&self) -> &'static str {
        "best-fit"
    }

    fn choose(&self, blocks: &BlockSet, size: usize) -> Option<usize> {
        let best = blocks
            .gaps()
            .into_iter()
            .filter(|gap| gap.fits(size))
            .min_by_key(|gap| (gap.length, gap.start))?;

        trace!(
            "best-fit: {} cells at {} (gap of {})",
            size,
            best.start,
            best.length
        );
        Some(best.start)
    }
}
