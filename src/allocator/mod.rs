//! Allocation strategies for the simulated heap
//!
//! Every allocator shares one bookkeeping substrate ([`BlockSet`]) and differs
//! only in how it picks a gap for a new block:
//! - First-fit: lowest-addressed gap that is large enough
//! - Best-fit: smallest gap that is large enough, lowest address on ties
//!
//! A gap is accepted when `gap.length >= size`, for interior and trailing
//! gaps alike.

pub mod best_fit;
pub mod block_set;
pub mod first_fit;
pub mod heap;

pub use best_fit::{BestFit, BestFitAllocator};
pub use block_set::{Block, BlockSet, Gap};
pub use first_fit::{FirstFit, FirstFitAllocator};
pub use heap::Allocator;

use crate::error::{HeapError, Result};
use crate::handle::Handle;
use crate::layout::Layout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heap allocator trait
///
/// Defines the interface for requesting and releasing blocks of cells
/// through opaque handles.
pub trait HeapAllocator {
    /// Allocate a block of exactly `size` cells
    ///
    /// Fails with `InvalidRequest` for `size == 0` and with `OutOfSpace` when
    /// no gap can hold the request. A failed call changes nothing.
    fn allocate(&mut self, size: usize) -> Result<Handle>;

    /// Release the block behind `handle`
    ///
    /// Fails with `InvalidHandle` when the handle is already released or
    /// belongs to another allocator.
    fn release(&mut self, handle: Handle) -> Result<()>;

    /// Pack every live block against address 0, in address order
    ///
    /// Returns the number of blocks that moved.
    fn compact(&mut self) -> Result<usize>;

    /// Free and allocated spans covering `[0, capacity)` in address order
    fn describe_layout(&self) -> Layout;

    /// Total number of cells managed
    fn capacity(&self) -> usize;

    /// Number of cells not covered by any block
    fn free_cells(&self) -> usize;

    /// External fragmentation (0.0 = all free space in one gap)
    fn fragmentation_score(&self) -> f64;
}

/// Gap selection rule
///
/// Implementations inspect the live blocks and return the start address of
/// the gap that should receive `size` cells, or `None` when nothing fits.
/// `size` is always positive.
pub trait PlacementPolicy {
    /// Short policy name, used in logs and reports
    fn name(&self) -> &'static str;

    /// Pick the start address for a new block of `size` cells
    fn choose(&self, blocks: &BlockSet, size: usize) -> Option<usize>;
}

/// Runtime-selectable placement policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    FirstFit,
    BestFit,
}

impl PlacementPolicy for PolicyKind {
    fn name(&self) -> &'static str {
        match self {
            PolicyKind::FirstFit => FirstFit.name(),
            PolicyKind::BestFit => BestFit.name(),
        }
    }

    fn choose(&self, blocks: &BlockSet, size: usize) -> Option<usize> {
        match self {
            PolicyKind::FirstFit => FirstFit.choose(blocks, size),
            PolicyKind::BestFit => BestFit.choose(blocks, size),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = HeapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "first-fit" | "first_fit" | "firstfit" | "first" => Ok(PolicyKind::FirstFit),
            "best-fit" | "best_fit" | "bestfit" | "best" => Ok(PolicyKind::BestFit),
            _ => Err(HeapError::Config(format!(
                "Invalid placement policy '{}'. Valid options: first-fit, best-fit",
                s
            ))),
        }
    }
}
