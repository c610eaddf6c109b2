//! The allocator core
//!
//! One [`Allocator`] type serves every placement policy. It owns the block
//! bookkeeping and the raw storage, asks its policy where a new block goes,
//! and relocates storage contents when it compacts.

use crate::allocator::block_set::{Block, BlockSet, Gap};
use crate::allocator::{HeapAllocator, PlacementPolicy};
use crate::error::{HeapError, Result};
use crate::handle::{Handle, HeapId};
use crate::layout::Layout;
use crate::stats::{self, HeapStats};
use crate::storage::{CellStorage, RawStorage, Word};
use tracing::{debug, info, warn};

/// Heap allocator parameterised by placement policy and storage medium
///
/// # Examples
///
/// ```
/// use heapsim::{BestFit, BestFitAllocator, HeapAllocator};
///
/// let mut heap = BestFitAllocator::new(1024, BestFit);
/// let handle = heap.allocate(100)?;
/// heap.write(handle, 0, 7)?;
/// assert_eq!(heap.read(handle, 0)?, 7);
/// heap.release(handle)?;
/// assert!(heap.release(handle).is_err());
/// # Ok::<(), heapsim::HeapError>(())
/// ```
#[derive(Debug)]
pub struct Allocator<P, S = CellStorage> {
    blocks: BlockSet,
    policy: P,
    storage: S,
    /// Compact after every release
    compacting: bool,
}

impl<P: PlacementPolicy> Allocator<P, CellStorage> {
    /// Create an allocator over `capacity` zeroed cells
    pub fn new(capacity: usize, policy: P) -> Self {
        Self::with_storage(CellStorage::new(capacity), policy)
    }
}

impl<P: PlacementPolicy, S: RawStorage> Allocator<P, S> {
    /// Create an allocator over existing storage
    ///
    /// The heap capacity is the storage capacity.
    pub fn with_storage(storage: S, policy: P) -> Self {
        let heap = HeapId::fresh();
        let capacity = storage.capacity();
        info!(
            "Creating {} allocator h{} over {} cells",
            policy.name(),
            heap.get(),
            capacity
        );
        Allocator {
            blocks: BlockSet::new(heap, capacity),
            policy,
            storage,
            compacting: false,
        }
    }

    /// Compact automatically after every release
    pub fn compacting(mut self, enabled: bool) -> Self {
        self.compacting = enabled;
        self
    }

    pub fn set_compacting(&mut self, enabled: bool) {
        self.compacting = enabled;
    }

    pub fn is_compacting(&self) -> bool {
        self.compacting
    }

    pub fn id(&self) -> HeapId {
        self.blocks.heap()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give up the allocator and keep the storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Number of live blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Cells covered by live blocks
    pub fn used_cells(&self) -> usize {
        self.blocks.used()
    }

    /// Check if a handle still refers to a live block of this allocator
    pub fn contains(&self, handle: Handle) -> bool {
        self.blocks.contains(handle)
    }

    /// Current physical address of a block
    pub fn resolve(&self, handle: Handle) -> Result<usize> {
        Ok(self.blocks.get(handle)?.address)
    }

    /// Length of a block in cells
    pub fn block_len(&self, handle: Handle) -> Result<usize> {
        Ok(self.blocks.get(handle)?.length)
    }

    /// Snapshot of the live blocks in address order
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.iter().collect()
    }

    /// Derived free-gap list in address order
    pub fn free_gaps(&self) -> Vec<Gap> {
        self.blocks.gaps()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats::collect(self.policy.name(), &self.blocks)
    }

    /// Verify bookkeeping: no overlap, bounds, table and index agree
    pub fn check_invariants(&self) -> Result<()> {
        self.blocks.check_invariants()?;
        if self.storage.capacity() != self.blocks.capacity() {
            return Err(HeapError::InvariantViolation(format!(
                "storage capacity {} differs from heap capacity {}",
                self.storage.capacity(),
                self.blocks.capacity()
            )));
        }
        Ok(())
    }

    /// Read one cell of a block
    pub fn read(&self, handle: Handle, offset: usize) -> Result<Word> {
        let address = self.cell_address(handle, offset)?;
        self.storage.read_cell(address)
    }

    /// Write one cell of a block
    pub fn write(&mut self, handle: Handle, offset: usize, value: Word) -> Result<()> {
        let address = self.cell_address(handle, offset)?;
        self.storage.write_cell(address, value)
    }

    /// Read every cell of a block
    pub fn read_block(&self, handle: Handle) -> Result<Vec<Word>> {
        let block = self.blocks.get(handle)?;
        (block.address..block.end())
            .map(|address| self.storage.read_cell(address))
            .collect()
    }

    /// Write `values` into a block starting at `offset`
    ///
    /// Nothing is written unless the whole slice fits in the block.
    pub fn write_block(&mut self, handle: Handle, offset: usize, values: &[Word]) -> Result<()> {
        let block = self.blocks.get(handle)?;
        let fits = offset
            .checked_add(values.len())
            .is_some_and(|end| end <= block.length);
        if !fits {
            return Err(HeapError::OutOfBlockBounds {
                handle,
                offset: offset.saturating_add(values.len()).saturating_sub(1),
                len: block.length,
            });
        }

        for (i, &value) in values.iter().enumerate() {
            self.storage.write_cell(block.address + offset + i, value)?;
        }
        Ok(())
    }

    fn cell_address(&self, handle: Handle, offset: usize) -> Result<usize> {
        let block = self.blocks.get(handle)?;
        if offset >= block.length {
            return Err(HeapError::OutOfBlockBounds {
                handle,
                offset,
                len: block.length,
            });
        }
        Ok(block.address + offset)
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.blocks.check_invariants() {
                panic!("{}", e);
            }
        }
    }

    /// Write `saved` back over the cells starting at `start`
    ///
    /// Only cells whose contents differ are rewritten.
    fn restore_cells(&mut self, start: usize, saved: &[Word]) -> Result<()> {
        for (i, &value) in saved.iter().enumerate() {
            let address = start + i;
            if self.storage.read_cell(address).ok() != Some(value) {
                self.storage.write_cell(address, value)?;
            }
        }
        Ok(())
    }
}

impl<P: PlacementPolicy, S: RawStorage> HeapAllocator for Allocator<P, S> {
    fn allocate(&mut self, size: usize) -> Result<Handle> {
        if size == 0 {
            return Err(HeapError::InvalidRequest(
                "allocation size must be positive".to_string(),
            ));
        }

        let address = match self.policy.choose(&self.blocks, size) {
            Some(address) => address,
            None => {
                let largest_gap = self.blocks.largest_gap();
                warn!(
                    "{} allocation of {} cells failed (largest gap {})",
                    self.policy.name(),
                    size,
                    largest_gap
                );
                return Err(HeapError::OutOfSpace {
                    requested: size,
                    largest_gap,
                });
            }
        };

        let handle = self.blocks.insert(address, size)?;
        debug!("Allocated {} cells at {} as {}", size, address, handle);
        self.debug_check();

        Ok(handle)
    }

    fn release(&mut self, handle: Handle) -> Result<()> {
        let block = self.blocks.remove(handle)?;

        if self.compacting {
            if let Err(e) = self.compact() {
                self.blocks.restore(block)?;
                warn!("Release of {} undone, compaction failed: {}", handle, e);
                return Err(e);
            }
        }

        debug!(
            "Released {} ({} cells at {})",
            handle, block.length, block.address
        );
        self.debug_check();

        Ok(())
    }

    fn compact(&mut self) -> Result<usize> {
        let plan = self.blocks.packing_plan();
        let (Some(first), Some(last)) = (plan.first(), plan.last()) else {
            return Ok(0);
        };

        // Every move writes inside this window. Keep its contents so a
        // failed move can be undone before the table is touched.
        let start = first.to;
        let saved = (start..last.from + last.length)
            .map(|address| self.storage.read_cell(address))
            .collect::<Result<Vec<Word>>>()?;

        // Ascending order: every target lies below its source and above
        // the previous block's target, so no unread cells are overwritten.
        for relocation in &plan {
            let moved = self
                .storage
                .copy_cells(relocation.from, relocation.to, relocation.length);
            if let Err(e) = moved {
                warn!(
                    "Compaction failed moving {} from {} to {}: {}",
                    relocation.handle, relocation.from, relocation.to, e
                );
                if let Err(undo) = self.restore_cells(start, &saved) {
                    return Err(HeapError::InvariantViolation(format!(
                        "compaction failed ({}) and storage could not be restored: {}",
                        e, undo
                    )));
                }
                return Err(e);
            }
        }
        self.blocks.apply(&plan);

        debug!(
            "Compacted: moved {} blocks, {} cells free at {}",
            plan.len(),
            self.blocks.free(),
            self.blocks.used()
        );
        self.debug_check();

        Ok(plan.len())
    }

    fn describe_layout(&self) -> Layout {
        Layout::of(&self.blocks)
    }

    fn capacity(&self) -> usize {
        self.blocks.capacity()
    }

    fn free_cells(&self) -> usize {
        self.blocks.free()
    }

    fn fragmentation_score(&self) -> f64 {
        stats::fragmentation(self.blocks.free(), self.blocks.largest_gap())
    }
}
