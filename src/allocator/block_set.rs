//! Block bookkeeping shared by every placement policy
//!
//! A [`BlockSet`] owns two views of the live blocks:
//! - the handle table (handle key -> address, length), the only place a
//!   block's address is stored
//! - an address index (address -> handle key) that keeps blocks in
//!   ascending address order
//!
//! Free gaps are never stored. They are derived from the address index on
//! demand, so they cannot drift out of sync with the blocks.

use crate::error::{HeapError, Result};
use crate::handle::{Handle, HeapId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A live block: a contiguous range of cells bound to one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub handle: Handle,
    /// First cell of the block
    pub address: usize,
    /// Number of cells
    pub length: usize,
}

impl Block {
    /// One past the last cell
    pub fn end(&self) -> usize {
        self.address + self.length
    }

    /// Check if this block covers a cell
    pub fn contains(&self, address: usize) -> bool {
        address >= self.address && address < self.end()
    }

    /// Check if two blocks share at least one cell
    pub fn overlaps(&self, other: &Block) -> bool {
        self.address < other.end() && other.address < self.end()
    }
}

/// A maximal run of unallocated cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gap {
    pub start: usize,
    pub length: usize,
}

impl Gap {
    pub fn new(start: usize, length: usize) -> Self {
        Gap { start, length }
    }

    /// One past the last cell
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Check if `size` cells fit in this gap
    pub fn fits(&self, size: usize) -> bool {
        self.length >= size
    }
}

/// Length of the largest gap in `gaps` (0 when empty)
pub(crate) fn largest(gaps: &[Gap]) -> usize {
    gaps.iter().map(|gap| gap.length).max().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    address: usize,
    length: usize,
}

/// One block's move during compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub handle: Handle,
    pub from: usize,
    pub to: usize,
    pub length: usize,
}

/// Live blocks of one allocator, ordered by address
#[derive(Debug, Clone)]
pub struct BlockSet {
    heap: HeapId,
    capacity: usize,
    /// Handle key -> current mapping
    table: HashMap<u64, Entry>,
    /// Block start address -> handle key
    by_address: BTreeMap<usize, u64>,
    /// Next handle key; keys are never recycled
    next_key: u64,
    used: usize,
}

impl BlockSet {
    /// Create an empty block set over `capacity` cells
    pub fn new(heap: HeapId, capacity: usize) -> Self {
        BlockSet {
            heap,
            capacity,
            table: HashMap::new(),
            by_address: BTreeMap::new(),
            next_key: 0,
            used: 0,
        }
    }

    pub fn heap(&self) -> HeapId {
        self.heap
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live blocks
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Cells covered by live blocks
    pub fn used(&self) -> usize {
        self.used
    }

    /// Cells not covered by any block
    pub fn free(&self) -> usize {
        self.capacity - self.used
    }

    /// Live blocks in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.by_address.iter().filter_map(move |(_, &key)| {
            self.table.get(&key).map(|entry| Block {
                handle: Handle::new(self.heap, key),
                address: entry.address,
                length: entry.length,
            })
        })
    }

    /// Resolve a handle to its block
    pub fn get(&self, handle: Handle) -> Result<Block> {
        if handle.heap() != self.heap {
            return Err(HeapError::InvalidHandle(handle));
        }
        self.table
            .get(&handle.key())
            .map(|entry| Block {
                handle,
                address: entry.address,
                length: entry.length,
            })
            .ok_or(HeapError::InvalidHandle(handle))
    }

    /// Check if a handle is currently mapped
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    /// Every maximal free gap in ascending address order
    ///
    /// Zero-length gaps between adjacent blocks are never reported.
    pub fn gaps(&self) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let mut cursor = 0;

        for block in self.iter() {
            if block.address > cursor {
                gaps.push(Gap::new(cursor, block.address - cursor));
            }
            cursor = block.end();
        }

        if cursor < self.capacity {
            gaps.push(Gap::new(cursor, self.capacity - cursor));
        }

        gaps
    }

    /// Length of the largest free gap (0 when full)
    pub fn largest_gap(&self) -> usize {
        largest(&self.gaps())
    }

    /// Record a new block and mint its handle
    ///
    /// Rejects ranges that leave the heap or overlap a live block, without
    /// touching any state.
    pub(crate) fn insert(&mut self, address: usize, length: usize) -> Result<Handle> {
        self.check_vacant(address, length)?;

        let key = self.next_key;
        self.next_key += 1;
        self.link(key, address, length);

        Ok(Handle::new(self.heap, key))
    }

    /// Put a removed block back under its original handle and address
    pub(crate) fn restore(&mut self, block: Block) -> Result<()> {
        let key = block.handle.key();
        if block.handle.heap() != self.heap || key >= self.next_key {
            return Err(HeapError::InvalidHandle(block.handle));
        }
        if self.table.contains_key(&key) {
            return Err(HeapError::InvariantViolation(format!(
                "{} is still mapped",
                block.handle
            )));
        }
        self.check_vacant(block.address, block.length)?;
        self.link(key, block.address, block.length);
        Ok(())
    }

    /// Check that `[address, address + length)` is in bounds and unclaimed
    fn check_vacant(&self, address: usize, length: usize) -> Result<()> {
        if length == 0 {
            return Err(HeapError::InvalidRequest(
                "block length must be positive".to_string(),
            ));
        }
        let end = address
            .checked_add(length)
            .filter(|&end| end <= self.capacity)
            .ok_or_else(|| {
                HeapError::InvariantViolation(format!(
                    "block [{}, +{}) exceeds capacity {}",
                    address, length, self.capacity
                ))
            })?;

        // Previous block must end at or before us
        if let Some((_, &key)) = self.by_address.range(..=address).next_back() {
            if let Some(prev) = self.table.get(&key) {
                if prev.address + prev.length > address {
                    return Err(HeapError::InvariantViolation(format!(
                        "block [{}, {}) overlaps block at {}",
                        address, end, prev.address
                    )));
                }
            }
        }

        // Next block must start at or after our end
        if let Some((&next_address, _)) = self.by_address.range(address..).next() {
            if next_address < end {
                return Err(HeapError::InvariantViolation(format!(
                    "block [{}, {}) overlaps block at {}",
                    address, end, next_address
                )));
            }
        }

        Ok(())
    }

    fn link(&mut self, key: u64, address: usize, length: usize) {
        self.table.insert(key, Entry { address, length });
        self.by_address.insert(address, key);
        self.used += length;
    }

    /// Forget a block; its handle becomes dangling
    pub(crate) fn remove(&mut self, handle: Handle) -> Result<Block> {
        let block = self.get(handle)?;
        self.table.remove(&handle.key());
        self.by_address.remove(&block.address);
        self.used -= block.length;
        Ok(block)
    }

    /// Moves that pack every block against address 0, in address order
    ///
    /// Blocks already in place are omitted, so a packed set yields no moves.
    pub(crate) fn packing_plan(&self) -> Vec<Relocation> {
        let mut plan = Vec::new();
        let mut next_free = 0;

        for block in self.iter() {
            if block.address != next_free {
                plan.push(Relocation {
                    handle: block.handle,
                    from: block.address,
                    to: next_free,
                    length: block.length,
                });
            }
            next_free += block.length;
        }

        plan
    }

    /// Rewrite table values according to a packing plan
    ///
    /// Handle keys are untouched; only the addresses they resolve to change.
    pub(crate) fn apply(&mut self, plan: &[Relocation]) {
        for relocation in plan {
            if let Some(entry) = self.table.get_mut(&relocation.handle.key()) {
                entry.address = relocation.to;
            }
        }
        self.by_address = self
            .table
            .iter()
            .map(|(&key, entry)| (entry.address, key))
            .collect();
    }

    /// Verify the table and the address index describe the same
    /// non-overlapping, in-bounds blocks
    pub fn check_invariants(&self) -> Result<()> {
        if self.table.len() != self.by_address.len() {
            return Err(HeapError::InvariantViolation(format!(
                "handle table has {} entries but address index has {}",
                self.table.len(),
                self.by_address.len()
            )));
        }

        let mut cursor = 0;
        let mut used = 0;
        for (&address, key) in &self.by_address {
            let entry = self.table.get(key).ok_or_else(|| {
                HeapError::InvariantViolation(format!("address {} maps to unknown key {}", address, key))
            })?;
            if entry.address != address {
                return Err(HeapError::InvariantViolation(format!(
                    "key {} indexed at {} but mapped to {}",
                    key, address, entry.address
                )));
            }
            if entry.length == 0 {
                return Err(HeapError::InvariantViolation(format!(
                    "zero-length block at {}",
                    address
                )));
            }
            if address < cursor {
                return Err(HeapError::InvariantViolation(format!(
                    "block at {} overlaps previous block ending at {}",
                    address, cursor
                )));
            }
            cursor = address + entry.length;
            if cursor > self.capacity {
                return Err(HeapError::InvariantViolation(format!(
                    "block at {} ends at {} beyond capacity {}",
                    address, cursor, self.capacity
                )));
            }
            used += entry.length;
        }

        if used != self.used {
            return Err(HeapError::InvariantViolation(format!(
                "used counter is {} but blocks cover {}",
                self.used, used
            )));
        }

        Ok(())
    }
}
