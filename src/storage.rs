//! Raw cell storage
//!
//! Passive, fixed-capacity storage addressed by absolute position. It knows
//! nothing about blocks; the allocator only asks it for its capacity and,
//! during compaction, to move cells.

use crate::error::{HeapError, Result};
use serde::{Deserialize, Serialize};

/// Contents of one cell
pub type Word = u32;

/// Storage medium consumed by the allocator
pub trait RawStorage {
    /// Number of addressable cells
    fn capacity(&self) -> usize;

    /// Read one cell
    fn read_cell(&self, address: usize) -> Result<Word>;

    /// Write one cell
    fn write_cell(&mut self, address: usize, value: Word) -> Result<()>;

    /// Move `len` cells from `src` to `dst`
    ///
    /// The default walks upwards, which is only correct when `dst <= src`
    /// or the ranges do not overlap. Compaction only ever moves blocks down.
    fn copy_cells(&mut self, src: usize, dst: usize, len: usize) -> Result<()> {
        for i in 0..len {
            let value = self.read_cell(src + i)?;
            self.write_cell(dst + i, value)?;
        }
        Ok(())
    }
}

/// In-memory storage backed by a vector of words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStorage {
    cells: Vec<Word>,
}

impl CellStorage {
    /// Create zeroed storage with `capacity` cells
    pub fn new(capacity: usize) -> Self {
        CellStorage {
            cells: vec![0; capacity],
        }
    }

    /// View of every cell, in address order
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    fn check_range(&self, address: usize, len: usize) -> Result<()> {
        match address.checked_add(len) {
            Some(end) if end <= self.cells.len() => Ok(()),
            _ => Err(HeapError::AddressOutOfBounds {
                address: address.saturating_add(len.saturating_sub(1)),
                capacity: self.cells.len(),
            }),
        }
    }
}

impl RawStorage for CellStorage {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read_cell(&self, address: usize) -> Result<Word> {
        self.cells
            .get(address)
            .copied()
            .ok_or(HeapError::AddressOutOfBounds {
                address,
                capacity: self.cells.len(),
            })
    }

    fn write_cell(&mut self, address: usize, value: Word) -> Result<()> {
        let capacity = self.cells.len();
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(HeapError::AddressOutOfBounds { address, capacity })?;
        *cell = value;
        Ok(())
    }

    fn copy_cells(&mut self, src: usize, dst: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.check_range(src, len)?;
        self.check_range(dst, len)?;
        self.cells.copy_within(src..src + len, dst);
        Ok(())
    }
}
