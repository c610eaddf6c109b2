//! Thread-shareable allocator
//!
//! The allocator itself is single-threaded: an allocation reads and updates
//! the handle table and the address index in one go. [`SharedAllocator`]
//! serialises whole operations behind one lock, so no two operations ever
//! interleave on the same heap.

use crate::allocator::{Allocator, HeapAllocator, PlacementPolicy};
use crate::error::Result;
use crate::handle::Handle;
use crate::layout::Layout;
use crate::stats::HeapStats;
use crate::storage::{CellStorage, RawStorage, Word};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, lock-guarded handle to one allocator
pub struct SharedAllocator<P, S = CellStorage> {
    inner: Arc<Mutex<Allocator<P, S>>>,
}

impl<P, S> Clone for SharedAllocator<P, S> {
    fn clone(&self) -> Self {
        SharedAllocator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PlacementPolicy, S: RawStorage> SharedAllocator<P, S> {
    pub fn new(allocator: Allocator<P, S>) -> Self {
        SharedAllocator {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    /// Run several operations under one lock acquisition
    pub fn with<R>(&self, f: impl FnOnce(&mut Allocator<P, S>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn allocate(&self, size: usize) -> Result<Handle> {
        self.inner.lock().allocate(size)
    }

    pub fn release(&self, handle: Handle) -> Result<()> {
        self.inner.lock().release(handle)
    }

    pub fn compact(&self) -> Result<usize> {
        self.inner.lock().compact()
    }

    pub fn describe_layout(&self) -> Layout {
        self.inner.lock().describe_layout()
    }

    pub fn resolve(&self, handle: Handle) -> Result<usize> {
        self.inner.lock().resolve(handle)
    }

    pub fn read(&self, handle: Handle, offset: usize) -> Result<Word> {
        self.inner.lock().read(handle, offset)
    }

    pub fn write(&self, handle: Handle, offset: usize, value: Word) -> Result<()> {
        self.inner.lock().write(handle, offset, value)
    }

    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats()
    }
}
