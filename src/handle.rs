//! Opaque block handles
//!
//! A [`Handle`] never carries a physical address. It is a stable key into the
//! owning allocator's address table, so compaction can move a block without
//! invalidating the handle that refers to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HEAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one allocator instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeapId(u64);

impl HeapId {
    /// Allocate a process-wide unique heap id
    pub(crate) fn fresh() -> Self {
        HeapId(NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Client-held reference to a block
///
/// Handles are `Copy`; copies refer to the same block. Once the block is
/// released every copy becomes dangling and any operation through it fails
/// with [`HeapError::InvalidHandle`](crate::HeapError::InvalidHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    heap: HeapId,
    key: u64,
}

impl Handle {
    pub(crate) fn new(heap: HeapId, key: u64) -> Self {
        Handle { heap, key }
    }

    /// Allocator instance that issued this handle
    pub fn heap(&self) -> HeapId {
        self.heap
    }

    /// Per-allocator key; never reused within one allocator
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}:{}", self.heap.0, self.key)
    }
}
