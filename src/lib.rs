//! # heapsim - A Simulated Heap with Relocatable Handles
//!
//! `heapsim` models a heap: a fixed number of cells over which clients
//! request and release contiguous blocks through opaque [`Handle`]s. Clients
//! never see raw addresses, so the allocator is free to move blocks.
//!
//! - **Placement policies**: first-fit and best-fit over one shared
//!   bookkeeping core
//! - **Compaction**: on demand or after every release; handles stay valid
//! - **Layout snapshots**: ordered free/allocated spans, with an optional
//!   text report
//!
//! ## Quick Start
//!
//! ```rust
//! use heapsim::{HeapAllocator, HeapBuilder, PolicyKind, Result};
//!
//! # fn main() -> Result<()> {
//! let mut heap = HeapBuilder::new()
//!     .capacity(1024)
//!     .policy(PolicyKind::BestFit)
//!     .build()?;
//!
//! let a = heap.allocate(100)?;
//! let b = heap.allocate(200)?;
//! heap.write(b, 0, 42)?;
//!
//! heap.release(a)?;
//! heap.compact()?;
//!
//! // `b` moved down to address 0 and kept its contents
//! assert_eq!(heap.resolve(b)?, 0);
//! assert_eq!(heap.read(b, 0)?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   heapsim
//!   ├── allocator   - HeapAllocator trait, Allocator core, first-fit / best-fit
//!   ├── handle      - Handle, HeapId
//!   ├── storage     - RawStorage trait, CellStorage
//!   ├── layout      - Layout, Span, SpanStatus
//!   ├── stats       - HeapStats
//!   ├── config      - HeapConfig (TOML)
//!   ├── report      - LayoutReport text rendering
//!   └── sync        - SharedAllocator (one lock per heap)
//! ```
//!
//! ## Limitations
//!
//! - **Single address space**: one heap per allocator, cell granular
//! - **No persistence**: a heap lives as long as its allocator

pub mod allocator;
pub mod config;
pub mod error;
pub mod handle;
pub mod layout;
pub mod report;
pub mod stats;
pub mod storage;
pub mod sync;

pub use crate::allocator::{
    Allocator, BestFit, BestFitAllocator, Block, BlockSet, FirstFit, FirstFitAllocator, Gap,
    HeapAllocator, PlacementPolicy, PolicyKind,
};
pub use crate::config::HeapConfig;
pub use crate::error::{HeapError, Result};
pub use crate::handle::{Handle, HeapId};
pub use crate::layout::{Layout, Span, SpanStatus};
pub use crate::report::LayoutReport;
pub use crate::stats::HeapStats;
pub use crate::storage::{CellStorage, RawStorage, Word};
pub use crate::sync::SharedAllocator;

use tracing::debug;

/// Builder for runtime-configured allocators
///
/// # Examples
///
/// ```rust
/// use heapsim::{HeapAllocator, HeapBuilder, PolicyKind};
///
/// let heap = HeapBuilder::new()
///     .capacity(4096)
///     .policy(PolicyKind::FirstFit)
///     .compacting()
///     .build()?;
///
/// assert_eq!(heap.capacity(), 4096);
/// assert!(heap.is_compacting());
/// # Ok::<(), heapsim::HeapError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HeapBuilder {
    config: HeapConfig,
}

impl HeapBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        HeapBuilder {
            config: HeapConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: HeapConfig) -> Self {
        HeapBuilder { config }
    }

    /// Set the number of cells
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the placement policy
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.config.policy = policy;
        self
    }

    /// Compact after every release
    pub fn compacting(mut self) -> Self {
        self.config.compact_on_release = true;
        self
    }

    /// Build the allocator
    pub fn build(self) -> Result<Allocator<PolicyKind>> {
        debug!(
            "Building {} heap with {} cells (compacting: {})",
            self.config.policy, self.config.capacity, self.config.compact_on_release
        );
        self.config.build()
    }
}

impl Default for HeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
