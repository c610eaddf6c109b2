//! Error types for heap operations

use crate::handle::Handle;
use thiserror::Error;

/// Heap operation result type
pub type Result<T> = std::result::Result<T, HeapError>;

/// Heap operation errors
///
/// Every variant is recoverable: an operation that returns an error leaves
/// the allocator exactly as it was before the call.
#[derive(Error, Debug)]
pub enum HeapError {
    /// No free gap (interior or trailing) can hold the request
    #[error("Out of space: requested {requested} cells, largest free gap is {largest_gap}")]
    OutOfSpace { requested: usize, largest_gap: usize },

    /// Handle is released, or was produced by another allocator
    #[error("Invalid handle: {0}")]
    InvalidHandle(Handle),

    /// Request parameters are malformed (e.g. zero-sized allocation)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Raw storage was addressed outside of its capacity
    #[error("Address {address} out of bounds (capacity {capacity})")]
    AddressOutOfBounds { address: usize, capacity: usize },

    /// Handle-relative access fell outside of the block
    #[error("Offset {offset} out of bounds for block {handle} of length {len}")]
    OutOfBlockBounds {
        handle: Handle,
        offset: usize,
        len: usize,
    },

    /// Internal bookkeeping disagrees with itself
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeapError {
    /// True for errors that a caller can clear by releasing or compacting
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, HeapError::OutOfSpace { .. })
    }
}
