//! Memory layout snapshots
//!
//! A [`Layout`] is the read-only answer to "what does the heap look like":
//! alternating free and allocated spans that together cover every cell
//! exactly once, in address order. Rendering it is left to the caller (see
//! [`crate::report`] for one option).

use crate::allocator::BlockSet;
use crate::handle::Handle;
use serde::{Deserialize, Serialize};

/// Status of one span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpanStatus {
    Free,
    Allocated { handle: Handle, size: usize },
}

/// A contiguous range of cells with one status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub length: usize,
    #[serde(flatten)]
    pub status: SpanStatus,
}

impl Span {
    pub fn free(start: usize, length: usize) -> Self {
        Span {
            start,
            length,
            status: SpanStatus::Free,
        }
    }

    pub fn allocated(start: usize, length: usize, handle: Handle) -> Self {
        Span {
            start,
            length,
            status: SpanStatus::Allocated {
                handle,
                size: length,
            },
        }
    }

    /// One past the last cell
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Last cell covered (inclusive)
    pub fn last(&self) -> usize {
        self.end() - 1
    }

    pub fn is_free(&self) -> bool {
        matches!(self.status, SpanStatus::Free)
    }

    /// Handle owning this span, if allocated
    pub fn handle(&self) -> Option<Handle> {
        match self.status {
            SpanStatus::Allocated { handle, .. } => Some(handle),
            SpanStatus::Free => None,
        }
    }
}

/// Ordered spans covering `[0, capacity)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    capacity: usize,
    spans: Vec<Span>,
}

impl Layout {
    /// Build the layout of a block set
    pub fn of(blocks: &BlockSet) -> Self {
        let mut spans = Vec::with_capacity(blocks.len() * 2 + 1);
        let mut cursor = 0;

        for block in blocks.iter() {
            if block.address > cursor {
                spans.push(Span::free(cursor, block.address - cursor));
            }
            spans.push(Span::allocated(block.address, block.length, block.handle));
            cursor = block.end();
        }

        if cursor < blocks.capacity() {
            spans.push(Span::free(cursor, blocks.capacity() - cursor));
        }

        Layout {
            capacity: blocks.capacity(),
            spans,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn free_spans(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|span| span.is_free())
    }

    pub fn allocated_spans(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|span| !span.is_free())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'a> IntoIterator for &'a Layout {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
